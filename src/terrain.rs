use bevy::prelude::{Component, Transform};
use tracing::warn;

use crate::{
    error::{Result, TerrainError},
    field::{ScalarField, flat_top_rule},
    mesh::{TerrainMesh, generate_mesh, is_valid_cell_size},
    types::{LatticeCoord, Point, Value},
};

/// A diggable block of terrain: a density field plus the parameters used to mesh it.
///
/// The field is exclusively owned by the terrain. Edits go through
/// [`dig_voxel`](Terrain::dig_voxel); each call to
/// [`regenerate_mesh`](Terrain::regenerate_mesh) meshes the whole field from scratch.
///
/// Lattice point `(x, y, z)` sits at `(x, y, z) * cell_size` in the terrain's local space.
#[derive(Component, Debug, Clone)]
#[require(Transform)]
pub struct Terrain {
    field: ScalarField,
    /// World-space size of each cell edge.
    cell_size: Value,
    /// Samples strictly below this are dug out.
    surface_level: Value,
}

impl Default for Terrain {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Terrain {
    pub const DEFAULT_CELL_SIZE: Value = 1.0;
    pub const DEFAULT_SURFACE_LEVEL: Value = 0.1;

    /// Creates a terrain with a flat top surface and `resolution` cells per axis.
    ///
    /// A resolution of `0` is raised to `1`; use [`Terrain::initialize`] to have it rejected.
    pub fn new(resolution: usize) -> Self {
        let resolution = resolution.max(1);
        Self {
            field: ScalarField::fill_lattice(resolution, &flat_top_rule(resolution)),
            cell_size: Self::DEFAULT_CELL_SIZE,
            surface_level: Self::DEFAULT_SURFACE_LEVEL,
        }
    }

    /// Allocates a flat-top terrain and meshes it once.
    ///
    /// `cell_size` must be positive and finite.
    pub fn initialize(
        resolution: usize,
        cell_size: Value,
        surface_level: Value,
    ) -> Result<(Self, TerrainMesh)> {
        if !is_valid_cell_size(cell_size) {
            return Err(TerrainError::InvalidCellSize(cell_size));
        }
        let terrain = Self {
            field: ScalarField::flat_top(resolution)?,
            cell_size,
            surface_level,
        };
        let mesh = terrain.regenerate_mesh()?;
        Ok((terrain, mesh))
    }

    /// Sets the world-space size of each cell edge.
    ///
    /// Zero, negative and non-finite sizes are logged and leave the current size in place.
    pub fn with_cell_size(mut self, cell_size: Value) -> Self {
        if is_valid_cell_size(cell_size) {
            self.cell_size = cell_size;
        } else {
            warn!(cell_size, "ignoring invalid cell size");
        }
        self
    }

    /// Sets the surface level.
    pub fn with_surface_level(mut self, surface_level: Value) -> Self {
        self.surface_level = surface_level;
        self
    }

    /// Replaces the density field, e.g. with one from [`ScalarField::from_fn`].
    pub fn with_field(mut self, field: ScalarField) -> Self {
        self.field = field;
        self
    }

    pub fn cell_size(&self) -> Value {
        self.cell_size
    }

    pub fn surface_level(&self) -> Value {
        self.surface_level
    }

    pub fn resolution(&self) -> usize {
        self.field.resolution()
    }

    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    /// Lowers one lattice sample by `strength`; see [`ScalarField::dig`].
    ///
    /// Does not remesh.
    pub fn dig_voxel(&mut self, coord: LatticeCoord, strength: Value) -> Result<()> {
        self.field.dig(coord, strength)
    }

    /// Meshes the current field.
    ///
    /// A pure function of the field: calling it again without edits in between
    /// returns an identical mesh.
    pub fn regenerate_mesh(&self) -> Result<TerrainMesh> {
        generate_mesh(&self.field, self.surface_level, self.cell_size)
    }

    /// Lattice point at the minimum corner of the cell containing `local_point`.
    ///
    /// `None` if the point is not finite.
    pub fn nearest_lattice(&self, local_point: Point) -> Option<LatticeCoord> {
        let scaled = local_point / self.cell_size;
        if !scaled.coords.iter().all(|c| c.is_finite()) {
            return None;
        }
        // Finite floats beyond the i64 range saturate; the field bounds check rejects them.
        Some([
            scaled.x.floor() as i64,
            scaled.y.floor() as i64,
            scaled.z.floor() as i64,
        ])
    }

    /// Digs the 8 lattice points around `local_point`, one [`dig_voxel`](Terrain::dig_voxel) each.
    ///
    /// Points that fall outside the field are logged and skipped, as is a non-finite
    /// `local_point`. Returns the number of points dug. Does not remesh.
    pub fn dig_around(&mut self, local_point: Point, strength: Value) -> usize {
        let Some([x, y, z]) = self.nearest_lattice(local_point) else {
            warn!(?local_point, "skipping dig at non-finite point");
            return 0;
        };
        let mut dug = 0;

        for (dx, dy, dz) in [
            (0, 0, 0),
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (1, 1, 0),
            (1, 0, 1),
            (0, 1, 1),
            (1, 1, 1),
        ] {
            let (Some(px), Some(py), Some(pz)) =
                (x.checked_add(dx), y.checked_add(dy), z.checked_add(dz))
            else {
                warn!(x, y, z, "skipping dig past the lattice range");
                continue;
            };
            match self.dig_voxel([px, py, pz], strength) {
                Ok(()) => dug += 1,
                Err(err) => warn!("skipping dig: {err}"),
            }
        }

        dug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TerrainError,
        field::{EMPTY, SOLID},
    };

    #[test]
    fn initialize_returns_flat_mesh() {
        let (terrain, mesh) = Terrain::initialize(3, 0.5, 0.1).unwrap();
        assert_eq!(terrain.resolution(), 3);
        assert_eq!(terrain.cell_size(), 0.5);
        assert_eq!(mesh.vertex_count(), 16);
        assert!(mesh.vertices.iter().all(|p| p.y == 1.25));
    }

    #[test]
    fn initialize_rejects_empty_grid() {
        assert_eq!(
            Terrain::initialize(0, 1.0, 0.1).unwrap_err(),
            TerrainError::InvalidResolution(0)
        );
    }

    #[test]
    fn defaults() {
        let terrain = Terrain::default();
        assert_eq!(terrain.resolution(), 16);
        assert_eq!(terrain.cell_size(), 1.0);
        assert_eq!(terrain.surface_level(), 0.1);
        assert_eq!(Terrain::new(0).resolution(), 1);
    }

    #[test]
    fn regenerate_without_edits_is_identical() {
        let mut terrain = Terrain::new(5).with_cell_size(0.3);
        terrain.dig_voxel([2, 4, 2], 1.0).unwrap();

        let first = terrain.regenerate_mesh().unwrap();
        let second = terrain.regenerate_mesh().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dig_voxel_out_of_range_leaves_field() {
        let mut terrain = Terrain::new(3);
        let before = terrain.field().clone();

        assert!(terrain.dig_voxel([3, 3, 4], 1.0).is_err());
        assert!(terrain.dig_voxel([-1, 0, 0], 1.0).is_err());
        assert_eq!(terrain.field(), &before);
    }

    #[test]
    fn nearest_lattice_floors_scaled_point() {
        let terrain = Terrain::new(8).with_cell_size(2.0);
        assert_eq!(
            terrain.nearest_lattice(Point::new(3.9, 0.0, 4.0)),
            Some([1, 0, 2])
        );
        assert_eq!(
            terrain.nearest_lattice(Point::new(-0.1, 7.5, 15.99)),
            Some([-1, 3, 7])
        );
    }

    #[test]
    fn nearest_lattice_rejects_non_finite_points() {
        let terrain = Terrain::new(8);
        assert_eq!(terrain.nearest_lattice(Point::new(Value::NAN, 1.0, 1.0)), None);
        assert_eq!(
            terrain.nearest_lattice(Point::new(1.0, Value::NEG_INFINITY, 1.0)),
            None
        );
    }

    #[test]
    fn initialize_rejects_bad_cell_size() {
        for cell_size in [0.0, -1.0, Value::NAN, Value::INFINITY] {
            assert!(
                matches!(
                    Terrain::initialize(3, cell_size, 0.1),
                    Err(TerrainError::InvalidCellSize(_))
                ),
                "cell size {cell_size}"
            );
        }
    }

    #[test]
    fn with_cell_size_ignores_bad_values() {
        assert_eq!(Terrain::new(2).with_cell_size(0.0).cell_size(), 1.0);
        assert_eq!(Terrain::new(2).with_cell_size(-2.0).cell_size(), 1.0);
        assert_eq!(
            Terrain::new(2)
                .with_cell_size(0.5)
                .with_cell_size(Value::NAN)
                .cell_size(),
            0.5
        );
    }

    #[test]
    fn dig_around_ignores_unusable_points() {
        let mut terrain = Terrain::new(4);
        let before = terrain.field().clone();

        assert_eq!(terrain.dig_around(Point::new(Value::NAN, 1.0, 1.0), 1.0), 0);
        assert_eq!(terrain.dig_around(Point::new(1.0, Value::INFINITY, 1.0), 1.0), 0);
        // Saturates to i64::MAX; the +1 neighbours would overflow.
        assert_eq!(terrain.dig_around(Point::new(Value::MAX, 1.0, 1.0), 1.0), 0);
        assert_eq!(terrain.field(), &before);
    }

    #[test]
    fn dig_around_hits_eight_points() {
        let mut terrain = Terrain::new(4);
        let dug = terrain.dig_around(Point::new(1.5, 2.5, 1.5), 1.0);
        assert_eq!(dug, 8);

        let field = terrain.field();
        for x in 1..=2 {
            for y in 2..=3 {
                for z in 1..=2 {
                    assert_eq!(field.get([x, y, z]), Some(EMPTY));
                }
            }
        }
        assert_eq!(field.get([0, 2, 1]), Some(SOLID));
        assert_eq!(field.get([3, 3, 3]), Some(SOLID));
    }

    #[test]
    fn dig_around_skips_points_outside() {
        let mut terrain = Terrain::new(4);
        // Floors to (4, 4, 4): only the corner itself is inside.
        assert_eq!(terrain.dig_around(Point::new(4.2, 4.2, 4.2), 0.5), 1);
        assert_eq!(terrain.dig_around(Point::new(-3.0, 1.0, 1.0), 0.5), 0);
    }

    #[test]
    fn dug_pit_opens_the_surface() {
        let mut terrain = Terrain::new(4);
        let flat = terrain.regenerate_mesh().unwrap();

        terrain.dig_around(Point::new(1.5, 3.5, 1.5), 1.0);
        let pit = terrain.regenerate_mesh().unwrap();

        assert_ne!(flat, pit);
        let lowest = pit.vertices.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        assert!(lowest < 3.5);
    }
}
