use tracing::debug;

use crate::{
    error::{Result, TerrainError},
    field::ScalarField,
    registry::VertexRegistry,
    types::{CellCoord, Point, Value, Vector},
    utils::{active_edges, edge_midpoint_key, get_state, triangle_edges_from_state},
};

/// Indexed triangle mesh produced by one regeneration pass.
///
/// Every vertex position appears once; triangles index into `vertices` and keep the
/// winding of the triangle table. `normals` runs parallel to `vertices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainMesh {
    /// Deduplicated vertex positions.
    pub vertices: Vec<Point>,

    /// Triangle index triples into `vertices`: `[[v0, v1, v2], ...]`
    pub triangles: Vec<[u32; 3]>,

    /// Smooth per-vertex normals, filled by [`create_normals`](TerrainMesh::create_normals).
    pub normals: Vec<Vector>,
}

/// Vertices first registered by one cell and the cell's triangles.
///
/// Triangle indices are global: they may point at vertices emitted by earlier cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMesh {
    pub vertices: Vec<Point>,
    pub triangles: Vec<[u32; 3]>,
}

impl TerrainMesh {
    /// Creates an empty mesh with no vertices, triangles, or normals.
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Appends one cell's output.
    pub fn append_cell(&mut self, mut cell: CellMesh) {
        self.vertices.append(&mut cell.vertices);
        self.triangles.append(&mut cell.triangles);
    }

    /// Returns the three vertex positions of triangle `tri`.
    pub fn tri_coords(&self, tri: usize) -> [Point; 3] {
        self.triangles[tri].map(|v| self.vertices[v as usize])
    }

    /// Unit face normal of triangle `tri`, following its winding.
    ///
    /// Returns the zero vector if the triangle is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        face_area_vector(self.tri_coords(tri))
            .try_normalize(0.0)
            .unwrap_or_else(Vector::zeros)
    }

    /// Recomputes smooth per-vertex normals.
    ///
    /// Each vertex gets the normalized sum of the area-weighted face normals of the
    /// triangles using it. Vertices with no usable faces get the zero vector.
    pub fn create_normals(&mut self) {
        let mut sums = vec![Vector::zeros(); self.vertices.len()];
        for tri in &self.triangles {
            let n = face_area_vector(tri.map(|v| self.vertices[v as usize]));
            for &v in tri {
                sums[v as usize] += n;
            }
        }

        self.normals = sums
            .into_iter()
            .map(|n| n.try_normalize(0.0).unwrap_or_else(Vector::zeros))
            .collect();
    }

    /// Splits the mesh into flat buffers in the layout GPU meshes expect.
    ///
    /// Returns `(positions, normals, indices)`.
    pub fn into_buffers(self) -> (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<u32>) {
        let positions = self.vertices.iter().map(|p| [p.x, p.y, p.z]).collect();
        let normals = self.normals.iter().map(|n| [n.x, n.y, n.z]).collect();
        let indices = self.triangles.into_iter().flatten().collect();
        (positions, normals, indices)
    }
}

/// True for positive, finite cell sizes.
#[inline]
pub fn is_valid_cell_size(cell_size: Value) -> bool {
    cell_size > 0.0 && cell_size.is_finite()
}

/// `(b - a) × (c - a)`: twice the triangle area, pointing out of the front face.
#[inline]
fn face_area_vector([a, b, c]: [Point; 3]) -> Vector {
    (b - a).cross(&(c - a))
}

/// Triangulates one cell.
///
/// Active edges are visited low to high; each midpoint is looked up in `registry`
/// and only newly registered ones are emitted. Triangles are then read from the
/// table and mapped to global indices through this cell's edges.
///
/// Returns [`TerrainError::MissingEdgeVertex`] if the table names an edge that is not
/// active for `state`.
pub fn mesh_cell(
    cell: CellCoord,
    state: u8,
    registry: &mut VertexRegistry,
    cell_size: Value,
) -> Result<CellMesh> {
    mesh_cell_with(cell, state, triangle_edges_from_state(state), registry, cell_size)
}

/// [`mesh_cell`] with the triangle row supplied by the caller.
fn mesh_cell_with(
    cell: CellCoord,
    state: u8,
    triangles: impl Iterator<Item = [u8; 3]>,
    registry: &mut VertexRegistry,
    cell_size: Value,
) -> Result<CellMesh> {
    let mut local = CellMesh::default();
    let mut edge_vertices: [Option<u32>; 12] = [None; 12];

    for edge in active_edges(state) {
        let key = edge_midpoint_key(cell, edge);
        let (index, is_new) = registry.register(key);
        if is_new {
            local.vertices.push(key.position(cell_size));
        }
        edge_vertices[edge as usize] = Some(index);
    }

    let resolve = |edge: u8| {
        edge_vertices[edge as usize].ok_or(TerrainError::MissingEdgeVertex { state, edge })
    };
    for [a, b, c] in triangles {
        local.triangles.push([resolve(a)?, resolve(b)?, resolve(c)?]);
    }

    Ok(local)
}

/// Runs midpoint marching cubes over every cell of `field`.
///
/// `cell_size` must be positive and finite; anything else would collapse or mirror
/// the geometry and is rejected with [`TerrainError::InvalidCellSize`].
///
/// Cells are visited x-outer, z-inner, so the output is fully determined by the
/// field contents. A fresh [`VertexRegistry`] is used for each call.
///
/// ```text
/// Per cell:
/// 1. get_state          →  8-bit configuration from the corner samples
/// 2. mesh_cell          →  new midpoint vertices + triangles from the tables
/// 3. append_cell        →  concatenate onto the pass output
/// Then:
/// 4. create_normals     →  smooth vertex normals
/// ```
pub fn generate_mesh(field: &ScalarField, threshold: Value, cell_size: Value) -> Result<TerrainMesh> {
    if !is_valid_cell_size(cell_size) {
        return Err(TerrainError::InvalidCellSize(cell_size));
    }

    let resolution = field.resolution();
    let mut registry = VertexRegistry::new();
    let mut mesh = TerrainMesh::new_empty();

    for x in 0..resolution {
        for y in 0..resolution {
            for z in 0..resolution {
                let cell = [x, y, z];
                let state = get_state(field, cell, threshold);
                mesh.append_cell(mesh_cell(cell, state, &mut registry, cell_size)?);
            }
        }
    }

    mesh.create_normals();

    debug!(
        resolution,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "generated terrain mesh"
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        field::{EMPTY, SOLID},
        types::VertexKey,
    };

    fn position_bits(p: &Point) -> [u32; 3] {
        [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
    }

    fn bumpy_field() -> ScalarField {
        ScalarField::from_fn(6, &|[x, y, z]| ((x * 7 + y * 13 + z * 5) % 3) as Value * 0.5).unwrap()
    }

    #[test]
    fn flat_top_is_a_single_sheet() {
        let cell_size = 2.0;
        let field = ScalarField::flat_top(3).unwrap();
        let mesh = generate_mesh(&field, 0.1, cell_size).unwrap();

        // 4 × 4 vertical edges crossed, 3 × 3 top cells with 2 triangles each.
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.triangle_count(), 18);

        let sheet_y = 3.0 * cell_size - 0.5 * cell_size;
        for p in &mesh.vertices {
            assert_eq!(p.y, sheet_y);
        }
        for n in &mesh.normals {
            assert_eq!(*n, Vector::y());
        }
        for tri in 0..mesh.triangle_count() {
            assert_eq!(mesh.tri_normal(tri), Vector::y());
        }
    }

    #[test]
    fn uniform_fields_are_empty() {
        for value in [EMPTY, 0.05, SOLID, 4.0] {
            let field = ScalarField::filled(3, value).unwrap();
            let mesh = generate_mesh(&field, 0.1, 1.0).unwrap();
            assert_eq!(mesh.vertex_count(), 0, "value {value}");
            assert_eq!(mesh.triangle_count(), 0, "value {value}");
            assert!(mesh.is_empty());
        }
    }

    #[test]
    fn regeneration_is_deterministic() {
        let field = bumpy_field();
        let first = generate_mesh(&field, 0.4, 0.75).unwrap();
        let second = generate_mesh(&field, 0.4, 0.75).unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn vertices_are_unique_and_triangles_valid() {
        let mesh = generate_mesh(&bumpy_field(), 0.4, 0.3).unwrap();
        assert!(!mesh.is_empty());

        let unique: HashSet<[u32; 3]> = mesh.vertices.iter().map(position_bits).collect();
        assert_eq!(unique.len(), mesh.vertex_count());
        assert_eq!(mesh.normals.len(), mesh.vertex_count());

        for [a, b, c] in &mesh.triangles {
            assert!((*a as usize) < mesh.vertex_count());
            assert!((*b as usize) < mesh.vertex_count());
            assert!((*c as usize) < mesh.vertex_count());
            assert!(a != b && b != c && a != c);
        }
    }

    #[test]
    fn neighbouring_cells_share_their_edge_vertex() {
        // Corner (1,0,0) dug out: it belongs to cells (0,0,0) and (1,0,0) of a 2×1×1 slab.
        let mut field = ScalarField::filled(2, SOLID).unwrap();
        field.set([1, 0, 0], EMPTY).unwrap();

        let mut registry = VertexRegistry::new();
        let left_state = get_state(&field, [0, 0, 0], 0.1);
        let right_state = get_state(&field, [1, 0, 0], 0.1);
        let left = mesh_cell([0, 0, 0], left_state, &mut registry, 1.0).unwrap();
        let right = mesh_cell([1, 0, 0], right_state, &mut registry, 1.0).unwrap();

        assert_eq!(left.vertices.len(), 3);
        assert_eq!(left.triangles.len(), 1);
        // Edges along y and z from (1,0,0) are shared; only the +x edge is new.
        assert_eq!(right.vertices, vec![Point::new(1.5, 0.0, 0.0)]);
        assert_eq!(right.triangles.len(), 1);
        assert_eq!(registry.len(), 4);

        let shared_y = registry.get(VertexKey([2, 1, 0])).unwrap();
        assert!(left.triangles[0].contains(&shared_y));
        assert!(right.triangles[0].contains(&shared_y));
    }

    #[test]
    fn degenerate_configurations_emit_nothing() {
        let mut registry = VertexRegistry::new();
        for state in [0, 255] {
            let cell = mesh_cell([0, 0, 0], state, &mut registry, 1.0).unwrap();
            assert_eq!(cell, CellMesh::default());
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn row_naming_inactive_edge_aborts() {
        // Configuration 1 only crosses edges 0, 3 and 8.
        let mut registry = VertexRegistry::new();
        let result = mesh_cell_with(
            [0, 0, 0],
            1,
            [[0, 3, 8], [0, 8, 5]].into_iter(),
            &mut registry,
            1.0,
        );
        assert_eq!(
            result,
            Err(TerrainError::MissingEdgeVertex { state: 1, edge: 5 })
        );
    }

    #[test]
    fn invalid_cell_size_is_rejected() {
        let field = ScalarField::flat_top(3).unwrap();
        for cell_size in [0.0, -1.0, -0.0, Value::NAN, Value::INFINITY] {
            assert!(
                matches!(
                    generate_mesh(&field, 0.1, cell_size),
                    Err(TerrainError::InvalidCellSize(_))
                ),
                "cell size {cell_size}"
            );
        }
    }

    #[test]
    fn digging_changes_only_local_geometry() {
        let mut field = ScalarField::flat_top(4).unwrap();
        let before = generate_mesh(&field, 0.1, 1.0).unwrap();
        let states_before: Vec<u8> = cells(4).map(|c| get_state(&field, c, 0.1)).collect();

        field.dig([2, 2, 2], 1.0).unwrap();
        let after = generate_mesh(&field, 0.1, 1.0).unwrap();
        let states_after: Vec<u8> = cells(4).map(|c| get_state(&field, c, 0.1)).collect();

        let changed: Vec<CellCoord> = cells(4)
            .zip(states_before.iter().zip(&states_after))
            .filter(|(_, (a, b))| a != b)
            .map(|(c, _)| c)
            .collect();
        assert_eq!(changed.len(), 8);
        for [x, y, z] in &changed {
            assert!((1..=2).contains(x) && (1..=2).contains(y) && (1..=2).contains(z));
        }

        // A one-corner cavity: 6 midpoints around (2,2,2), one triangle per touching cell.
        assert_eq!(after.vertex_count(), before.vertex_count() + 6);
        assert_eq!(after.triangle_count(), before.triangle_count() + 8);

        let old: HashSet<[u32; 3]> = before.vertices.iter().map(position_bits).collect();
        let new: HashSet<[u32; 3]> = after.vertices.iter().map(position_bits).collect();
        assert!(old.is_subset(&new));
        for p in after.vertices.iter().filter(|p| !old.contains(&position_bits(p))) {
            for c in [p.x, p.y, p.z] {
                assert!((1.0..=3.0).contains(&c), "{p:?} is outside the dug cells");
            }
        }
    }

    #[test]
    fn buffers_flatten_in_order() {
        let mesh = generate_mesh(&ScalarField::flat_top(1).unwrap(), 0.1, 1.0).unwrap();
        let (positions, normals, indices) = mesh.clone().into_buffers();

        assert_eq!(positions.len(), 4);
        assert_eq!(normals.len(), 4);
        assert_eq!(indices.len(), 6);
        assert_eq!(&indices[..3], &mesh.triangles[0]);
        assert_eq!(positions[0], [0.0, 0.5, 0.0]);
    }

    fn cells(resolution: usize) -> impl Iterator<Item = CellCoord> {
        (0..resolution).flat_map(move |x| {
            (0..resolution).flat_map(move |y| (0..resolution).map(move |z| [x, y, z]))
        })
    }
}
