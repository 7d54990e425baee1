use ndarray::{Array3, Zip};

use crate::{
    error::{Result, TerrainError},
    types::{FillFunction, LatticeCoord, Value},
};

/// Sample value of untouched ground.
pub const SOLID: Value = 1.0;

/// Sample value of fully dug-out space. Also the floor every sample is clamped to.
pub const EMPTY: Value = 0.0;

/// Dense density samples over a cubic lattice.
///
/// A field of resolution `n` has `(n + 1)^3` samples indexed `[x, y, z]` with each
/// component in `0..=n`, and `n^3` cells between them. Samples never drop below
/// [`EMPTY`]. The lattice is allocated once and never resized.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    resolution: usize,
    values: Array3<Value>,
}

impl ScalarField {
    /// Builds a field by evaluating `fill` at every lattice point.
    ///
    /// Samples are evaluated in parallel and clamped to `>= EMPTY`.
    pub fn from_fn(resolution: usize, fill: &FillFunction) -> Result<Self> {
        if resolution == 0 {
            return Err(TerrainError::InvalidResolution(resolution));
        }
        Ok(Self::fill_lattice(resolution, fill))
    }

    /// Solid everywhere except the topmost layer (`y == resolution`), which is empty.
    ///
    /// Meshes to a single flat sheet half a cell below the top of the field.
    pub fn flat_top(resolution: usize) -> Result<Self> {
        Self::from_fn(resolution, &flat_top_rule(resolution))
    }

    /// Every sample set to `value`.
    pub fn filled(resolution: usize, value: Value) -> Result<Self> {
        Self::from_fn(resolution, &move |_| value)
    }

    /// `resolution` must be at least 1.
    pub(crate) fn fill_lattice(resolution: usize, fill: &FillFunction) -> Self {
        let side = resolution + 1;
        let mut values = Array3::zeros((side, side, side));
        Zip::indexed(&mut values).par_for_each(|(x, y, z), sample: &mut Value| {
            *sample = fill([x, y, z]).max(EMPTY);
        });
        Self { resolution, values }
    }

    /// Number of cells along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Raw sample storage, indexed `[x, y, z]`.
    pub fn values(&self) -> &Array3<Value> {
        &self.values
    }

    /// Returns the sample at `coord`, or `None` if it is outside the lattice.
    pub fn get(&self, coord: LatticeCoord) -> Option<Value> {
        let [x, y, z] = self.lattice_index(coord).ok()?;
        self.values.get((x, y, z)).copied()
    }

    /// Sample at an in-range lattice point.
    ///
    /// # Panics
    /// Panics if any component exceeds [`resolution`](ScalarField::resolution).
    #[inline]
    pub fn sample(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[x, y, z]]
    }

    /// Overwrites the sample at `coord`, clamped to `>= EMPTY`.
    pub fn set(&mut self, coord: LatticeCoord, value: Value) -> Result<()> {
        let [x, y, z] = self.lattice_index(coord)?;
        self.values[[x, y, z]] = value.max(EMPTY);
        Ok(())
    }

    /// Lowers the sample at `coord` by `strength`, stopping at [`EMPTY`].
    ///
    /// Out-of-range coordinates and negative or non-finite strengths are rejected
    /// without touching the field.
    pub fn dig(&mut self, coord: LatticeCoord, strength: Value) -> Result<()> {
        let [x, y, z] = self.lattice_index(coord)?;
        if !strength.is_finite() || strength < 0.0 {
            return Err(TerrainError::InvalidStrength(strength));
        }

        let sample = &mut self.values[[x, y, z]];
        *sample = (*sample - strength).max(EMPTY);
        Ok(())
    }

    /// Checks `coord` against `[0, resolution]` on every axis.
    pub fn lattice_index(&self, coord: LatticeCoord) -> Result<[usize; 3]> {
        let max = self.resolution as i64;
        if coord.iter().any(|&c| c < 0 || c > max) {
            return Err(TerrainError::OutOfBounds {
                coord,
                resolution: self.resolution,
            });
        }
        Ok(coord.map(|c| c as usize))
    }
}

/// Fill rule behind [`ScalarField::flat_top`].
pub(crate) fn flat_top_rule(resolution: usize) -> impl Fn([usize; 3]) -> Value + Sync {
    move |[_, y, _]| if y == resolution { EMPTY } else { SOLID }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_top_layout() {
        let field = ScalarField::flat_top(3).unwrap();
        assert_eq!(field.values().dim(), (4, 4, 4));

        for ((x, y, z), &v) in field.values().indexed_iter() {
            let expected = if y == 3 { EMPTY } else { SOLID };
            assert_eq!(v, expected, "sample ({x}, {y}, {z})");
        }
    }

    #[test]
    fn zero_resolution_is_rejected() {
        assert_eq!(
            ScalarField::flat_top(0),
            Err(TerrainError::InvalidResolution(0))
        );
    }

    #[test]
    fn fill_is_clamped() {
        let field = ScalarField::from_fn(2, &|[x, _, _]| x as Value - 1.0).unwrap();
        assert_eq!(field.get([0, 0, 0]), Some(EMPTY));
        assert_eq!(field.get([1, 0, 0]), Some(EMPTY));
        assert_eq!(field.get([2, 0, 0]), Some(1.0));
    }

    #[test]
    fn fill_receives_lattice_coordinates() {
        let field =
            ScalarField::from_fn(4, &|[x, y, z]| (x * 100 + y * 10 + z) as Value).unwrap();
        assert_eq!(field.sample(1, 2, 3), 123.0);
        assert_eq!(field.sample(4, 0, 2), 402.0);
        assert_eq!(field.get([3, 4, 1]), Some(341.0));
    }

    #[test]
    fn dig_out_of_range_is_reported_and_ignored() {
        let mut field = ScalarField::flat_top(3).unwrap();
        let before = field.clone();

        for coord in [[-1, 0, 0], [0, 4, 0], [0, 0, 4], [4, 4, 4], [0, -7, 2]] {
            assert_eq!(
                field.dig(coord, 0.5),
                Err(TerrainError::OutOfBounds {
                    coord,
                    resolution: 3
                })
            );
        }
        assert_eq!(field, before);
    }

    #[test]
    fn dig_floors_at_empty() {
        let mut field = ScalarField::flat_top(3).unwrap();

        field.dig([1, 1, 1], 0.8).unwrap();
        assert!((field.sample(1, 1, 1) - 0.2).abs() < 1e-6);

        field.dig([1, 1, 1], 0.8).unwrap();
        assert_eq!(field.sample(1, 1, 1), EMPTY);

        field.dig([1, 1, 1], 0.8).unwrap();
        assert_eq!(field.sample(1, 1, 1), EMPTY);
    }

    #[test]
    fn dig_accepts_lattice_boundary() {
        let mut field = ScalarField::filled(2, SOLID).unwrap();
        field.dig([0, 0, 0], 1.0).unwrap();
        field.dig([2, 2, 2], 1.0).unwrap();
        assert_eq!(field.sample(0, 0, 0), EMPTY);
        assert_eq!(field.sample(2, 2, 2), EMPTY);
    }

    #[test]
    fn zero_strength_is_a_noop() {
        let mut field = ScalarField::flat_top(3).unwrap();
        let before = field.clone();
        field.dig([2, 1, 0], 0.0).unwrap();
        assert_eq!(field, before);
    }

    #[test]
    fn invalid_strength_is_rejected() {
        let mut field = ScalarField::flat_top(3).unwrap();
        let before = field.clone();

        assert_eq!(
            field.dig([1, 1, 1], -0.5),
            Err(TerrainError::InvalidStrength(-0.5))
        );
        assert!(field.dig([1, 1, 1], Value::NAN).is_err());
        assert!(field.dig([1, 1, 1], Value::INFINITY).is_err());
        assert_eq!(field, before);
    }

    #[test]
    fn set_clamps_negative_values() {
        let mut field = ScalarField::filled(1, SOLID).unwrap();
        field.set([1, 0, 1], -3.0).unwrap();
        assert_eq!(field.get([1, 0, 1]), Some(EMPTY));
        assert!(field.set([2, 0, 0], 0.5).is_err());
    }
}
