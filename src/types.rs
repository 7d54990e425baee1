use nalgebra::{Point3, Vector3};

/// Density sample stored in the field.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// Integer lattice coordinate `[x, y, z]`.
///
/// Signed so that callers converting picked points can hand over coordinates
/// that fall outside the field; those are rejected, not wrapped.
pub type LatticeCoord = [i64; 3];

/// Cell coordinate `[x, y, z]`, each in `0..resolution`.
pub type CellCoord = [usize; 3];

/// A density fill rule: maps a lattice point `[x, y, z]` to its sample.
///
/// Results are clamped to `>= 0` when stored.
pub type FillFunction = dyn Fn([usize; 3]) -> Value + Sync;

/// Position of an edge midpoint on the half-lattice (`2 * cell + edge offset`).
///
/// Used as the vertex identity during a mesh pass. Integer keys make a shared
/// edge collapse to one vertex no matter which cell computed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey(pub [u32; 3]);

impl VertexKey {
    /// World-space position of the key for the given cell size.
    ///
    /// Computed from the key alone, so equal keys always yield bit-identical points.
    #[inline]
    pub fn position(self, cell_size: Value) -> Point {
        let half = 0.5 * cell_size;
        Point::new(
            self.0[0] as Value * half,
            self.0[1] as Value * half,
            self.0[2] as Value * half,
        )
    }
}
