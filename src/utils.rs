use crate::{
    field::ScalarField,
    tables::{CORNER_OFFSETS, EDGE_MIDPOINT_OFFSETS, EDGE_TABLE, TRI_END, TRI_TABLE},
    types::{CellCoord, Value, VertexKey},
};

/// Returns the 8 lattice points of the cell at `(x, y, z)`, in [`CORNER_OFFSETS`] order.
///
/// ```text
///  0 = (x,   y,   z  )    4 = (x,   y+1, z  )
///  1 = (x,   y,   z+1)    5 = (x,   y+1, z+1)
///  2 = (x+1, y,   z+1)    6 = (x+1, y+1, z+1)
///  3 = (x+1, y,   z  )    7 = (x+1, y+1, z  )
/// ```
#[inline]
pub fn cell_corner_indices([x, y, z]: CellCoord) -> [[usize; 3]; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| [x + dx, y + dy, z + dz])
}

/// Computes the marching cubes state bitmask for a cell.
///
/// A bit is set when the corner's sample is **strictly below** the threshold, i.e.
/// the corner has been dug out:
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 below threshold?
/// ```
///
/// # Panics
/// Panics if `cell` is not inside the field (any component `>= resolution`).
#[inline]
pub fn get_state(field: &ScalarField, cell: CellCoord, threshold: Value) -> u8 {
    cell_corner_indices(cell)
        .iter()
        .enumerate()
        .fold(0_u8, |state, (i, &[x, y, z])| {
            if field.sample(x, y, z) < threshold {
                state | (1 << i)
            } else {
                state
            }
        })
}

/// Edges crossed by the surface for `state`, in ascending edge order.
///
/// `EDGE_TABLE[state]` is a 12-bit field; bit `i` set means edge `i` is active:
/// ```text
/// 1001_0000_0101 -> 0, 2, 8, 11
/// ```
#[inline]
pub fn active_edges(state: u8) -> impl Iterator<Item = u8> {
    let mask = EDGE_TABLE[state as usize];
    (0..12_u8).filter(move |&edge| mask & (1 << edge) != 0)
}

/// Triangles for `state` as edge index triples, in table order.
///
/// `TRI_TABLE[state]` contains edge indices in groups of three, terminated by `-1`:
/// ```text
/// TRI_TABLE[state] = [e0, e1, e2,  e3, e4, e5,  -1, ...]
///                     \___tri0__/   \___tri1__/
/// ```
#[inline]
pub fn triangle_edges_from_state(state: u8) -> impl Iterator<Item = [u8; 3]> {
    let row = &TRI_TABLE[state as usize];
    let len = row.iter().take_while(|&&e| e != TRI_END).count();
    row[..len]
        .chunks_exact(3)
        .map(|tri| [tri[0] as u8, tri[1] as u8, tri[2] as u8])
}

/// Half-lattice key of the midpoint of `edge` in the cell at `(x, y, z)`.
#[inline]
pub fn edge_midpoint_key([x, y, z]: CellCoord, edge: u8) -> VertexKey {
    let [ox, oy, oz] = EDGE_MIDPOINT_OFFSETS[edge as usize];
    VertexKey([
        2 * x as u32 + ox,
        2 * y as u32 + oy,
        2 * z as u32 + oz,
    ])
}
