use derive_more::Display;

use crate::types::{LatticeCoord, Value};

pub type Result<T> = core::result::Result<T, TerrainError>;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum TerrainError {
    /// A dig targeted a lattice point outside `[0, resolution]`.
    #[display("lattice coordinate {coord:?} is outside [0, {resolution}]")]
    OutOfBounds {
        coord: LatticeCoord,
        resolution: usize,
    },
    /// Dig strength was negative or not finite.
    #[display("invalid dig strength {_0}")]
    InvalidStrength(Value),
    /// Triangulation referenced an edge with no registered vertex.
    ///
    /// Means the tables or the registry are broken; the pass is aborted.
    #[display("configuration {state} references edge {edge} with no vertex")]
    MissingEdgeVertex { state: u8, edge: u8 },
    /// Cell size was zero, negative or not finite.
    #[display("invalid cell size {_0}")]
    InvalidCellSize(Value),
    /// A field needs at least one cell per axis.
    #[display("invalid resolution {_0}")]
    InvalidResolution(usize),
}

impl std::error::Error for TerrainError {}
