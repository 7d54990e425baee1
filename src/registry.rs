use bevy::platform::collections::HashMap;

use crate::types::VertexKey;

/// Maps edge midpoints to global vertex indices for one mesh pass.
///
/// Each distinct [`VertexKey`] is given the next sequential index the first time it
/// is seen. The registry lives for a single pass and is dropped with it.
#[derive(Debug, Default)]
pub struct VertexRegistry {
    indices: HashMap<VertexKey, u32>,
}

impl VertexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `key` and whether it was newly registered.
    ///
    /// New keys get `len()` as their index, so the caller must append the vertex
    /// to its output exactly when the second value is `true`.
    pub fn register(&mut self, key: VertexKey) -> (u32, bool) {
        let next = self.indices.len() as u32;
        match self.indices.get(&key) {
            Some(&index) => (index, false),
            None => {
                self.indices.insert(key, next);
                (next, true)
            }
        }
    }

    pub fn get(&self, key: VertexKey) -> Option<u32> {
        self.indices.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
