//! Shape registry mapping tensor names to their dimensions.

use crate::error::{AccelError, AccelResult};
use std::collections::HashMap;

/// Tensor dimensions, outermost first.
pub type Shape = Vec<u32>;

/// Records the shape of every named tensor the executor knows about.
///
/// The executor only adds shapes when inputs and outputs are registered;
/// afterwards it reads element counts to size buffer bindings.
#[derive(Debug, Clone, Default)]
pub struct Shaper {
    shapes: HashMap<String, Shape>,
}

impl Shaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `shape` for `name`, replacing any previous entry.
    pub fn add_shape(&mut self, name: impl Into<String>, shape: Shape) {
        self.shapes.insert(name.into(), shape);
    }

    /// Shape registered for `name`.
    pub fn get_shape(&self, name: &str) -> AccelResult<&Shape> {
        self.shapes
            .get(name)
            .ok_or_else(|| AccelError::UnknownTensor(name.to_string()))
    }

    /// Total element count of `name`: the product of its dimensions.
    ///
    /// A rank-0 shape counts as one element.
    pub fn get_size(&self, name: &str) -> AccelResult<usize> {
        let shape = self.get_shape(name)?;
        shape.iter().try_fold(1usize, |acc, &dim| {
            acc.checked_mul(dim as usize).ok_or_else(|| {
                AccelError::invalid_argument(format!(
                    "element count of '{}' with shape {:?} overflows usize",
                    name, shape
                ))
            })
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
