//! The pending execution context of a [`ModelExecutor`](super::ModelExecutor).

use super::BindingKind;
use crate::runtime_adapter::{NeuralNetworksRuntime, ScopedHandle};

/// Where the executor is in the lifecycle of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    /// No execution context exists.
    Absent,
    /// A context exists with nothing bound yet.
    Prepared,
    /// At least one buffer is bound; waiting for compute.
    Bound,
}

/// One execution handle plus the positions bound on it.
///
/// Consumed by exactly one compute; the handle is freed when this drops.
pub(crate) struct ExecutionContext<R: NeuralNetworksRuntime> {
    handle: ScopedHandle<R, R::Execution>,
    inputs: Vec<bool>,
    outputs: Vec<bool>,
}

impl<R: NeuralNetworksRuntime> ExecutionContext<R> {
    pub(crate) fn new(handle: ScopedHandle<R, R::Execution>, inputs: usize, outputs: usize) -> Self {
        Self {
            handle,
            inputs: vec![false; inputs],
            outputs: vec![false; outputs],
        }
    }

    pub(crate) fn raw_mut(&mut self) -> &mut R::Execution {
        self.handle.get_mut()
    }

    pub(crate) fn mark_bound(&mut self, kind: BindingKind, index: usize) {
        let slots = match kind {
            BindingKind::Input => &mut self.inputs,
            BindingKind::Output => &mut self.outputs,
        };
        if let Some(slot) = slots.get_mut(index) {
            *slot = true;
        }
    }

    pub(crate) fn phase(&self) -> ExecutionPhase {
        if self.inputs.iter().chain(&self.outputs).any(|&b| b) {
            ExecutionPhase::Bound
        } else {
            ExecutionPhase::Prepared
        }
    }

    /// Positions of `kind` not bound yet.
    pub(crate) fn unbound(&self, kind: BindingKind) -> Vec<usize> {
        let slots = match kind {
            BindingKind::Input => &self.inputs,
            BindingKind::Output => &self.outputs,
        };
        slots
            .iter()
            .enumerate()
            .filter(|(_, &bound)| !bound)
            .map(|(i, _)| i)
            .collect()
    }
}
