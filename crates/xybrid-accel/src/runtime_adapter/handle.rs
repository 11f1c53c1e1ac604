//! Scoped ownership of raw runtime handles.
//!
//! # Safety
//!
//! A [`ScopedHandle`] is move-only and calls its release function exactly once
//! from `Drop`, so handles are freed on every early-return path. A
//! [`CompiledGraph`] bundles the handles produced by the upstream compile step;
//! its field order is its teardown order.

use super::NeuralNetworksRuntime;
use crate::weights::WeightRegion;
use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

/// Owns one raw handle of runtime `R` and releases it on drop.
pub struct ScopedHandle<R: NeuralNetworksRuntime, H> {
    runtime: Arc<R>,
    raw: ManuallyDrop<H>,
    release: fn(&R, H),
}

impl<R: NeuralNetworksRuntime, H> ScopedHandle<R, H> {
    /// Take ownership of `raw`; `release` is invoked with it on drop.
    pub fn new(runtime: &Arc<R>, raw: H, release: fn(&R, H)) -> Self {
        Self {
            runtime: Arc::clone(runtime),
            raw: ManuallyDrop::new(raw),
            release,
        }
    }

    pub fn get(&self) -> &H {
        &self.raw
    }

    pub fn get_mut(&mut self) -> &mut H {
        &mut self.raw
    }

    /// Give up ownership without releasing. The caller must free `H`.
    pub fn into_raw(self) -> H {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so each field is taken exactly once.
        unsafe {
            std::ptr::drop_in_place(&mut this.runtime);
            ManuallyDrop::take(&mut this.raw)
        }
    }
}

impl<R: NeuralNetworksRuntime, H> Drop for ScopedHandle<R, H> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        (self.release)(&self.runtime, raw);
    }
}

impl<R: NeuralNetworksRuntime, H: fmt::Debug> fmt::Debug for ScopedHandle<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedHandle").field(&*self.raw).finish()
    }
}

/// A compiled network handed over by the compile step.
///
/// Holds the model and compilation handles and, when the network has constant
/// data, the mapped weight region plus the runtime memory handle wrapping it.
/// Dropping the bundle releases, in order: the weight mapping, the model, the
/// compilation, the memory handle.
pub struct CompiledGraph<R: NeuralNetworksRuntime> {
    // Field order is drop order.
    weights: Option<WeightRegion>,
    model: ScopedHandle<R, R::Model>,
    compilation: ScopedHandle<R, R::Compilation>,
    memory: Option<ScopedHandle<R, R::Memory>>,
}

impl<R: NeuralNetworksRuntime> CompiledGraph<R> {
    /// Take ownership of a model and its compilation.
    pub fn new(runtime: &Arc<R>, model: R::Model, compilation: R::Compilation) -> Self {
        Self {
            weights: None,
            model: ScopedHandle::new(runtime, model, R::model_free),
            compilation: ScopedHandle::new(runtime, compilation, R::compilation_free),
            memory: None,
        }
    }

    /// Attach the mapped weight data and the runtime memory wrapping it.
    pub fn with_weights(mut self, runtime: &Arc<R>, weights: WeightRegion, memory: R::Memory) -> Self {
        self.weights = Some(weights);
        self.memory = Some(ScopedHandle::new(runtime, memory, R::memory_free));
        self
    }

    pub fn compilation(&self) -> &R::Compilation {
        self.compilation.get()
    }

    pub fn model(&self) -> &R::Model {
        self.model.get()
    }

    pub fn weights(&self) -> Option<&WeightRegion> {
        self.weights.as_ref()
    }

    pub fn memory(&self) -> Option<&R::Memory> {
        self.memory.as_ref().map(|m| m.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HandleKind, MockRuntime};

    #[test]
    fn test_scoped_handle_releases_once() {
        let runtime = Arc::new(MockRuntime::new());
        let raw = runtime.create_model();
        {
            let handle = ScopedHandle::new(&runtime, raw, MockRuntime::model_free);
            assert_eq!(handle.get(), &raw);
            assert_eq!(runtime.live(HandleKind::Model), 1);
        }
        assert_eq!(runtime.live(HandleKind::Model), 0);
        assert_eq!(runtime.freed(HandleKind::Model), 1);
    }

    #[test]
    fn test_into_raw_skips_release() {
        let runtime = Arc::new(MockRuntime::new());
        let raw = runtime.create_model();
        let handle = ScopedHandle::new(&runtime, raw, MockRuntime::model_free);
        assert_eq!(Arc::strong_count(&runtime), 2);

        let raw = handle.into_raw();
        assert_eq!(Arc::strong_count(&runtime), 1);
        assert_eq!(runtime.live(HandleKind::Model), 1);

        runtime.model_free(raw);
        assert_eq!(runtime.freed(HandleKind::Model), 1);
    }

    #[test]
    fn test_compiled_graph_teardown_order() {
        let runtime = Arc::new(MockRuntime::new());
        let graph = runtime.compiled_graph_with_weights(64).unwrap();
        assert!(graph.weights().is_some());
        assert!(graph.memory().is_some());
        drop(graph);

        assert_eq!(
            runtime.release_log(),
            vec![HandleKind::Model, HandleKind::Compilation, HandleKind::Memory]
        );
        assert_eq!(runtime.live_total(), 0);
    }
}
