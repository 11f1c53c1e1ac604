//! Model execution manager.
//!
//! [`ModelExecutor`] owns a compiled graph and drives predictions against it:
//!
//! ```text
//! register_input / register_output      (setup: fills the shaper)
//!         │
//! predict* / set_*_buffer               (lazily creates an execution context,
//!         │                              binds caller buffers by position)
//! compute_and_wait                      (start compute, wait, free event and
//!                                        context; phase returns to Absent)
//! ```
//!
//! At most one execution context is alive per executor. All operations take
//! `&mut self`, so predictions through one executor are sequential.
//!
//! # Example
//!
//! ```rust,ignore
//! use xybrid_accel::executor::ModelExecutor;
//!
//! let mut executor = ModelExecutor::with_graph(runtime, graph, ExecutorConfig::default())?;
//! executor.register_input("x", vec![1, 4])?;
//! executor.register_output("y", vec![1, 2])?;
//!
//! let mut output = vec![0.0f32; 2];
//! executor.predict_into(&[&[1.0f32, 2.0, 3.0, 4.0][..]], &mut [&mut output[..]])?;
//! ```

mod binding;
mod context;
mod element;
mod predict;

pub use context::ExecutionPhase;
pub use element::TensorElement;

use crate::config::ExecutorConfig;
use crate::error::{AccelError, AccelResult};
use crate::runtime_adapter::{CompiledGraph, NeuralNetworksRuntime, ScopedHandle};
use crate::shaper::{Shape, Shaper};
use context::ExecutionContext;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which binding list a position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Input,
    Output,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Input => f.write_str("input"),
            BindingKind::Output => f.write_str("output"),
        }
    }
}

/// Counters describing what an executor has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Execution contexts created
    pub contexts_created: u64,
    /// Computes that finished successfully
    pub predictions_completed: u64,
    /// Computes that failed at start or wait
    pub predictions_failed: u64,
    /// Wall time of the most recent successful compute
    pub last_compute: Option<Duration>,
}

/// Owns a compiled graph and runs predictions on it.
pub struct ModelExecutor<R: NeuralNetworksRuntime> {
    // Field order is drop order: a pending context is freed before the graph.
    context: Option<ExecutionContext<R>>,
    graph: Option<CompiledGraph<R>>,
    runtime: Arc<R>,
    shaper: Shaper,
    input_names: Vec<String>,
    output_names: Vec<String>,
    config: ExecutorConfig,
    stats: ExecutorStats,
}

impl<R: NeuralNetworksRuntime> ModelExecutor<R> {
    /// Create an executor with no compiled graph attached.
    ///
    /// Registration works immediately; anything that needs an execution
    /// context fails with `InvalidState` until [`attach_graph`](Self::attach_graph).
    pub fn new(runtime: Arc<R>, config: ExecutorConfig) -> Self {
        Self {
            context: None,
            graph: None,
            runtime,
            shaper: Shaper::new(),
            input_names: Vec::new(),
            output_names: Vec::new(),
            config,
            stats: ExecutorStats::default(),
        }
    }

    /// Create an executor that owns `graph` from now on.
    pub fn with_graph(runtime: Arc<R>, graph: CompiledGraph<R>, config: ExecutorConfig) -> Self {
        let mut executor = Self::new(runtime, config);
        executor.graph = Some(graph);
        executor
    }

    /// Take ownership of a compiled graph.
    ///
    /// Fails with `InvalidState` if a graph is already attached; `graph` is
    /// then released immediately.
    pub fn attach_graph(&mut self, graph: CompiledGraph<R>) -> AccelResult<()> {
        if self.graph.is_some() {
            return Err(AccelError::invalid_state(format!(
                "[{}] a compiled graph is already attached",
                self.config.label
            )));
        }
        self.graph = Some(graph);
        Ok(())
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    pub fn graph(&self) -> Option<&CompiledGraph<R>> {
        self.graph.as_ref()
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.context
            .as_ref()
            .map_or(ExecutionPhase::Absent, |c| c.phase())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Create the execution context for the next prediction.
    ///
    /// Binding and compute call this implicitly; callers rarely need to. If a
    /// context is already pending this does nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if no compiled graph is attached
    /// - `Backend` if the runtime cannot create an execution
    pub fn prepare_for_execution(&mut self) -> AccelResult<()> {
        self.ensure_prepared().map(|_| ())
    }

    /// Discard a pending execution context and its bindings.
    ///
    /// Returns whether a context was pending.
    pub fn reset_execution(&mut self) -> bool {
        match self.context.take() {
            Some(_) => {
                log::debug!(
                    target: "xybrid_accel",
                    "[{}] Discarded pending execution context",
                    self.config.label
                );
                true
            }
            None => false,
        }
    }

    /// Return the pending context, creating one if none exists.
    fn ensure_prepared(&mut self) -> AccelResult<&mut ExecutionContext<R>> {
        let context = match self.context.take() {
            Some(context) => context,
            None => self.create_context()?,
        };
        Ok(self.context.insert(context))
    }

    fn create_context(&mut self) -> AccelResult<ExecutionContext<R>> {
        let graph = self.graph.as_ref().ok_or_else(|| {
            AccelError::invalid_state(format!(
                "[{}] cannot prepare execution: no compiled graph attached",
                self.config.label
            ))
        })?;

        let raw = self
            .runtime
            .execution_create(graph.compilation())
            .map_err(|status| AccelError::backend("execution_create", status))?;
        let handle = ScopedHandle::new(&self.runtime, raw, R::execution_free);

        self.stats.contexts_created += 1;
        log::debug!(
            target: "xybrid_accel",
            "[{}] Created execution context on {} ({} inputs, {} outputs)",
            self.config.label,
            self.runtime.name(),
            self.input_names.len(),
            self.output_names.len()
        );

        Ok(ExecutionContext::new(
            handle,
            self.input_names.len(),
            self.output_names.len(),
        ))
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Append a named input at the next position and record its shape.
    ///
    /// # Errors
    ///
    /// - `InvalidState` while an execution context is pending
    /// - `InvalidArgument` if `name` is already a registered input
    pub fn register_input(&mut self, name: impl Into<String>, shape: Shape) -> AccelResult<()> {
        self.register(BindingKind::Input, name.into(), shape)
    }

    /// Append a named output at the next position and record its shape.
    ///
    /// # Errors
    ///
    /// - `InvalidState` while an execution context is pending
    /// - `InvalidArgument` if `name` is already a registered output
    pub fn register_output(&mut self, name: impl Into<String>, shape: Shape) -> AccelResult<()> {
        self.register(BindingKind::Output, name.into(), shape)
    }

    fn register(&mut self, kind: BindingKind, name: String, shape: Shape) -> AccelResult<()> {
        if self.context.is_some() {
            return Err(AccelError::invalid_state(format!(
                "[{}] cannot register {} '{}' while an execution is pending",
                self.config.label, kind, name
            )));
        }
        // Inputs and outputs share one shape per name.
        if self.shaper.contains(&name) {
            let existing = self.shaper.get_shape(&name)?;
            if existing != &shape {
                return Err(AccelError::invalid_argument(format!(
                    "{} '{}' has shape {:?}, but that name is already registered with shape {:?}",
                    kind, name, shape, existing
                )));
            }
        }
        let names = match kind {
            BindingKind::Input => &mut self.input_names,
            BindingKind::Output => &mut self.output_names,
        };
        if names.contains(&name) {
            return Err(AccelError::invalid_argument(format!(
                "{} '{}' is already registered",
                kind, name
            )));
        }

        log::debug!(
            target: "xybrid_accel",
            "[{}] Registered {} {} '{}' with shape {:?}",
            self.config.label,
            kind,
            names.len(),
            name,
            shape
        );

        names.push(name.clone());
        self.shaper.add_shape(name, shape);
        Ok(())
    }

    /// Input names in position order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Output names in position order.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Element count of a registered tensor.
    pub fn get_size(&self, name: &str) -> AccelResult<usize> {
        self.shaper.get_size(name)
    }

    /// Shape of a registered tensor.
    pub fn get_shape(&self, name: &str) -> AccelResult<&Shape> {
        self.shaper.get_shape(name)
    }

    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    fn names(&self, kind: BindingKind) -> &[String] {
        match kind {
            BindingKind::Input => &self.input_names,
            BindingKind::Output => &self.output_names,
        }
    }
}

impl<R: NeuralNetworksRuntime> Drop for ModelExecutor<R> {
    fn drop(&mut self) {
        if self.context.is_some() {
            log::warn!(
                target: "xybrid_accel",
                "[{}] Dropping executor with a pending execution context",
                self.config.label
            );
        }
        log::trace!(
            target: "xybrid_accel",
            "[{}] Releasing executor resources ({} contexts created)",
            self.config.label,
            self.stats.contexts_created
        );
        // Fields drop next: context, then the graph (weights, model,
        // compilation, memory).
    }
}

impl<R: NeuralNetworksRuntime> fmt::Debug for ModelExecutor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelExecutor")
            .field("label", &self.config.label)
            .field("runtime", &self.runtime.name())
            .field("has_graph", &self.graph.is_some())
            .field("phase", &self.phase())
            .field("inputs", &self.input_names)
            .field("outputs", &self.output_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{HandleKind, MockRuntime};

    fn executor() -> (Arc<MockRuntime>, ModelExecutor<MockRuntime>) {
        let runtime = Arc::new(MockRuntime::new());
        let graph = runtime.compiled_graph();
        let executor =
            ModelExecutor::with_graph(Arc::clone(&runtime), graph, ExecutorConfig::new("test"));
        (runtime, executor)
    }

    #[test]
    fn test_register_and_lookup() {
        let (_runtime, mut executor) = executor();
        executor.register_input("x", vec![1, 4]).unwrap();
        executor.register_input("mask", vec![1, 4, 4]).unwrap();
        executor.register_output("y", vec![1, 2]).unwrap();

        assert_eq!(executor.input_names(), &["x".to_string(), "mask".to_string()]);
        assert_eq!(executor.output_names(), &["y".to_string()]);
        assert_eq!(executor.get_size("x").unwrap(), 4);
        assert_eq!(executor.get_size("mask").unwrap(), 16);
        assert_eq!(executor.get_shape("y").unwrap(), &vec![1, 2]);
    }

    #[test]
    fn test_size_is_product_for_every_input() {
        let (_runtime, mut executor) = executor();
        let shapes: Vec<Shape> = vec![vec![1], vec![2, 3], vec![1, 3, 5, 7], vec![8, 1, 1]];
        for (i, shape) in shapes.iter().enumerate() {
            executor.register_input(format!("in{}", i), shape.clone()).unwrap();
        }
        for (name, shape) in executor.input_names().iter().zip(&shapes) {
            let product: usize = shape.iter().map(|&d| d as usize).product();
            assert_eq!(executor.get_size(name).unwrap(), product);
        }
    }

    #[test]
    fn test_duplicate_name_rejected_within_list_only() {
        let (_runtime, mut executor) = executor();
        executor.register_input("x", vec![4]).unwrap();
        let err = executor.register_input("x", vec![4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // Same name on the other list is fine.
        executor.register_output("x", vec![4]).unwrap();
        assert_eq!(executor.input_names().len(), 1);
        assert_eq!(executor.output_names().len(), 1);
    }

    #[test]
    fn test_shared_name_must_keep_its_shape() {
        let (_runtime, mut executor) = executor();
        executor.register_input("t", vec![1, 4]).unwrap();

        let err = executor.register_output("t", vec![1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(executor.output_names().is_empty());
        assert_eq!(executor.get_size("t").unwrap(), 4);
        assert_eq!(executor.get_shape("t").unwrap(), &vec![1, 4]);

        executor.register_output("t", vec![1, 4]).unwrap();
        assert_eq!(executor.get_size("t").unwrap(), 4);
    }

    #[test]
    fn test_prepare_without_graph_is_invalid_state() {
        let runtime = Arc::new(MockRuntime::new());
        let mut executor = ModelExecutor::new(Arc::clone(&runtime), ExecutorConfig::default());
        assert!(!executor.has_graph());

        let err = executor.prepare_for_execution().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(runtime.created(HandleKind::Execution), 0);
        assert_eq!(executor.phase(), ExecutionPhase::Absent);
    }

    #[test]
    fn test_attach_graph_once() {
        let runtime = Arc::new(MockRuntime::new());
        let mut executor = ModelExecutor::new(Arc::clone(&runtime), ExecutorConfig::default());
        executor.attach_graph(runtime.compiled_graph()).unwrap();
        assert!(executor.has_graph());

        let err = executor.attach_graph(runtime.compiled_graph()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        // The rejected graph was released right away.
        assert_eq!(runtime.live(HandleKind::Compilation), 1);

        executor.prepare_for_execution().unwrap();
        assert_eq!(executor.phase(), ExecutionPhase::Prepared);
    }

    #[test]
    fn test_prepare_is_idempotent_while_pending() {
        let (runtime, mut executor) = executor();
        executor.prepare_for_execution().unwrap();
        executor.prepare_for_execution().unwrap();

        assert_eq!(runtime.created(HandleKind::Execution), 1);
        assert_eq!(executor.stats().contexts_created, 1);
    }

    #[test]
    fn test_prepare_backend_failure_carries_status() {
        let (runtime, mut executor) = executor();
        runtime.fail_next(crate::testing::MockOp::ExecutionCreate, crate::runtime_adapter::Status::OUT_OF_MEMORY);

        let err = executor.prepare_for_execution().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.status(), Some(crate::runtime_adapter::Status::OUT_OF_MEMORY));
        assert_eq!(executor.phase(), ExecutionPhase::Absent);

        // Still usable afterwards.
        executor.prepare_for_execution().unwrap();
        assert_eq!(executor.phase(), ExecutionPhase::Prepared);
    }

    #[test]
    fn test_register_while_pending_is_invalid_state() {
        let (_runtime, mut executor) = executor();
        executor.register_input("x", vec![4]).unwrap();
        executor.prepare_for_execution().unwrap();

        let err = executor.register_output("y", vec![2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        assert!(executor.reset_execution());
        assert!(!executor.reset_execution());
        executor.register_output("y", vec![2]).unwrap();
    }

    #[test]
    fn test_drop_releases_everything_once() {
        let (runtime, executor) = executor();
        drop(executor);

        assert_eq!(runtime.live_total(), 0);
        assert_eq!(runtime.freed(HandleKind::Model), 1);
        assert_eq!(runtime.freed(HandleKind::Compilation), 1);
        assert_eq!(
            runtime.release_log(),
            vec![HandleKind::Model, HandleKind::Compilation]
        );
    }

    #[test]
    fn test_drop_with_pending_context_frees_it_first() {
        let runtime = Arc::new(MockRuntime::new());
        let graph = runtime.compiled_graph_with_weights(128).unwrap();
        let mut executor =
            ModelExecutor::with_graph(Arc::clone(&runtime), graph, ExecutorConfig::default());
        executor.prepare_for_execution().unwrap();
        drop(executor);

        assert_eq!(
            runtime.release_log(),
            vec![
                HandleKind::Execution,
                HandleKind::Model,
                HandleKind::Compilation,
                HandleKind::Memory
            ]
        );
        assert_eq!(runtime.live_total(), 0);
    }
}
