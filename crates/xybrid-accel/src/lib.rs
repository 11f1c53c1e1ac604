//! Xybrid Accel - Execution lifecycle management for compiled neural-network
//! graphs on hardware accelerators.
//!
//! ## Quick Start
//!
//! Use the [`prelude`] module for common imports:
//!
//! ```rust,ignore
//! use xybrid_accel::prelude::*;
//! use xybrid_accel::runtime_adapter::NnapiRuntime;
//!
//! let runtime = Arc::new(NnapiRuntime::new());
//! let graph = CompiledGraph::new(&runtime, model, compilation)
//!     .with_weights(&runtime, WeightRegion::map_file("model.bin", true)?, memory);
//!
//! let mut executor = ModelExecutor::with_graph(runtime, graph, ExecutorConfig::new("mobilenet"));
//! executor.register_input("input", vec![1, 224, 224, 3])?;
//! executor.register_output("logits", vec![1, 1000])?;
//!
//! let mut logits = vec![0.0f32; 1000];
//! executor.predict_into(&[&pixels[..]], &mut [&mut logits[..]])?;
//! ```
//!
//! ## Module Organization
//!
//! - [`executor`] - [`ModelExecutor`]: context lifecycle, binding, compute
//! - [`shaper`] - Tensor name to shape registry
//! - [`runtime_adapter`] - Accelerator runtime trait, RAII handles, NNAPI binding
//! - [`weights`] - Memory-mapped weight data
//! - [`config`] - Executor configuration
//! - [`error`] - Error types
//!
//! ## Logging
//!
//! Diagnostics go through the `log` facade under the `xybrid_accel` target.

/// Common imports for xybrid-accel users.
pub mod prelude;

pub mod error;
pub use error::{AccelError, AccelResult, ErrorKind};

pub mod config;
pub mod executor;
pub mod runtime_adapter;
pub mod shaper;
pub mod weights;

pub use config::ExecutorConfig;
pub use executor::{BindingKind, ExecutionPhase, ExecutorStats, ModelExecutor, TensorElement};

/// Testing utilities (mock runtime, fixtures)
#[doc(hidden)]
pub mod testing;
