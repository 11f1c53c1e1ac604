//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust,ignore
//! use xybrid_accel::prelude::*;
//!
//! let mut executor = ModelExecutor::with_graph(runtime, graph, ExecutorConfig::new("mobilenet"));
//! executor.register_input("input", vec![1, 224, 224, 3])?;
//! ```
//!
//! # What's Included
//!
//! - [`ModelExecutor`], [`ExecutionPhase`], [`TensorElement`] - Prediction lifecycle
//! - [`CompiledGraph`], [`WeightRegion`] - Resources owned by an executor
//! - [`NeuralNetworksRuntime`], [`Status`] - Backend seam
//! - [`AccelError`], [`AccelResult`], [`ErrorKind`] - Errors

// ============================================================================
// Execution
// ============================================================================

pub use crate::config::ExecutorConfig;
pub use crate::executor::{ExecutionPhase, ModelExecutor, TensorElement};
pub use crate::shaper::Shape;

// ============================================================================
// Runtime
// ============================================================================

pub use crate::runtime_adapter::{CompiledGraph, NeuralNetworksRuntime, Status};
pub use crate::weights::WeightRegion;

// ============================================================================
// Error Types
// ============================================================================

pub use crate::error::{AccelError, AccelResult, ErrorKind};
