//! Runtime Adapter module - Interface to the accelerator runtime.
//!
//! The [`NeuralNetworksRuntime`] trait is the capability set the executor
//! needs from a hardware-acceleration backend: creating and freeing execution
//! contexts, binding buffers by position, starting a compute and waiting on
//! its completion event, and releasing the handles that make up a compiled
//! graph. Every primitive reports failure with a raw [`Status`] code.
//!
//! Handles are owned through [`ScopedHandle`], which releases them exactly
//! once when dropped.
//!
//! # Module Organization
//!
//! - `handle` - RAII ownership of raw runtime handles, [`CompiledGraph`]
//! - `nnapi/` - Android Neural Networks API binding (feature `nnapi`)

use std::ffi::c_void;
use std::fmt;

pub mod handle;

#[cfg(feature = "nnapi")]
pub mod nnapi;

pub use handle::{CompiledGraph, ScopedHandle};

#[cfg(feature = "nnapi")]
pub use nnapi::NnapiRuntime;

/// Raw result code returned by a runtime primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const NO_ERROR: Status = Status(0);
    pub const OUT_OF_MEMORY: Status = Status(1);
    pub const INCOMPLETE: Status = Status(2);
    pub const UNEXPECTED_NULL: Status = Status(3);
    pub const BAD_DATA: Status = Status(4);
    pub const OP_FAILED: Status = Status(5);
    pub const BAD_STATE: Status = Status(6);
    pub const UNMAPPABLE: Status = Status(7);
    pub const OUTPUT_INSUFFICIENT_SIZE: Status = Status(8);
    pub const UNAVAILABLE_DEVICE: Status = Status(9);

    /// Convert a raw code into `Ok(())` for success, `Err(status)` otherwise.
    pub fn check(code: i32) -> Result<(), Status> {
        if code == Self::NO_ERROR.0 {
            Ok(())
        } else {
            Err(Status(code))
        }
    }

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::NO_ERROR
    }

    /// Symbolic name of the code, or "UNKNOWN".
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "NO_ERROR",
            1 => "OUT_OF_MEMORY",
            2 => "INCOMPLETE",
            3 => "UNEXPECTED_NULL",
            4 => "BAD_DATA",
            5 => "OP_FAILED",
            6 => "BAD_STATE",
            7 => "UNMAPPABLE",
            8 => "OUTPUT_INSUFFICIENT_SIZE",
            9 => "UNAVAILABLE_DEVICE",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Primitive operations of an accelerator runtime.
///
/// The associated handle types are opaque to the executor. Release functions
/// take the handle by value; [`ScopedHandle`] guarantees each one is called
/// exactly once.
///
/// Implementations are not required to be thread-safe beyond what their
/// handle types allow. The executor drives one execution at a time.
pub trait NeuralNetworksRuntime {
    /// Built network description.
    type Model;
    /// Model compiled for a device.
    type Compilation;
    /// Runtime wrapper around shared memory such as mapped weights.
    type Memory;
    /// One pending inference request.
    type Execution;
    /// Completion token of a started compute.
    type Event;

    /// Short identifier for log lines (e.g. "nnapi", "mock").
    fn name(&self) -> &str;

    /// Create an execution context for `compilation`.
    fn execution_create(&self, compilation: &Self::Compilation) -> Result<Self::Execution, Status>;

    /// Bind input `index` to `length` bytes at `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must stay valid for reads of `length` bytes and unmodified
    /// until the execution's compute completes or the execution is freed.
    unsafe fn execution_set_input(
        &self,
        execution: &mut Self::Execution,
        index: u32,
        buffer: *const c_void,
        length: usize,
    ) -> Result<(), Status>;

    /// Bind output `index` to `length` bytes at `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must stay valid for writes of `length` bytes until the
    /// execution's compute completes or the execution is freed.
    unsafe fn execution_set_output(
        &self,
        execution: &mut Self::Execution,
        index: u32,
        buffer: *mut c_void,
        length: usize,
    ) -> Result<(), Status>;

    /// Start computing asynchronously and return the completion token.
    fn execution_start_compute(&self, execution: &mut Self::Execution) -> Result<Self::Event, Status>;

    /// Block until the compute behind `event` finishes.
    fn event_wait(&self, event: &Self::Event) -> Result<(), Status>;

    fn event_free(&self, event: Self::Event);

    fn execution_free(&self, execution: Self::Execution);

    fn model_free(&self, model: Self::Model);

    fn compilation_free(&self, compilation: Self::Compilation);

    fn memory_free(&self, memory: Self::Memory);
}
