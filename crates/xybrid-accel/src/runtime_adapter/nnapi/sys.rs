//! FFI declarations for the Android Neural Networks API.
//!
//! Only the execution, event and release entry points are declared. Model
//! building and compilation happen upstream and hand their handles over.

use std::os::raw::{c_int, c_void};

// =============================================================================
// Opaque Types
// =============================================================================

#[repr(C)]
pub struct ANeuralNetworksModel {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ANeuralNetworksCompilation {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ANeuralNetworksMemory {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ANeuralNetworksExecution {
    _private: [u8; 0],
}

#[repr(C)]
pub struct ANeuralNetworksEvent {
    _private: [u8; 0],
}

/// Operand type override passed to setInput/setOutput. Always null here: the
/// operand types recorded at model build time are used.
#[repr(C)]
pub struct ANeuralNetworksOperandType {
    _private: [u8; 0],
}

// =============================================================================
// FFI Declarations
// =============================================================================

#[link(name = "neuralnetworks")]
extern "C" {
    pub fn ANeuralNetworksExecution_create(
        compilation: *mut ANeuralNetworksCompilation,
        execution: *mut *mut ANeuralNetworksExecution,
    ) -> c_int;
    pub fn ANeuralNetworksExecution_free(execution: *mut ANeuralNetworksExecution);

    pub fn ANeuralNetworksExecution_setInput(
        execution: *mut ANeuralNetworksExecution,
        index: i32,
        operand_type: *const ANeuralNetworksOperandType,
        buffer: *const c_void,
        length: usize,
    ) -> c_int;
    pub fn ANeuralNetworksExecution_setOutput(
        execution: *mut ANeuralNetworksExecution,
        index: i32,
        operand_type: *const ANeuralNetworksOperandType,
        buffer: *mut c_void,
        length: usize,
    ) -> c_int;

    pub fn ANeuralNetworksExecution_startCompute(
        execution: *mut ANeuralNetworksExecution,
        event: *mut *mut ANeuralNetworksEvent,
    ) -> c_int;
    pub fn ANeuralNetworksEvent_wait(event: *mut ANeuralNetworksEvent) -> c_int;
    pub fn ANeuralNetworksEvent_free(event: *mut ANeuralNetworksEvent);

    pub fn ANeuralNetworksModel_free(model: *mut ANeuralNetworksModel);
    pub fn ANeuralNetworksCompilation_free(compilation: *mut ANeuralNetworksCompilation);
    pub fn ANeuralNetworksMemory_free(memory: *mut ANeuralNetworksMemory);
}
