//! NnapiRuntime - execution on the Android Neural Networks API.
//!
//! Feature-gated behind `nnapi`; links against `libneuralnetworks.so`.
//!
//! ```text
//! ModelExecutor
//!     │
//!     └── NnapiRuntime (NeuralNetworksRuntime)
//!             │
//!             └── sys (FFI declarations)
//!                     │
//!                     └── libneuralnetworks.so
//! ```
//!
//! Model building and compilation are done upstream. Their raw pointers are
//! adopted with the `from_raw` constructors and then owned by a
//! [`CompiledGraph`](super::CompiledGraph).

pub mod sys;

use super::{NeuralNetworksRuntime, Status};
use std::ffi::c_void;
use std::ptr::{self, NonNull};

macro_rules! nnapi_handle {
    ($(#[$doc:meta])* $name:ident, $raw:ty) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name(NonNull<$raw>);

        impl $name {
            /// Adopt a raw pointer. Returns `None` for null.
            ///
            /// # Safety
            ///
            /// `ptr` must be a live handle of the matching NNAPI type that
            /// nothing else will free.
            pub unsafe fn from_raw(ptr: *mut $raw) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            pub fn as_ptr(&self) -> *mut $raw {
                self.0.as_ptr()
            }
        }
    };
}

nnapi_handle!(
    /// `ANeuralNetworksModel*`
    NnapiModel,
    sys::ANeuralNetworksModel
);
nnapi_handle!(
    /// `ANeuralNetworksCompilation*`
    NnapiCompilation,
    sys::ANeuralNetworksCompilation
);
nnapi_handle!(
    /// `ANeuralNetworksMemory*`
    NnapiMemory,
    sys::ANeuralNetworksMemory
);
nnapi_handle!(
    /// `ANeuralNetworksExecution*`
    NnapiExecution,
    sys::ANeuralNetworksExecution
);
nnapi_handle!(
    /// `ANeuralNetworksEvent*`
    NnapiEvent,
    sys::ANeuralNetworksEvent
);

/// The Android Neural Networks API as a [`NeuralNetworksRuntime`].
///
/// Stateless; every call goes straight to the system library.
#[derive(Debug, Default, Clone, Copy)]
pub struct NnapiRuntime;

impl NnapiRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl NeuralNetworksRuntime for NnapiRuntime {
    type Model = NnapiModel;
    type Compilation = NnapiCompilation;
    type Memory = NnapiMemory;
    type Execution = NnapiExecution;
    type Event = NnapiEvent;

    fn name(&self) -> &str {
        "nnapi"
    }

    fn execution_create(&self, compilation: &NnapiCompilation) -> Result<NnapiExecution, Status> {
        let mut execution = ptr::null_mut();
        Status::check(unsafe {
            sys::ANeuralNetworksExecution_create(compilation.as_ptr(), &mut execution)
        })?;
        NonNull::new(execution)
            .map(NnapiExecution)
            .ok_or(Status::UNEXPECTED_NULL)
    }

    unsafe fn execution_set_input(
        &self,
        execution: &mut NnapiExecution,
        index: u32,
        buffer: *const c_void,
        length: usize,
    ) -> Result<(), Status> {
        let index = i32::try_from(index).map_err(|_| Status::BAD_DATA)?;
        Status::check(sys::ANeuralNetworksExecution_setInput(
            execution.as_ptr(),
            index,
            ptr::null(),
            buffer,
            length,
        ))
    }

    unsafe fn execution_set_output(
        &self,
        execution: &mut NnapiExecution,
        index: u32,
        buffer: *mut c_void,
        length: usize,
    ) -> Result<(), Status> {
        let index = i32::try_from(index).map_err(|_| Status::BAD_DATA)?;
        Status::check(sys::ANeuralNetworksExecution_setOutput(
            execution.as_ptr(),
            index,
            ptr::null(),
            buffer,
            length,
        ))
    }

    fn execution_start_compute(&self, execution: &mut NnapiExecution) -> Result<NnapiEvent, Status> {
        let mut event = ptr::null_mut();
        Status::check(unsafe {
            sys::ANeuralNetworksExecution_startCompute(execution.as_ptr(), &mut event)
        })?;
        NonNull::new(event).map(NnapiEvent).ok_or(Status::UNEXPECTED_NULL)
    }

    fn event_wait(&self, event: &NnapiEvent) -> Result<(), Status> {
        Status::check(unsafe { sys::ANeuralNetworksEvent_wait(event.as_ptr()) })
    }

    fn event_free(&self, event: NnapiEvent) {
        unsafe { sys::ANeuralNetworksEvent_free(event.as_ptr()) }
    }

    fn execution_free(&self, execution: NnapiExecution) {
        unsafe { sys::ANeuralNetworksExecution_free(execution.as_ptr()) }
    }

    fn model_free(&self, model: NnapiModel) {
        unsafe { sys::ANeuralNetworksModel_free(model.as_ptr()) }
    }

    fn compilation_free(&self, compilation: NnapiCompilation) {
        unsafe { sys::ANeuralNetworksCompilation_free(compilation.as_ptr()) }
    }

    fn memory_free(&self, memory: NnapiMemory) {
        unsafe { sys::ANeuralNetworksMemory_free(memory.as_ptr()) }
    }
}
