//! Buffer binding and synchronous compute.

use super::{BindingKind, ModelExecutor, TensorElement};
use crate::error::{AccelError, AccelResult};
use crate::runtime_adapter::{NeuralNetworksRuntime, ScopedHandle};
use std::ffi::c_void;
use std::sync::Arc;
use std::time::Instant;

use super::context::ExecutionContext;

impl<R: NeuralNetworksRuntime> ModelExecutor<R> {
    /// Bind a 32-bit float buffer to input `index`.
    ///
    /// # Safety
    ///
    /// `buffer` must point to at least `get_size(input_names()[index])`
    /// floats that stay valid and unmodified until the next compute returns
    /// or the pending execution is reset.
    pub unsafe fn set_input_buffer_f32(&mut self, index: usize, buffer: *const f32) -> AccelResult<()> {
        self.set_input_buffer(index, buffer.cast(), f32::SIZE)
    }

    /// Bind a quantized 8-bit buffer to input `index`.
    ///
    /// # Safety
    ///
    /// Same contract as [`set_input_buffer_f32`](Self::set_input_buffer_f32).
    pub unsafe fn set_input_buffer_u8(&mut self, index: usize, buffer: *const u8) -> AccelResult<()> {
        self.set_input_buffer(index, buffer.cast(), u8::SIZE)
    }

    /// Bind a buffer of `element_size`-byte elements to input `index`.
    ///
    /// The byte length handed to the runtime is the registered element count
    /// of that input times `element_size`. Creates an execution context first
    /// if none is pending.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfRange` if `index` is not a registered input position
    /// - `InvalidArgument` for a null buffer or zero element size
    /// - `InvalidState` if no compiled graph is attached
    /// - `Backend` if the runtime rejects the binding
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for reads of the computed byte length until the
    /// next compute returns or the pending execution is reset.
    pub unsafe fn set_input_buffer(
        &mut self,
        index: usize,
        buffer: *const c_void,
        element_size: usize,
    ) -> AccelResult<()> {
        self.bind(BindingKind::Input, index, buffer.cast_mut(), element_size)
    }

    /// Bind a 32-bit float buffer to output `index`.
    ///
    /// # Safety
    ///
    /// `buffer` must point to at least `get_size(output_names()[index])`
    /// writable floats that stay valid until the next compute returns or the
    /// pending execution is reset.
    pub unsafe fn set_output_buffer_f32(&mut self, index: usize, buffer: *mut f32) -> AccelResult<()> {
        self.set_output_buffer(index, buffer.cast(), f32::SIZE)
    }

    /// Bind a quantized 8-bit buffer to output `index`.
    ///
    /// # Safety
    ///
    /// Same contract as [`set_output_buffer_f32`](Self::set_output_buffer_f32).
    pub unsafe fn set_output_buffer_u8(&mut self, index: usize, buffer: *mut u8) -> AccelResult<()> {
        self.set_output_buffer(index, buffer.cast(), u8::SIZE)
    }

    /// Bind a buffer of `element_size`-byte elements to output `index`.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of the computed byte length until the
    /// next compute returns or the pending execution is reset.
    pub unsafe fn set_output_buffer(
        &mut self,
        index: usize,
        buffer: *mut c_void,
        element_size: usize,
    ) -> AccelResult<()> {
        self.bind(BindingKind::Output, index, buffer, element_size)
    }

    pub(super) unsafe fn bind(
        &mut self,
        kind: BindingKind,
        index: usize,
        buffer: *mut c_void,
        element_size: usize,
    ) -> AccelResult<()> {
        let names = self.names(kind);
        let name = names.get(index).ok_or(AccelError::IndexOutOfRange {
            kind,
            index,
            len: names.len(),
        })?;
        if buffer.is_null() {
            return Err(AccelError::invalid_argument(format!(
                "null buffer for {} '{}'",
                kind, name
            )));
        }
        if element_size == 0 {
            return Err(AccelError::invalid_argument(format!(
                "zero element size for {} '{}'",
                kind, name
            )));
        }

        let elements = self.shaper.get_size(name)?;
        let length = elements.checked_mul(element_size).ok_or_else(|| {
            AccelError::invalid_argument(format!(
                "byte length of {} '{}' overflows ({} x {})",
                kind, name, elements, element_size
            ))
        })?;
        let position = u32::try_from(index).map_err(|_| {
            AccelError::invalid_argument(format!("{} position {} does not fit u32", kind, index))
        })?;
        let name = name.clone();

        let runtime = Arc::clone(&self.runtime);
        let context = self.ensure_prepared()?;
        match kind {
            BindingKind::Input => runtime
                .execution_set_input(context.raw_mut(), position, buffer.cast_const(), length)
                .map_err(|status| AccelError::backend("execution_set_input", status))?,
            BindingKind::Output => runtime
                .execution_set_output(context.raw_mut(), position, buffer, length)
                .map_err(|status| AccelError::backend("execution_set_output", status))?,
        }
        context.mark_bound(kind, index);

        log::trace!(
            target: "xybrid_accel",
            "[{}] Bound {} {} '{}' ({} bytes)",
            self.config.label,
            kind,
            index,
            name,
            length
        );
        Ok(())
    }

    /// Run the pending execution to completion.
    ///
    /// Starts the compute, blocks on its completion event, then frees the
    /// event and the execution context whether or not the compute succeeded.
    /// Afterwards the phase is always [`Absent`](super::ExecutionPhase::Absent).
    ///
    /// Unbound positions are not checked here; the runtime reports them.
    pub fn compute_and_wait(&mut self) -> AccelResult<()> {
        let mut context = match self.context.take() {
            Some(context) => context,
            None => self.create_context()?,
        };

        let unbound_inputs = context.unbound(BindingKind::Input);
        let unbound_outputs = context.unbound(BindingKind::Output);
        if !unbound_inputs.is_empty() || !unbound_outputs.is_empty() {
            log::debug!(
                target: "xybrid_accel",
                "[{}] Computing with unbound inputs {:?} and outputs {:?}",
                self.config.label,
                unbound_inputs,
                unbound_outputs
            );
        }

        let started = Instant::now();
        let result = Self::run_context(&self.runtime, &mut context);
        drop(context);

        match result {
            Ok(()) => {
                let elapsed = started.elapsed();
                self.stats.predictions_completed += 1;
                self.stats.last_compute = Some(elapsed);
                log::debug!(
                    target: "xybrid_accel",
                    "[{}] Compute finished in {:?}",
                    self.config.label,
                    elapsed
                );
                Ok(())
            }
            Err(e) => {
                self.stats.predictions_failed += 1;
                log::warn!(
                    target: "xybrid_accel",
                    "[{}] Compute failed: {}",
                    self.config.label,
                    e
                );
                Err(e)
            }
        }
    }

    /// Start the compute and wait on it; the event is freed before returning.
    fn run_context(runtime: &Arc<R>, context: &mut ExecutionContext<R>) -> AccelResult<()> {
        let event = runtime
            .execution_start_compute(context.raw_mut())
            .map_err(|status| AccelError::backend("execution_start_compute", status))?;
        let event = ScopedHandle::new(runtime, event, R::event_free);
        runtime
            .event_wait(event.get())
            .map_err(|status| AccelError::backend("event_wait", status))
    }
}
