//! Prediction entry points.
//!
//! Every call shape reduces to one raw pointer per declared input, in
//! registration order, handed to `predict_raw`. Sizes are checked up front
//! wherever the caller supplied a length, so a mismatch never reaches the
//! runtime.
//!
//! | Call shape                 | Entry point          | Checked                |
//! |----------------------------|----------------------|------------------------|
//! | one slice                  | [`predict`]          | one input, its size    |
//! | one slice per input        | [`predict_many`]     | input count, each size |
//! | one raw pointer            | [`predict_ptr`]      | one input, non-null    |
//! | one raw pointer per input  | [`predict_ptrs`]     | input count, non-null  |
//!
//! Outputs are bound beforehand with the `set_output_buffer*` family, or
//! together with the inputs through [`predict_into`].
//!
//! [`predict`]: ModelExecutor::predict
//! [`predict_many`]: ModelExecutor::predict_many
//! [`predict_ptr`]: ModelExecutor::predict_ptr
//! [`predict_ptrs`]: ModelExecutor::predict_ptrs
//! [`predict_into`]: ModelExecutor::predict_into

use super::{BindingKind, ModelExecutor, TensorElement};
use crate::error::{AccelError, AccelResult};
use crate::runtime_adapter::NeuralNetworksRuntime;
use std::ffi::c_void;

impl<R: NeuralNetworksRuntime> ModelExecutor<R> {
    /// Run a prediction on a model with exactly one input.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` unless exactly one input is registered
    /// - `SizeMismatch` if `input.len()` differs from that input's size
    /// - anything [`compute_and_wait`](Self::compute_and_wait) returns
    pub fn predict<T: TensorElement>(&mut self, input: &[T]) -> AccelResult<()> {
        self.expect_single_input()?;
        self.check_len(BindingKind::Input, 0, input.len(), true)?;
        let ptr = input.as_ptr().cast::<c_void>();
        // SAFETY: `input` outlives this call, and the context holding the
        // binding is consumed or discarded before returning.
        unsafe { self.predict_raw(&[ptr], T::SIZE) }
    }

    /// Run a prediction with one slice per registered input, by position.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `inputs.len()` differs from the input count
    /// - `SizeMismatch` for the first slice whose length is wrong
    pub fn predict_many<T, B>(&mut self, inputs: &[B]) -> AccelResult<()>
    where
        T: TensorElement,
        B: AsRef<[T]>,
    {
        self.expect_input_count(inputs.len())?;
        for (index, input) in inputs.iter().enumerate() {
            self.check_len(BindingKind::Input, index, input.as_ref().len(), true)?;
        }
        let ptrs: Vec<*const c_void> = inputs
            .iter()
            .map(|input| input.as_ref().as_ptr().cast::<c_void>())
            .collect();
        // SAFETY: see `predict`.
        unsafe { self.predict_raw(&ptrs, T::SIZE) }
    }

    /// Run a prediction from a raw pointer on a single-input model.
    ///
    /// # Safety
    ///
    /// `input` must point to at least `get_size(input_names()[0])` readable
    /// elements for the duration of the call.
    pub unsafe fn predict_ptr<T: TensorElement>(&mut self, input: *const T) -> AccelResult<()> {
        self.expect_single_input()?;
        self.predict_ptrs(&[input])
    }

    /// Run a prediction from one raw pointer per registered input.
    ///
    /// # Safety
    ///
    /// Each pointer must cover the registered size of its input for the
    /// duration of the call.
    pub unsafe fn predict_ptrs<T: TensorElement>(&mut self, inputs: &[*const T]) -> AccelResult<()> {
        self.expect_input_count(inputs.len())?;
        if let Some(index) = inputs.iter().position(|p| p.is_null()) {
            return Err(AccelError::invalid_argument(format!(
                "null pointer for input {} '{}'",
                index, self.input_names[index]
            )));
        }
        let ptrs: Vec<*const c_void> = inputs.iter().map(|p| p.cast::<c_void>()).collect();
        self.predict_raw(&ptrs, T::SIZE)
    }

    /// Bind `outputs` and `inputs` by position, compute, and return.
    ///
    /// Needs no prior `unsafe` output binding: every buffer is borrowed for
    /// the whole call. Output slices must match the registered
    /// sizes exactly unless `validate_outputs` is off, in which case longer
    /// slices are accepted.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either count differs from what is registered
    /// - `SizeMismatch` for the first slice of the wrong length
    /// - `Backend` from binding or compute
    pub fn predict_into<T: TensorElement>(
        &mut self,
        inputs: &[&[T]],
        outputs: &mut [&mut [T]],
    ) -> AccelResult<()> {
        self.expect_input_count(inputs.len())?;
        if outputs.len() != self.output_names.len() {
            return Err(AccelError::invalid_argument(format!(
                "expected {} output buffers, got {}",
                self.output_names.len(),
                outputs.len()
            )));
        }
        for (index, input) in inputs.iter().enumerate() {
            self.check_len(BindingKind::Input, index, input.len(), true)?;
        }
        let exact = self.config.validate_outputs;
        for (index, output) in outputs.iter().enumerate() {
            self.check_len(BindingKind::Output, index, output.len(), exact)?;
        }

        // SAFETY: `outputs` is exclusively borrowed for this call and the
        // context is consumed or discarded before returning.
        let bound = outputs.iter_mut().enumerate().try_for_each(|(index, output)| unsafe {
            self.bind(BindingKind::Output, index, output.as_mut_ptr().cast(), T::SIZE)
        });
        if let Err(e) = bound {
            self.reset_execution();
            return Err(e);
        }

        let ptrs: Vec<*const c_void> = inputs.iter().map(|input| input.as_ptr().cast::<c_void>()).collect();
        // SAFETY: see above.
        unsafe { self.predict_raw(&ptrs, T::SIZE) }
    }

    /// Bind every input position, then compute.
    ///
    /// If a binding fails the pending context is discarded, so no pointer
    /// from this call outlives it.
    unsafe fn predict_raw(&mut self, inputs: &[*const c_void], element_size: usize) -> AccelResult<()> {
        for (index, &ptr) in inputs.iter().enumerate() {
            if let Err(e) = self.bind(BindingKind::Input, index, ptr.cast_mut(), element_size) {
                self.reset_execution();
                return Err(e);
            }
        }
        self.compute_and_wait()
    }

    fn expect_single_input(&self) -> AccelResult<()> {
        match self.input_names.len() {
            1 => Ok(()),
            n => Err(AccelError::invalid_argument(format!(
                "single-buffer prediction needs exactly one input, {} registered",
                n
            ))),
        }
    }

    fn expect_input_count(&self, supplied: usize) -> AccelResult<()> {
        if supplied == self.input_names.len() {
            Ok(())
        } else {
            Err(AccelError::invalid_argument(format!(
                "expected {} input buffers, got {}",
                self.input_names.len(),
                supplied
            )))
        }
    }

    /// Compare a slice length with the registered size at `index`.
    ///
    /// With `exact` off, longer slices pass.
    fn check_len(&self, kind: BindingKind, index: usize, actual: usize, exact: bool) -> AccelResult<()> {
        let names = self.names(kind);
        let name = names.get(index).ok_or(AccelError::IndexOutOfRange {
            kind,
            index,
            len: names.len(),
        })?;
        let expected = self.shaper.get_size(name)?;
        if actual == expected || (!exact && actual > expected) {
            Ok(())
        } else {
            Err(AccelError::SizeMismatch {
                tensor: name.clone(),
                expected,
                actual,
            })
        }
    }
}
