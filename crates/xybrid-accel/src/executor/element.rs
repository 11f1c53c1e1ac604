//! Element encodings accepted by buffer binding and prediction.

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for u8 {}
}

/// A fixed-width tensor element type.
///
/// Implemented for `f32` (32-bit float tensors) and `u8` (asymmetric 8-bit
/// quantized tensors). Other widths go through the explicit element-size
/// binding functions.
pub trait TensorElement: sealed::Sealed + Copy + 'static {
    /// Width of one element in bytes.
    const SIZE: usize;
}

impl TensorElement for f32 {
    const SIZE: usize = 4;
}

impl TensorElement for u8 {
    const SIZE: usize = 1;
}
