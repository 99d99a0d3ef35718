//! Tape-style autograd primitives
//!
//! Losses in this crate compute their forward value eagerly and register a
//! [`BackwardOp`] that scatters the analytically derived gradient into the
//! prediction tensor's gradient cell. Model collaborators chain their own
//! backward ops from that cell; the trainer only ever triggers the chain.

mod tensor;

pub use tensor::{Tensor, TensorState};

/// A deferred gradient computation attached to a tensor.
pub trait BackwardOp {
    /// Propagate gradients to the inputs of the op.
    fn backward(&self);
}

/// Perform a backward pass from `tensor`.
///
/// For a scalar loss the seed gradient is implicit (ones); pass
/// `grad_output` to seed a non-scalar starting point.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::ArrayD<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        tensor.set_grad(ndarray::ArrayD::ones(tensor.shape().to_vec()));
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
