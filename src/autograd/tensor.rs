//! Tensor type with gradient tracking

use super::BackwardOp;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Immutable value snapshot of a tensor's data
///
/// Snapshots are plain values: taking one never aliases the live tensor,
/// and restoring one overwrites wholesale. Model, optimizer, and scheduler
/// states are built from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorState {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorState {
    pub fn from_array(arr: &ArrayD<f32>) -> Self {
        Self {
            shape: arr.shape().to_vec(),
            data: arr.iter().copied().collect(),
        }
    }

    pub fn to_array(&self) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone())
            .expect("snapshot shape and data length agree by construction")
    }
}

/// Dynamic-shape tensor with automatic differentiation support
///
/// Cloning a `Tensor` shares the gradient cell, so a clone buffered for
/// epoch-level metrics still receives gradients written during backward.
#[derive(Clone)]
pub struct Tensor {
    data: ArrayD<f32>,
    grad: Rc<RefCell<Option<ArrayD<f32>>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a new tensor with data
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a tensor from a flat vector and shape
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the product of `shape`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Self {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data)
            .expect("data length must match the product of the shape");
        Self::new(arr, requires_grad)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    /// Create a single-element scalar tensor
    pub fn scalar(value: f32, requires_grad: bool) -> Self {
        Self::from_shape_vec(&[1], vec![value], requires_grad)
    }

    /// Get reference to data
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.data
    }

    /// Scalar value of a rank-0 or single-element tensor
    ///
    /// # Panics
    ///
    /// Panics if the tensor holds more than one element.
    pub fn item(&self) -> f32 {
        assert_eq!(self.data.len(), 1, "item() requires a single-element tensor");
        *self.data.iter().next().expect("non-empty by the assert above")
    }

    /// Get gradient (if computed)
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.grad.borrow().clone()
    }

    /// Set gradient
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Accumulate gradient (for when a tensor is used multiple times)
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    /// Zero out gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Check if requires gradient
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Get reference to the gradient cell (for backward operations)
    pub fn grad_cell(&self) -> Rc<RefCell<Option<ArrayD<f32>>>> {
        self.grad.clone()
    }

    /// Set backward operation
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Get backward operation
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Take an immutable value snapshot of the data
    pub fn to_state(&self) -> TensorState {
        TensorState::from_array(&self.data)
    }

    /// Rebuild a tensor from a snapshot
    pub fn from_state(state: &TensorState, requires_grad: bool) -> Self {
        Self::new(state.to_array(), requires_grad)
    }

    /// Overwrite this tensor's data from a snapshot
    pub fn load_state(&mut self, state: &TensorState) {
        self.data = state.to_array();
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.data.shape())
            .field("grad", &self.grad.borrow().as_ref().map(|g| g.shape().to_vec()))
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shape_vec() {
        let t = Tensor::from_shape_vec(&[2, 2, 2], vec![0.0; 8], false);
        assert_eq!(t.shape(), &[2, 2, 2]);
        assert_eq!(t.len(), 8);
    }

    #[test]
    fn test_scalar_item() {
        let t = Tensor::scalar(0.5, false);
        assert_eq!(t.item(), 0.5);
    }

    #[test]
    fn test_accumulate_grad() {
        let t = Tensor::zeros(&[3], true);
        t.accumulate_grad(ndarray::ArrayD::ones(ndarray::IxDyn(&[3])));
        t.accumulate_grad(ndarray::ArrayD::ones(ndarray::IxDyn(&[3])));
        let g = t.grad().unwrap();
        assert!(g.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_clone_shares_grad_cell() {
        let t = Tensor::zeros(&[2], true);
        let c = t.clone();
        t.set_grad(ndarray::ArrayD::ones(ndarray::IxDyn(&[2])));
        assert!(c.grad().is_some());
        c.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    #[should_panic(expected = "single-element")]
    fn test_item_multi_element_panics() {
        Tensor::zeros(&[2], false).item();
    }

    #[test]
    fn test_state_round_trip() {
        let t = Tensor::from_shape_vec(&[2, 3], (0..6).map(|i| i as f32).collect(), true);
        let state = t.to_state();
        let restored = Tensor::from_state(&state, true);
        assert_eq!(restored.shape(), t.shape());
        assert_eq!(restored.data(), t.data());
    }

    #[test]
    fn test_load_state_overwrites_data() {
        let mut t = Tensor::zeros(&[2], false);
        let other = Tensor::from_shape_vec(&[2], vec![3.0, 4.0], false);
        t.load_state(&other.to_state());
        assert_eq!(t.data(), other.data());
    }
}
