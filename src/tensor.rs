mod dense_matrix;

pub use dense_matrix::{Activation, DenseMatrix};

use std::{cell::RefCell, rc::Rc};

use crate::shape::Shape;

/// Weights are shared between every graph that uses the layer owning them.
pub type SharedTensor = Rc<RefCell<Tensor>>;

#[derive(Debug)]
pub struct Tensor {
    pub values: DenseMatrix,
    pub gradients: Option<DenseMatrix>,
}

impl Tensor {
    pub fn new(shape: Shape, requires_grad: bool) -> Self {
        Self { values: DenseMatrix::zeroed(shape), gradients: requires_grad.then(|| DenseMatrix::zeroed(shape)) }
    }

    pub fn from_values(values: DenseMatrix, requires_grad: bool) -> Self {
        let gradients = requires_grad.then(|| DenseMatrix::zeroed(values.shape()));
        Self { values, gradients }
    }

    pub fn shared(self) -> SharedTensor {
        Rc::new(RefCell::new(self))
    }

    pub fn shape(&self) -> Shape {
        self.values.shape()
    }

    pub fn zero_grad(&mut self) {
        if let Some(grad) = self.gradients.as_mut() {
            grad.set_zero();
        }
    }

    pub fn set_grad_to_unit(&mut self) {
        let grad = self.gradients.get_or_insert_with(DenseMatrix::default);
        grad.load_from_slice(Shape::new(1, 1), &[1.0]);
    }

    pub fn get_scalar(&self) -> Option<f32> {
        if self.values.shape() == Shape::new(1, 1) {
            Some(self.values.values()[0])
        } else {
            None
        }
    }
}
