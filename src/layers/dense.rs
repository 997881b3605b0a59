use std::{cell::OnceCell, rc::Rc};

use log::debug;
use rand::Rng;

use crate::{
    constraint::Constraint,
    error::{Error, Result},
    regularizer::Regularizer,
    rng::Initializer,
    shape::Shape,
    tensor::{Activation, DenseMatrix, SharedTensor, Tensor},
};

#[derive(Debug)]
pub struct DenseParams {
    pub kernel: SharedTensor,
    pub bias: SharedTensor,
    pub input_size: usize,
}

/// Fully connected layer, `activation(kernel * x + bias)`.
///
/// Parameters are created the first time the layer is applied, which is
/// also when its input size is fixed.
#[derive(Debug)]
pub struct Dense {
    name: String,
    units: usize,
    activation: Activation,
    kernel_initializer: Initializer,
    bias_initializer: Initializer,
    kernel_constraint: Option<Rc<dyn Constraint>>,
    bias_constraint: Option<Rc<dyn Constraint>>,
    kernel_regularizer: Option<Rc<dyn Regularizer>>,
    activity_regularizer: Option<Rc<dyn Regularizer>>,
    params: OnceCell<DenseParams>,
}

impl Dense {
    pub fn new(units: usize) -> Self {
        Self {
            name: "dense".to_string(),
            units,
            activation: Activation::Linear,
            kernel_initializer: Initializer::GlorotUniform,
            bias_initializer: Initializer::Zeros,
            kernel_constraint: None,
            bias_constraint: None,
            kernel_regularizer: None,
            activity_regularizer: None,
            params: OnceCell::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_kernel_initializer(mut self, init: Initializer) -> Self {
        self.kernel_initializer = init;
        self
    }

    pub fn with_bias_initializer(mut self, init: Initializer) -> Self {
        self.bias_initializer = init;
        self
    }

    pub fn with_kernel_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.kernel_constraint = Some(Rc::new(constraint));
        self
    }

    pub fn with_bias_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.bias_constraint = Some(Rc::new(constraint));
        self
    }

    pub fn with_kernel_regularizer(mut self, regularizer: impl Regularizer + 'static) -> Self {
        self.kernel_regularizer = Some(Rc::new(regularizer));
        self
    }

    pub fn with_activity_regularizer(mut self, regularizer: impl Regularizer + 'static) -> Self {
        self.activity_regularizer = Some(Rc::new(regularizer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn kernel_id(&self) -> String {
        format!("{}/kernel", self.name)
    }

    pub fn bias_id(&self) -> String {
        format!("{}/bias", self.name)
    }

    pub fn kernel_constraint(&self) -> Option<&Rc<dyn Constraint>> {
        self.kernel_constraint.as_ref()
    }

    pub fn bias_constraint(&self) -> Option<&Rc<dyn Constraint>> {
        self.bias_constraint.as_ref()
    }

    pub fn kernel_regularizer(&self) -> Option<&Rc<dyn Regularizer>> {
        self.kernel_regularizer.as_ref()
    }

    pub fn activity_regularizer(&self) -> Option<&Rc<dyn Regularizer>> {
        self.activity_regularizer.as_ref()
    }

    pub fn params(&self) -> Option<&DenseParams> {
        self.params.get()
    }

    pub fn num_params(&self) -> usize {
        self.params.get().map_or(0, |p| (p.input_size + 1) * self.units)
    }

    /// Creates the parameters on first use. Later calls must agree on
    /// the input size.
    pub fn build(&self, input_size: usize, rng: &mut impl Rng) -> Result<&DenseParams> {
        if let Some(params) = self.params.get() {
            if params.input_size != input_size {
                return Err(Error::LayerInputMismatch {
                    layer: self.name.clone(),
                    expected: params.input_size,
                    got: input_size,
                });
            }

            return Ok(params);
        }

        if self.units == 0 || input_size == 0 {
            return Err(Error::InvalidConfig(format!("layer `{}` cannot have a zero-sized dimension", self.name)));
        }

        let mut kernel = DenseMatrix::zeroed(Shape::new(self.units, input_size));
        self.kernel_initializer.fill(kernel.values_mut(), input_size, self.units, rng)?;

        let mut bias = DenseMatrix::zeroed(Shape::new(self.units, 1));
        self.bias_initializer.fill(bias.values_mut(), input_size, self.units, rng)?;

        debug!("built `{}`: {input_size} -> {} ({})", self.name, self.units, self.activation);

        let params = DenseParams {
            kernel: Tensor::from_values(kernel, true).shared(),
            bias: Tensor::from_values(bias, true).shared(),
            input_size,
        };

        Ok(self.params.get_or_init(|| params))
    }
}
