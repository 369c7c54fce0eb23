//! Activation catalogue for dense stacks.
//!
//! Activations are shape-preserving and operate element-wise on tensors of any
//! rank. The default non-linearity of a [`DenseStack`](crate::dense::DenseStack)
//! is a leaky rectifier, `x` for positive inputs and `slope * x` otherwise,
//! backed by [`candle_nn::ops::leaky_relu`] so gradients flow through both
//! branches. Callers can inject any other implementation of [`Activation`]
//! (for instance to observe how often the non-linearity is applied).

use std::sync::Arc;

use candle_core::{Result, Tensor};

/// Identifies which non-linearity is implemented by an [`Activation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationKind {
    /// Leaky rectifier with the given slope for negative inputs.
    LeakyRelu { negative_slope: f64 },
    /// Implementation supplied by the caller.
    Custom,
}

/// Common interface shared by dense-stack activation functions.
pub trait Activation: Send + Sync {
    /// Returns the [`ActivationKind`] for introspection when wiring composite blocks.
    fn kind(&self) -> ActivationKind;

    /// Applies the activation to `input`.
    fn forward(&self, input: &Tensor) -> Result<Tensor>;
}

struct LeakyRelu {
    negative_slope: f64,
}

impl Activation for LeakyRelu {
    fn kind(&self) -> ActivationKind {
        ActivationKind::LeakyRelu {
            negative_slope: self.negative_slope,
        }
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        candle_nn::ops::leaky_relu(input, self.negative_slope)
    }
}

/// Shared leaky rectifier with the given negative slope.
pub fn leaky_relu(negative_slope: f64) -> Arc<dyn Activation> {
    Arc::new(LeakyRelu { negative_slope })
}
