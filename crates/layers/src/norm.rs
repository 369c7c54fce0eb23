//! Layer normalisation over the trailing feature axis.
//!
//! Inputs follow the `(batch, set, embed)` convention, though any rank works
//! as long as the last dimension equals the configured size. Statistics are
//! computed with plain tensor ops (sum, square, sqrt, broadcast) so gradients
//! flow to the input and to the affine parameters. The scale starts at one
//! and the shift at zero.

use candle_core::{Result, Tensor, D};
use candle_nn::{Init, Module, VarBuilder};

/// Default numeric stabiliser, matching common transformer recipes.
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// LayerNorm with learnable scale and shift.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    hidden_size: usize,
    epsilon: f64,
    weight: Tensor,
    bias: Tensor,
}

impl LayerNorm {
    /// Registers `weight` and `bias` under `vb` and builds the layer.
    pub fn new(hidden_size: usize, epsilon: f64, vb: VarBuilder) -> Result<Self> {
        let weight = vb.get_with_hints(hidden_size, "weight", Init::Const(1.0))?;
        let bias = vb.get_with_hints(hidden_size, "bias", Init::Const(0.0))?;
        Ok(Self {
            hidden_size,
            epsilon,
            weight,
            bias,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

impl Module for LayerNorm {
    fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let size = self.hidden_size as f64;
        let mean = (hidden.sum_keepdim(D::Minus1)? / size)?;
        let centered = hidden.broadcast_sub(&mean)?;
        let variance = (centered.sqr()?.sum_keepdim(D::Minus1)? / size)?;
        let denom = (variance + self.epsilon)?.sqrt()?;
        centered
            .broadcast_div(&denom)?
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)
    }
}
