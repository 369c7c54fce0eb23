//! Position-wise dense stacks built from affine projections and activations.
//!
//! A stack is described by its layer widths `[s0, s1, ..., sn]` and owns `n`
//! projections `si -> si+1`. Inputs may have any rank as long as the last
//! dimension equals `s0`; leading dimensions are preserved and the last one
//! becomes `sn`. After every projection the activation is applied (except
//! after the final one when [`DenseConfig::final_linear`] is set), followed by
//! dropout. A stack with fewer than two widths has no projections and returns
//! its input unchanged.

use std::sync::Arc;

use candle_core::{Error, Result, Tensor};
use candle_nn::{Dropout, Linear, Module, ModuleT, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::activations::{leaky_relu, Activation};

fn default_negative_slope() -> f64 {
    0.2
}

/// Configuration for a [`DenseStack`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    /// Ordered layer widths, input width first.
    pub widths: Vec<usize>,
    /// Slope of the leaky rectifier for negative inputs.
    #[serde(default = "default_negative_slope")]
    pub negative_slope: f64,
    /// Dropout probability applied after each projection.
    #[serde(default)]
    pub dropout_p: f32,
    /// Leave the last projection purely linear.
    #[serde(default)]
    pub final_linear: bool,
}

impl DenseConfig {
    /// Creates a configuration with the default slope (0.2), no dropout, and a
    /// non-linearity after every projection.
    pub fn new(widths: Vec<usize>) -> Self {
        Self {
            widths,
            negative_slope: default_negative_slope(),
            dropout_p: 0.0,
            final_linear: false,
        }
    }

    /// Number of projections described by the widths.
    pub fn num_layers(&self) -> usize {
        self.widths.len().saturating_sub(1)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.dropout_p) {
            return Err(Error::Msg(format!(
                "dense dropout_p must be in [0, 1), got {}",
                self.dropout_p
            )));
        }
        if let Some(pos) = self.widths.iter().position(|&w| w == 0) {
            return Err(Error::Msg(format!(
                "dense width at position {pos} must be greater than zero"
            )));
        }
        Ok(())
    }
}

/// Stack of affine projections interleaved with an activation and dropout.
#[derive(Clone)]
pub struct DenseStack {
    config: DenseConfig,
    layers: Vec<Linear>,
    activation: Arc<dyn Activation>,
    dropout: Dropout,
}

impl std::fmt::Debug for DenseStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseStack")
            .field("widths", &self.config.widths)
            .field("activation", &self.activation.kind())
            .field("final_linear", &self.config.final_linear)
            .field("dropout_p", &self.config.dropout_p)
            .finish()
    }
}

impl DenseStack {
    /// Builds the stack with a leaky rectifier using `config.negative_slope`.
    pub fn new(config: DenseConfig, vb: VarBuilder) -> Result<Self> {
        let activation = leaky_relu(config.negative_slope);
        Self::with_activation(config, activation, vb)
    }

    /// Builds the stack with a caller-supplied activation.
    pub fn with_activation(
        config: DenseConfig,
        activation: Arc<dyn Activation>,
        vb: VarBuilder,
    ) -> Result<Self> {
        config.validate()?;
        let layers = config
            .widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| candle_nn::linear(pair[0], pair[1], vb.pp(format!("layer_{i}"))))
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "dense stack widths={:?} activation={:?} final_linear={} dropout_p={}",
            config.widths,
            activation.kind(),
            config.final_linear,
            config.dropout_p
        );
        let dropout = Dropout::new(config.dropout_p);
        Ok(Self {
            config,
            layers,
            activation,
            dropout,
        })
    }

    pub fn config(&self) -> &DenseConfig {
        &self.config
    }

    /// Number of affine projections in the stack.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Width of the produced features, or `None` when the stack has no widths.
    pub fn output_dim(&self) -> Option<usize> {
        self.config.widths.last().copied()
    }
}

impl ModuleT for DenseStack {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let last = self.layers.len().saturating_sub(1);
        let mut hidden = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            hidden = layer.forward(&hidden)?;
            if i != last || !self.config.final_linear {
                hidden = self.activation.forward(&hidden)?;
            }
            hidden = self.dropout.forward_t(&hidden, train)?;
        }
        Ok(hidden)
    }
}
