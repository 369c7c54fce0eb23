//! Core traits and types shared across attention implementations.
//!
//! Score normalisers turn raw, already-scaled attention logits shaped
//! `[..., q_len, k_len]` into the weights applied to the values. They must
//! preserve the input shape.

pub mod config;
pub mod errors;

use std::sync::Arc;

use candle_core::{Result, Tensor, D};

pub use config::MultiheadConfig;
pub use errors::AttentionError;

/// Strategy applied to scaled attention scores before they weight the values.
///
/// Any `Fn(&Tensor) -> candle_core::Result<Tensor> + Send + Sync` closure is a
/// normaliser, so callers can plug in sparsemax-style variants or
/// instrumentation without defining a type.
pub trait ScoreNormalizer: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str {
        "custom"
    }

    /// Normalises `scores` shaped `[..., q_len, k_len]`.
    fn normalize(&self, scores: &Tensor) -> Result<Tensor>;
}

/// Shared handle used by modules that hold a normaliser.
pub type SharedNormalizer = Arc<dyn ScoreNormalizer>;

impl<F> ScoreNormalizer for F
where
    F: Fn(&Tensor) -> Result<Tensor> + Send + Sync,
{
    fn normalize(&self, scores: &Tensor) -> Result<Tensor> {
        self(scores)
    }
}

/// Softmax over the last (key) axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl ScoreNormalizer for Softmax {
    fn name(&self) -> &str {
        "softmax"
    }

    fn normalize(&self, scores: &Tensor) -> Result<Tensor> {
        candle_nn::ops::softmax(scores, D::Minus1)
    }
}

/// Leaves the scaled scores untouched (linear attention without normalisation).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScores;

impl ScoreNormalizer for IdentityScores {
    fn name(&self) -> &str {
        "identity"
    }

    fn normalize(&self, scores: &Tensor) -> Result<Tensor> {
        Ok(scores.clone())
    }
}

/// Default normaliser handle.
pub fn softmax() -> SharedNormalizer {
    Arc::new(Softmax)
}
