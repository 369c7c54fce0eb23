//! Reference scaled dot-product attention.
//!
//! `attend(q, k, v) = normalize(q · kᵗ / sqrt(d)) · v` where `d` is the trailing
//! dimension of `q`. All three tensors must share their leading dimensions
//! (batch, heads, ...); `k` and `v` must agree on the key length. The output
//! has the leading dimensions of `q`, its query length, and the trailing
//! dimension of `v`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use candle_core::{Result, Tensor, D};
use layers::checks;

use crate::core::{softmax, ScoreNormalizer, SharedNormalizer};

/// Stateless attention kernel parameterised by its score normaliser.
#[derive(Clone)]
pub struct ScaledDotProduct {
    normalizer: SharedNormalizer,
    first_call: Arc<OnceLock<()>>,
}

impl fmt::Debug for ScaledDotProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaledDotProduct")
            .field("normalizer", &self.normalizer.name())
            .finish()
    }
}

impl ScaledDotProduct {
    /// Kernel with softmax normalisation.
    pub fn new() -> Self {
        Self::with_normalizer(softmax())
    }

    /// Kernel with a caller-supplied normaliser.
    pub fn with_normalizer(normalizer: SharedNormalizer) -> Self {
        Self {
            normalizer,
            first_call: Arc::new(OnceLock::new()),
        }
    }

    pub fn normalizer(&self) -> &SharedNormalizer {
        &self.normalizer
    }

    /// Normalised attention weights shaped `[..., q_len, k_len]`.
    pub fn attention_weights(&self, q: &Tensor, k: &Tensor) -> Result<Tensor> {
        checks::expect_same_last_dim("q", q, "k", k)?;
        if self.first_call.set(()).is_ok() {
            log::info!(
                "attention::reference init normalizer={} q={:?} k={:?}",
                self.normalizer.name(),
                q.dims(),
                k.dims()
            );
        }

        let d = q.dim(D::Minus1)?;
        let k_t = k.transpose(D::Minus2, D::Minus1)?.contiguous()?;
        let scores = q.contiguous()?.matmul(&k_t)?;
        let scaled = scores.affine(1.0 / (d as f64).sqrt(), 0.0)?;
        self.normalizer.normalize(&scaled)
    }

    /// Computes attention of `q` over the `k`/`v` pairs.
    pub fn attend(&self, q: &Tensor, k: &Tensor, v: &Tensor) -> Result<Tensor> {
        let weights = self.attention_weights(q, k)?;
        weights.matmul(&v.contiguous()?)
    }
}

impl Default for ScaledDotProduct {
    fn default() -> Self {
        Self::new()
    }
}
