//! Multihead attention with learned projections.
//!
//! Queries are shaped `(batch, q_len, embed)`, keys and values
//! `(batch, k_len, embed)`. Each input is projected, split into
//! `(batch, heads, len, head_dim)`, attended with [`ScaledDotProduct`] (scaled
//! by `sqrt(head_dim)`), merged back, and passed through the output
//! projection. The result has the query's shape. Attention weights are not
//! returned.
//!
//! Parameters start like `nn.MultiheadAttention`: the query, key and value
//! weights are Xavier-uniform over their packed `(3 * embed, embed)` matrix,
//! the output weight uses the default linear init, and every bias is zero.

use std::fmt;

use candle_core::{Result, Tensor};
use candle_nn::{Init, Linear, Module, VarBuilder};
use layers::{checks, init};

use crate::core::{softmax, AttentionError, MultiheadConfig, SharedNormalizer};
use crate::reference::ScaledDotProduct;

/// Multihead attention layer equivalent to a batch-first `MultiheadAttention`.
#[derive(Clone)]
pub struct MultiheadAttention {
    config: MultiheadConfig,
    head_dim: usize,
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    kernel: ScaledDotProduct,
}

impl fmt::Debug for MultiheadAttention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiheadAttention")
            .field("embed_dim", &self.config.embed_dim)
            .field("num_heads", &self.config.num_heads)
            .field("head_dim", &self.head_dim)
            .field("kernel", &self.kernel)
            .finish()
    }
}

fn projection(embed: usize, bias: bool, weight_init: Init, vb: VarBuilder) -> Result<Linear> {
    let weight = vb.get_with_hints((embed, embed), "weight", weight_init)?;
    let bias = if bias {
        Some(vb.get_with_hints(embed, "bias", candle_nn::init::ZERO)?)
    } else {
        None
    };
    Ok(Linear::new(weight, bias))
}

impl MultiheadAttention {
    /// Builds the layer with softmax score normalisation.
    pub fn new(config: MultiheadConfig, vb: VarBuilder) -> std::result::Result<Self, AttentionError> {
        Self::with_normalizer(config, softmax(), vb)
    }

    /// Builds the layer with a caller-supplied score normaliser.
    pub fn with_normalizer(
        config: MultiheadConfig,
        normalizer: SharedNormalizer,
        vb: VarBuilder,
    ) -> std::result::Result<Self, AttentionError> {
        let head_dim = config.head_dim()?;
        let embed = config.embed_dim;
        let packed = init::xavier_uniform(&[3 * embed, embed])?;
        let q_proj = projection(embed, config.bias, packed, vb.pp("q_proj"))?;
        let k_proj = projection(embed, config.bias, packed, vb.pp("k_proj"))?;
        let v_proj = projection(embed, config.bias, packed, vb.pp("v_proj"))?;
        let out_init = init::linear_default(&[embed, embed])?;
        let out_proj = projection(embed, config.bias, out_init, vb.pp("out_proj"))?;
        log::debug!(
            "multihead attention embed_dim={} heads={} head_dim={} normalizer={}",
            embed,
            config.num_heads,
            head_dim,
            normalizer.name()
        );
        Ok(Self {
            config,
            head_dim,
            q_proj,
            k_proj,
            v_proj,
            out_proj,
            kernel: ScaledDotProduct::with_normalizer(normalizer),
        })
    }

    pub fn config(&self) -> &MultiheadConfig {
        &self.config
    }

    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    fn split_heads(&self, tensor: &Tensor) -> Result<Tensor> {
        let (batch, len, _) = tensor.dims3()?;
        tensor
            .reshape((batch, len, self.config.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn merge_heads(&self, tensor: &Tensor) -> Result<Tensor> {
        let (batch, _, len, _) = tensor.dims4()?;
        tensor
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, len, self.config.embed_dim))
    }

    /// Attends from `query` over `key`/`value`.
    pub fn forward(&self, query: &Tensor, key: &Tensor, value: &Tensor) -> Result<Tensor> {
        checks::expect_batch_set_embed("attention.query", query, self.config.embed_dim)?;
        checks::expect_batch_set_embed("attention.key", key, self.config.embed_dim)?;
        checks::expect_batch_set_embed("attention.value", value, self.config.embed_dim)?;

        let q = self.split_heads(&self.q_proj.forward(query)?)?;
        let k = self.split_heads(&self.k_proj.forward(key)?)?;
        let v = self.split_heads(&self.v_proj.forward(value)?)?;

        let attended = self.kernel.attend(&q, &k, &v)?;
        self.out_proj.forward(&self.merge_heads(&attended)?)
    }
}
