//! Pooling by multihead attention.
//!
//! A fixed number of learned seed vectors attend over the input set, so the
//! output always holds `seed_count` elements whatever the input set size.

use attention::{softmax, SharedNormalizer};
use candle_core::{Result, Tensor};
use candle_nn::{ModuleT, VarBuilder};
use layers::init;

use crate::config::PmaConfig;
use crate::errors::BlockError;
use crate::mab::Mab;

#[derive(Debug, Clone)]
pub struct Pma {
    config: PmaConfig,
    seeds: Tensor,
    mab: Mab,
}

impl Pma {
    pub fn new(config: PmaConfig, vb: VarBuilder) -> std::result::Result<Self, BlockError> {
        Self::with_normalizer(config, softmax(), vb)
    }

    pub fn with_normalizer(
        config: PmaConfig,
        normalizer: SharedNormalizer,
        vb: VarBuilder,
    ) -> std::result::Result<Self, BlockError> {
        config.validate()?;
        let shape = (1, config.seed_count, config.mab.embed_dim);
        let hint = init::xavier_uniform(&[shape.0, shape.1, shape.2])?;
        let seeds = vb.get_with_hints(shape, "seeds", hint)?;
        let mab = Mab::with_normalizer(config.mab.clone(), normalizer, vb.pp("mab"))?;
        log::debug!(
            "pma seed_count={} embed_dim={}",
            config.seed_count,
            config.mab.embed_dim
        );
        Ok(Self { config, seeds, mab })
    }

    pub fn config(&self) -> &PmaConfig {
        &self.config
    }

    /// Learned seeds shaped `(1, seed_count, embed_dim)`.
    pub fn seeds(&self) -> &Tensor {
        &self.seeds
    }
}

impl ModuleT for Pma {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let batch = xs.dim(0)?;
        let seeds = self
            .seeds
            .broadcast_as((batch, self.config.seed_count, self.config.mab.embed_dim))?
            .contiguous()?;
        self.mab.forward(&seeds, xs, train)
    }
}
