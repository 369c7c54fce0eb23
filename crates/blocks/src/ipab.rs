//! Induced persistent attention block.
//!
//! Like [`Isab`](crate::isab::Isab) but the single inducing point is a latent
//! vector owned by the caller instead of a learned parameter. Each call folds
//! the set into the latent and returns the updated latent alongside the
//! output, so it can be threaded through a recurrence:
//!
//! ```text
//! Z'  = mab1(Z, X)    (batch, 1, embed)
//! out = mab2(X, Z')   (batch, n, embed)
//! ```

use attention::{softmax, SharedNormalizer};
use candle_core::{DType, Device, Result, Tensor};
use candle_nn::VarBuilder;
use layers::checks;

use crate::config::IpabConfig;
use crate::errors::BlockError;
use crate::mab::Mab;

#[derive(Debug, Clone)]
pub struct Ipab {
    config: IpabConfig,
    mab1: Mab,
    mab2: Mab,
}

impl Ipab {
    pub fn new(config: IpabConfig, vb: VarBuilder) -> std::result::Result<Self, BlockError> {
        Self::with_normalizer(config, softmax(), vb)
    }

    pub fn with_normalizer(
        config: IpabConfig,
        normalizer: SharedNormalizer,
        vb: VarBuilder,
    ) -> std::result::Result<Self, BlockError> {
        config.validate()?;
        let mab1 = Mab::with_normalizer(config.mab.clone(), normalizer.clone(), vb.pp("mab1"))?;
        let mab2 = Mab::with_normalizer(config.mab.clone(), normalizer, vb.pp("mab2"))?;
        log::debug!("ipab embed_dim={}", config.mab.embed_dim);
        Ok(Self { config, mab1, mab2 })
    }

    pub fn config(&self) -> &IpabConfig {
        &self.config
    }

    /// Zero latent `(batch, embed_dim)` for the first step of a recurrence.
    pub fn initial_latent(&self, batch: usize, dtype: DType, device: &Device) -> Result<Tensor> {
        Tensor::zeros((batch, self.config.mab.embed_dim), dtype, device)
    }

    /// Returns `(output, latent)`: `output` has the shape of `xs`, `latent` the
    /// shape of `z`.
    pub fn forward_t(&self, xs: &Tensor, z: &Tensor, train: bool) -> Result<(Tensor, Tensor)> {
        checks::expect_rank("ipab.latent", z, 2)?;
        let latent = self.mab1.forward(&z.unsqueeze(1)?, xs, train)?;
        let output = self.mab2.forward(xs, &latent, train)?;
        Ok((output, latent.squeeze(1)?))
    }
}
