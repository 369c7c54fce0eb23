//! Induced set attention block.
//!
//! Self-attention over a set of size `n` costs `O(n²)`. The block instead
//! summarises the set onto `m` learned inducing points and lets the set attend
//! back over that summary, bringing the cost down to `O(n·m)`:
//!
//! ```text
//! H   = mab1(I, X)    (batch, m, embed)
//! out = mab2(X, H)    (batch, n, embed)
//! ```

use attention::{softmax, SharedNormalizer};
use candle_core::{Result, Tensor};
use candle_nn::{ModuleT, VarBuilder};
use layers::init;

use crate::config::IsabConfig;
use crate::errors::BlockError;
use crate::mab::Mab;

#[derive(Debug, Clone)]
pub struct Isab {
    config: IsabConfig,
    inducing_points: Tensor,
    mab1: Mab,
    mab2: Mab,
}

impl Isab {
    pub fn new(config: IsabConfig, vb: VarBuilder) -> std::result::Result<Self, BlockError> {
        Self::with_normalizer(config, softmax(), vb)
    }

    /// Both inner blocks share `normalizer`.
    pub fn with_normalizer(
        config: IsabConfig,
        normalizer: SharedNormalizer,
        vb: VarBuilder,
    ) -> std::result::Result<Self, BlockError> {
        config.validate()?;
        let inducing_points = vb.get_with_hints(
            (config.num_inducing, config.mab.embed_dim),
            "inducing_points",
            init::standard_normal(),
        )?;
        let mab1 = Mab::with_normalizer(config.mab.clone(), normalizer.clone(), vb.pp("mab1"))?;
        let mab2 = Mab::with_normalizer(config.mab.clone(), normalizer, vb.pp("mab2"))?;
        log::debug!(
            "isab num_inducing={} embed_dim={}",
            config.num_inducing,
            config.mab.embed_dim
        );
        Ok(Self {
            config,
            inducing_points,
            mab1,
            mab2,
        })
    }

    pub fn config(&self) -> &IsabConfig {
        &self.config
    }

    /// Learned inducing points shaped `(num_inducing, embed_dim)`.
    pub fn inducing_points(&self) -> &Tensor {
        &self.inducing_points
    }

    /// Summary of `xs` on the inducing points, `(batch, num_inducing, embed_dim)`.
    pub fn induce(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let batch = xs.dim(0)?;
        let (num_inducing, embed) = self.inducing_points.dims2()?;
        let points = self
            .inducing_points
            .broadcast_as((batch, num_inducing, embed))?
            .contiguous()?;
        self.mab1.forward(&points, xs, train)
    }
}

impl ModuleT for Isab {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let induced = self.induce(xs, train)?;
        self.mab2.forward(xs, &induced, train)
    }
}
