//! Multihead attention block.
//!
//! `Mab(X, Y)` lets every element of `X` attend over `Y`, then refines the
//! result position-wise:
//!
//! ```text
//! H   = drop(norm(X + attention(X, Y, Y)))
//! out = drop(norm(H + feedforward(H)))
//! ```
//!
//! `norm` is a single LayerNorm shared by both steps and is skipped unless
//! [`MabConfig::layer_norm`] is set. The output always has the shape of `X`.

use std::fmt;

use attention::{softmax, MultiheadAttention, SharedNormalizer};
use candle_core::{Result, Tensor};
use candle_nn::{Dropout, Module, ModuleT, VarBuilder};
use layers::{norm::DEFAULT_EPSILON, DenseStack, LayerNorm};

use crate::config::MabConfig;
use crate::errors::BlockError;

#[derive(Clone)]
pub struct Mab {
    config: MabConfig,
    attention: MultiheadAttention,
    layer_norm: Option<LayerNorm>,
    feedforward: DenseStack,
    dropout: Dropout,
}

impl fmt::Debug for Mab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mab")
            .field("embed_dim", &self.config.embed_dim)
            .field("num_heads", &self.config.num_heads)
            .field("layer_norm", &self.layer_norm.is_some())
            .field("feedforward", &self.feedforward)
            .field("dropout_p", &self.config.dropout_p)
            .finish()
    }
}

impl Mab {
    /// Builds the block with softmax attention.
    pub fn new(config: MabConfig, vb: VarBuilder) -> std::result::Result<Self, BlockError> {
        Self::with_normalizer(config, softmax(), vb)
    }

    /// Builds the block with a caller-supplied attention score normaliser.
    pub fn with_normalizer(
        config: MabConfig,
        normalizer: SharedNormalizer,
        vb: VarBuilder,
    ) -> std::result::Result<Self, BlockError> {
        config.validate()?;
        let attention =
            MultiheadAttention::with_normalizer(config.attention(), normalizer, vb.pp("attention"))?;
        let layer_norm = if config.layer_norm {
            Some(LayerNorm::new(
                config.embed_dim,
                DEFAULT_EPSILON,
                vb.pp("layer_norm"),
            )?)
        } else {
            None
        };
        let feedforward = DenseStack::new(config.feedforward(), vb.pp("feedforward"))?;
        log::debug!(
            "mab embed_dim={} heads={} ff_layers={:?} layer_norm={} dropout_p={}",
            config.embed_dim,
            config.num_heads,
            config.ff_layers,
            config.layer_norm,
            config.dropout_p
        );
        Ok(Self {
            dropout: Dropout::new(config.dropout_p),
            config,
            attention,
            layer_norm,
            feedforward,
        })
    }

    pub fn config(&self) -> &MabConfig {
        &self.config
    }

    pub fn attention(&self) -> &MultiheadAttention {
        &self.attention
    }

    pub fn feedforward(&self) -> &DenseStack {
        &self.feedforward
    }

    pub fn layer_norm(&self) -> Option<&LayerNorm> {
        self.layer_norm.as_ref()
    }

    fn settle(&self, residual: &Tensor, train: bool) -> Result<Tensor> {
        let normed = match &self.layer_norm {
            Some(norm) => norm.forward(residual)?,
            None => residual.clone(),
        };
        self.dropout.forward_t(&normed, train)
    }

    /// Attends from `x` (queries) over `y` (keys and values).
    pub fn forward(&self, x: &Tensor, y: &Tensor, train: bool) -> Result<Tensor> {
        let attended = self.attention.forward(x, y, y)?;
        let hidden = self.settle(&x.add(&attended)?, train)?;
        let refined = self.feedforward.forward_t(&hidden, train)?;
        self.settle(&hidden.add(&refined)?, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use candle_core::{DType, Device, D};
    use candle_nn::VarMap;

    fn var_builder(varmap: &VarMap) -> VarBuilder<'_> {
        VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu)
    }

    fn to_candle(err: BlockError) -> candle_core::Error {
        candle_core::Error::Msg(err.to_string())
    }

    fn max_abs_diff(a: &Tensor, b: &Tensor) -> Result<f32> {
        a.sub(b)?.abs()?.max_all()?.to_vec0::<f32>()
    }

    #[test]
    fn output_keeps_query_shape() -> Result<()> {
        let varmap = VarMap::new();
        let mab = Mab::new(MabConfig::new(8, 2), var_builder(&varmap)).map_err(to_candle)?;
        let x = Tensor::randn(0f32, 1.0, (2, 5, 8), &Device::Cpu)?;
        let y = Tensor::randn(0f32, 1.0, (2, 7, 8), &Device::Cpu)?;
        assert_eq!(mab.forward(&x, &y, false)?.dims(), &[2, 5, 8]);
        assert_eq!(mab.forward(&x, &y, true)?.dims(), &[2, 5, 8]);
        Ok(())
    }

    #[test]
    fn registers_attention_norm_and_feedforward_parameters() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(8, 2);
        cfg.ff_layers = vec![16];
        cfg.layer_norm = true;
        Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        // 4 projections + 1 norm + 2 dense layers, each with weight and bias.
        assert_eq!(varmap.all_vars().len(), 14);
        Ok(())
    }

    #[test]
    fn head_split_must_be_even() -> Result<()> {
        let varmap = VarMap::new();
        let err = Mab::new(MabConfig::new(10, 3), var_builder(&varmap)).unwrap_err();
        assert!(matches!(
            err,
            BlockError::Config(ConfigError::HeadsNotDivisible {
                embed_dim: 10,
                num_heads: 3
            })
        ));
        assert!(varmap.all_vars().is_empty());
        Mab::new(MabConfig::new(10, 2), var_builder(&varmap)).map_err(to_candle)?;
        Ok(())
    }

    #[test]
    fn residual_wiring_without_norm() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(6, 3);
        cfg.ff_layers = vec![12];
        cfg.dropout_p = 0.0;
        let mab = Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        let x = Tensor::randn(0f32, 1.0, (2, 4, 6), &Device::Cpu)?;
        let y = Tensor::randn(0f32, 1.0, (2, 9, 6), &Device::Cpu)?;

        let hidden = x.add(&mab.attention().forward(&x, &y, &y)?)?;
        let expected = hidden.add(&mab.feedforward().forward_t(&hidden, false)?)?;
        let out = mab.forward(&x, &y, true)?;
        assert!(max_abs_diff(&out, &expected)? < 1e-5);
        Ok(())
    }

    #[test]
    fn layer_norm_standardises_rows_in_eval() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(8, 4);
        cfg.layer_norm = true;
        cfg.ff_layers = vec![8, 8];
        let mab = Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        let x = Tensor::randn(0f32, 3.0, (3, 5, 8), &Device::Cpu)?;
        let out = mab.forward(&x, &x, false)?;

        let mean = out.mean_keepdim(D::Minus1)?;
        let variance = out.broadcast_sub(&mean)?.sqr()?.mean_keepdim(D::Minus1)?;
        assert!(mean.abs()?.max_all()?.to_vec0::<f32>()? < 1e-4);
        let var_err = variance.affine(1.0, -1.0)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(var_err < 1e-3, "variance off by {var_err}");
        Ok(())
    }

    #[test]
    fn shared_norm_follows_each_residual() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(8, 2);
        cfg.ff_layers = vec![16];
        cfg.layer_norm = true;
        cfg.dropout_p = 0.0;
        let mab = Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        let norm = mab
            .layer_norm()
            .ok_or_else(|| candle_core::Error::Msg("layer norm missing".into()))?;
        let x = Tensor::randn(0f32, 1.0, (2, 3, 8), &Device::Cpu)?;
        let y = Tensor::randn(0f32, 1.0, (2, 6, 8), &Device::Cpu)?;

        let hidden = norm.forward(&x.add(&mab.attention().forward(&x, &y, &y)?)?)?;
        let expected = norm.forward(&hidden.add(&mab.feedforward().forward_t(&hidden, false)?)?)?;
        let out = mab.forward(&x, &y, true)?;
        assert!(max_abs_diff(&out, &expected)? < 1e-5);
        Ok(())
    }

    #[test]
    fn dropout_runs_after_the_norm() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(8, 2);
        cfg.layer_norm = true;
        cfg.dropout_p = 0.5;
        let mab = Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        let x = Tensor::randn(0f32, 1.0, (4, 16, 8), &Device::Cpu)?;

        // A norm applied after dropout would shift the dropped entries away from zero.
        let zeros = mab
            .forward(&x, &x, true)?
            .flatten_all()?
            .to_vec1::<f32>()?
            .into_iter()
            .filter(|v| *v == 0.0)
            .count();
        assert!(zeros > 0);
        Ok(())
    }

    #[test]
    fn dropout_only_acts_in_training() -> Result<()> {
        let varmap = VarMap::new();
        let mut cfg = MabConfig::new(8, 2);
        cfg.dropout_p = 0.5;
        let mab = Mab::new(cfg, var_builder(&varmap)).map_err(to_candle)?;
        let x = Tensor::randn(0f32, 1.0, (4, 16, 8), &Device::Cpu)?;

        let first = mab.forward(&x, &x, false)?;
        let second = mab.forward(&x, &x, false)?;
        assert_eq!(max_abs_diff(&first, &second)?, 0.0);

        let trained = mab.forward(&x, &x, true)?;
        let zeros = trained
            .flatten_all()?
            .to_vec1::<f32>()?
            .into_iter()
            .filter(|v| *v == 0.0)
            .count();
        assert!(zeros > 0);
        Ok(())
    }
}
