//! Serializable configuration for the attention blocks.
//!
//! Block files are TOML (`.toml` or no extension) or JSON (`.json`) and carry
//! a `kind` tag selecting the block, e.g.
//!
//! ```toml
//! kind = "isab"
//! num_inducing = 16
//!
//! [mab]
//! embed_dim = 64
//! num_heads = 4
//! ff_layers = [128]
//! layer_norm = true
//! ```

use std::{fs, path::Path};

use attention::MultiheadConfig;
use layers::DenseConfig;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

fn default_final_linear() -> bool {
    true
}

fn default_dropout_p() -> f32 {
    0.1
}

fn default_ff_negative_slope() -> f64 {
    0.2
}

fn check_probability(name: &str, p: f32, errors: &mut Vec<String>) {
    if !(0.0..1.0).contains(&p) {
        errors.push(format!("{name} must be in [0, 1), got {p}"));
    }
}

fn finish(errors: Vec<String>) -> Result<(), ConfigError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors.join("; ")))
    }
}

/// Multihead attention block settings, shared by every block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MabConfig {
    pub embed_dim: usize,
    pub num_heads: usize,
    /// Hidden widths of the feed-forward stack between the two `embed_dim` ends.
    #[serde(default)]
    pub ff_layers: Vec<usize>,
    /// Leave the feed-forward output projection without an activation.
    #[serde(default = "default_final_linear")]
    pub final_linear: bool,
    #[serde(default)]
    pub layer_norm: bool,
    /// Dropout applied after each residual connection.
    #[serde(default = "default_dropout_p")]
    pub dropout_p: f32,
    #[serde(default = "default_ff_negative_slope")]
    pub ff_negative_slope: f64,
    #[serde(default)]
    pub ff_dropout_p: f32,
}

impl MabConfig {
    pub fn new(embed_dim: usize, num_heads: usize) -> Self {
        Self {
            embed_dim,
            num_heads,
            ff_layers: Vec::new(),
            final_linear: default_final_linear(),
            layer_norm: false,
            dropout_p: default_dropout_p(),
            ff_negative_slope: default_ff_negative_slope(),
            ff_dropout_p: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.embed_dim == 0 {
            errors.push("mab.embed_dim must be greater than 0".to_string());
        }
        if self.num_heads == 0 {
            errors.push("mab.num_heads must be greater than 0".to_string());
        }
        if errors.is_empty() && self.embed_dim % self.num_heads != 0 {
            return Err(ConfigError::HeadsNotDivisible {
                embed_dim: self.embed_dim,
                num_heads: self.num_heads,
            });
        }
        check_probability("mab.dropout_p", self.dropout_p, &mut errors);
        check_probability("mab.ff_dropout_p", self.ff_dropout_p, &mut errors);
        if let Some(pos) = self.ff_layers.iter().position(|&w| w == 0) {
            errors.push(format!("mab.ff_layers[{pos}] must be greater than 0"));
        }
        finish(errors)
    }

    /// Attention settings derived from this block.
    pub fn attention(&self) -> MultiheadConfig {
        MultiheadConfig::new(self.embed_dim, self.num_heads)
    }

    /// Feed-forward stack `[embed_dim] + ff_layers + [embed_dim]`.
    pub fn feedforward(&self) -> DenseConfig {
        let mut widths = Vec::with_capacity(self.ff_layers.len() + 2);
        widths.push(self.embed_dim);
        widths.extend_from_slice(&self.ff_layers);
        widths.push(self.embed_dim);
        DenseConfig {
            widths,
            negative_slope: self.ff_negative_slope,
            dropout_p: self.ff_dropout_p,
            final_linear: self.final_linear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmaConfig {
    /// Number of learned seed vectors, i.e. the pooled set size.
    pub seed_count: usize,
    pub mab: MabConfig,
}

impl PmaConfig {
    pub fn new(seed_count: usize, mab: MabConfig) -> Self {
        Self { seed_count, mab }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_count == 0 {
            return Err(ConfigError::Invalid(
                "pma.seed_count must be greater than 0".to_string(),
            ));
        }
        self.mab.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsabConfig {
    /// Number of learned inducing points.
    pub num_inducing: usize,
    pub mab: MabConfig,
}

impl IsabConfig {
    pub fn new(num_inducing: usize, mab: MabConfig) -> Self {
        Self { num_inducing, mab }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_inducing == 0 {
            return Err(ConfigError::Invalid(
                "isab.num_inducing must be greater than 0".to_string(),
            ));
        }
        self.mab.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpabConfig {
    pub mab: MabConfig,
}

impl IpabConfig {
    pub fn new(mab: MabConfig) -> Self {
        Self { mab }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mab.validate()
    }
}

/// Any block, tagged by `kind` in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BlockConfig {
    Mab(MabConfig),
    Pma(PmaConfig),
    Isab(IsabConfig),
    Ipab(IpabConfig),
}

impl BlockConfig {
    /// Reads, parses and validates a block configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: BlockConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&fs::read_to_string(path)?)?,
            Some("toml") | None => toml::from_str(&fs::read_to_string(path)?)?,
            Some(other) => {
                return Err(ConfigError::Format(format!(
                    "unsupported configuration extension '{other}'"
                )));
            }
        };
        config.validate()?;
        log::debug!("loaded {} config from {}", config.kind(), path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            BlockConfig::Mab(cfg) => cfg.validate(),
            BlockConfig::Pma(cfg) => cfg.validate(),
            BlockConfig::Isab(cfg) => cfg.validate(),
            BlockConfig::Ipab(cfg) => cfg.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BlockConfig::Mab(_) => "mab",
            BlockConfig::Pma(_) => "pma",
            BlockConfig::Isab(_) => "isab",
            BlockConfig::Ipab(_) => "ipab",
        }
    }

    /// Attention block settings common to every kind.
    pub fn mab(&self) -> &MabConfig {
        match self {
            BlockConfig::Mab(cfg) => cfg,
            BlockConfig::Pma(cfg) => &cfg.mab,
            BlockConfig::Isab(cfg) => &cfg.mab,
            BlockConfig::Ipab(cfg) => &cfg.mab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_block_conventions() {
        let cfg: MabConfig = toml::from_str("embed_dim = 8\nnum_heads = 2\n").unwrap();
        assert_eq!(cfg, MabConfig::new(8, 2));
        assert!(cfg.final_linear);
        assert!(!cfg.layer_norm);
        assert!((cfg.dropout_p - 0.1).abs() < f32::EPSILON);
        assert!(cfg.ff_layers.is_empty());
    }

    #[test]
    fn feedforward_widths_wrap_hidden_layers() {
        let mut cfg = MabConfig::new(10, 2);
        cfg.ff_layers = vec![10, 20, 10];
        let ff = cfg.feedforward();
        assert_eq!(ff.widths, vec![10, 10, 20, 10, 10]);
        assert!(ff.final_linear);
        assert_eq!(ff.dropout_p, 0.0);
    }

    #[test]
    fn head_split_is_checked_first() {
        assert!(matches!(
            MabConfig::new(10, 3).validate(),
            Err(ConfigError::HeadsNotDivisible {
                embed_dim: 10,
                num_heads: 3
            })
        ));
        assert!(MabConfig::new(10, 2).validate().is_ok());
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut cfg = MabConfig::new(8, 2);
        cfg.dropout_p = 1.0;
        cfg.ff_dropout_p = -0.5;
        cfg.ff_layers = vec![4, 0];
        match cfg.validate() {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.contains("mab.dropout_p"));
                assert!(message.contains("mab.ff_dropout_p"));
                assert!(message.contains("ff_layers[1]"));
            }
            other => panic!("unexpected validation result: {other:?}"),
        }
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(PmaConfig::new(0, MabConfig::new(4, 1)).validate().is_err());
        assert!(IsabConfig::new(0, MabConfig::new(4, 1)).validate().is_err());
        assert!(MabConfig::new(0, 1).validate().is_err());
    }

    #[test]
    fn tagged_json_selects_block_kind() {
        let json = r#"{"kind":"pma","seed_count":3,"mab":{"embed_dim":6,"num_heads":3}}"#;
        let cfg: BlockConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.kind(), "pma");
        assert_eq!(cfg, BlockConfig::Pma(PmaConfig::new(3, MabConfig::new(6, 3))));
        assert_eq!(cfg.mab().num_heads, 3);
    }
}
