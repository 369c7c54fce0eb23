use attention::AttentionError;
use thiserror::Error;

/// Problems found while loading or validating a block configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("embed_dim {embed_dim} is not divisible by num_heads {num_heads}")]
    HeadsNotDivisible { embed_dim: usize, num_heads: usize },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unsupported configuration format: {0}")]
    Format(String),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while constructing a block.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Attention(#[from] AttentionError),
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}
