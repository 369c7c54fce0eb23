//! Error types emitted while building attention modules.

use thiserror::Error;

/// Attention-specific error category.
#[derive(Debug, Error)]
pub enum AttentionError {
    /// The embedding dimension cannot be split evenly across heads.
    #[error("embedding dimension {embed_dim} must be divisible by the number of heads {num_heads}")]
    HeadMismatch { embed_dim: usize, num_heads: usize },
    /// A Candle failure propagated to the caller, typically while allocating parameters.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}
