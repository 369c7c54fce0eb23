//! Configuration for multihead attention modules.

use super::AttentionError;

/// Shape of a [`MultiheadAttention`](crate::multihead::MultiheadAttention) layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiheadConfig {
    /// Model (embedding) dimension shared by queries, keys and values.
    pub embed_dim: usize,
    /// Number of attention heads; must divide `embed_dim`.
    pub num_heads: usize,
    /// Whether the four projections carry a bias vector.
    pub bias: bool,
}

impl MultiheadConfig {
    /// Creates a configuration with biased projections.
    pub fn new(embed_dim: usize, num_heads: usize) -> Self {
        Self {
            embed_dim,
            num_heads,
            bias: true,
        }
    }

    /// Per-head feature dimension, or an error when the heads do not divide
    /// the embedding evenly.
    pub fn head_dim(&self) -> Result<usize, AttentionError> {
        if self.embed_dim == 0 || self.num_heads == 0 || self.embed_dim % self.num_heads != 0 {
            return Err(AttentionError::HeadMismatch {
                embed_dim: self.embed_dim,
                num_heads: self.num_heads,
            });
        }
        Ok(self.embed_dim / self.num_heads)
    }
}
