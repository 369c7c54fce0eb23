//! Attention primitives for set-structured inputs.
//!
//! The crate provides two layers of API:
//!
//! * [`ScaledDotProduct`](reference::ScaledDotProduct) computes
//!   `normalize(Q·Kᵗ / sqrt(d)) · V` for tensors sharing their leading
//!   (batch/head) dimensions and their trailing feature dimension `d`. The
//!   score normalisation is a pluggable [`ScoreNormalizer`] and defaults to a
//!   softmax over the last axis.
//! * [`MultiheadAttention`](multihead::MultiheadAttention) wraps the primitive
//!   with learned query/key/value/output projections and splits the embedding
//!   dimension across heads. Inputs use the `(batch, set, embed)` layout; the
//!   query and key sets may have different sizes.
//!
//! No masking is applied: every query element attends to every key element,
//! which is what permutation-equivariant set blocks require.

pub mod core;
pub mod multihead;
pub mod reference;

pub use crate::core::{
    softmax, AttentionError, IdentityScores, MultiheadConfig, ScoreNormalizer, SharedNormalizer,
    Softmax,
};
pub use multihead::MultiheadAttention;
pub use reference::ScaledDotProduct;
