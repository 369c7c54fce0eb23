//! Building blocks shared by the set attention crates.
//!
//! The crate hosts the activation catalogue, parameter initialisers, shape
//! checks, and the [`DenseStack`](dense::DenseStack) feed-forward network used
//! as the position-wise sub-layer of every attention block. Learnable tensors
//! are always created through a [`candle_nn::VarBuilder`] so that they end up
//! in the caller's `VarMap` and are visible to the optimizer.

pub mod activations;
pub mod checks;
pub mod dense;
pub mod init;
pub mod norm;

pub use activations::{Activation, ActivationKind};
pub use dense::{DenseConfig, DenseStack};
pub use norm::LayerNorm;
