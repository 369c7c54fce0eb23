//! Attention blocks for set-structured inputs.
//!
//! Every block consumes tensors shaped `(batch, set, embed)` and registers its
//! parameters through the caller's [`candle_nn::VarBuilder`]. [`Mab`] is the
//! shared primitive; [`Pma`] pools a set onto learned seeds, [`Isab`] routes
//! self-attention through learned inducing points, and [`Ipab`] threads a
//! caller-owned latent vector between calls.

pub mod config;
pub mod errors;
pub mod ipab;
pub mod isab;
pub mod mab;
pub mod pma;

pub use config::{BlockConfig, IpabConfig, IsabConfig, MabConfig, PmaConfig};
pub use errors::{BlockError, ConfigError};
pub use ipab::Ipab;
pub use isab::Isab;
pub use mab::Mab;
pub use pma::Pma;
