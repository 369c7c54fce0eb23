//! Set Transformer blocks on Candle.
//!
//! Re-exports the workspace crates under one roof and hosts the device
//! selection and smoke-run helpers used by the `set-transformer` binary.

pub use attention;
pub use blocks;
pub use layers;

pub use attention::{MultiheadAttention, ScaledDotProduct, ScoreNormalizer, SharedNormalizer};
pub use blocks::{
    BlockConfig, BlockError, ConfigError, Ipab, IpabConfig, Isab, IsabConfig, Mab, MabConfig, Pma,
    PmaConfig,
};
pub use layers::{DenseConfig, DenseStack};

pub mod demo;

use anyhow::Result;
use candle_core::Device;

/// Picks CUDA device 0 when available, otherwise the CPU. Setting
/// `CANDLE_FORCE_CPU` skips the CUDA probe.
pub fn setup_device() -> Result<Device> {
    if std::env::var("CANDLE_FORCE_CPU").is_ok() {
        log::info!("CANDLE_FORCE_CPU set, using CPU backend");
        return Ok(Device::Cpu);
    }

    match Device::cuda_if_available(0) {
        Ok(device) if device.is_cuda() => {
            log::info!("CUDA device selected: {:?}", device);
            Ok(device)
        }
        Ok(_) | Err(_) => {
            log::info!("using CPU backend");
            Ok(Device::Cpu)
        }
    }
}
