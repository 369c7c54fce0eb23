//! Smoke run exercising a dense stack and an IPAB recurrence end to end.

use std::path::Path;

use anyhow::{bail, Result};
use blocks::{BlockConfig, Ipab, IpabConfig, MabConfig};
use candle_core::{DType, Device, Tensor};
use candle_nn::{ModuleT, VarBuilder, VarMap};
use layers::{DenseConfig, DenseStack};

/// Widths of the standalone dense stack.
pub const DENSE_WIDTHS: [usize; 4] = [10, 20, 30, 1];

#[derive(Debug, Clone, PartialEq)]
pub struct DemoOptions {
    pub batch: usize,
    pub set_size: usize,
    pub steps: usize,
    pub train: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            batch: 16,
            set_size: 30,
            steps: 1,
            train: false,
        }
    }
}

/// Output shapes observed during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub dense_output: Vec<usize>,
    pub block_output: Vec<usize>,
    pub latent: Vec<usize>,
    pub parameters: usize,
}

/// IPAB with `embed_dim = 10`, two heads, and hidden widths `[10, 20, 10]`.
pub fn default_ipab_config() -> IpabConfig {
    let mut mab = MabConfig::new(10, 2);
    mab.ff_layers = vec![10, 20, 10];
    IpabConfig::new(mab)
}

/// Loads a block file that must describe an IPAB.
pub fn load_ipab_config(path: impl AsRef<Path>) -> Result<IpabConfig> {
    match BlockConfig::from_path(path.as_ref())? {
        BlockConfig::Ipab(config) => Ok(config),
        other => bail!(
            "{} describes a {} block, the demo needs an ipab",
            path.as_ref().display(),
            other.kind()
        ),
    }
}

pub fn run(config: IpabConfig, options: &DemoOptions, device: &Device) -> Result<DemoReport> {
    if options.batch == 0 || options.set_size == 0 {
        bail!("batch and set size must be greater than 0");
    }
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

    let dense = DenseStack::new(DenseConfig::new(DENSE_WIDTHS.to_vec()), vb.pp("dense"))?;
    let dense_input = Tensor::randn(0f32, 1.0, (options.batch, DENSE_WIDTHS[0]), device)?;
    let dense_output = dense.forward_t(&dense_input, options.train)?;
    log::info!(
        "dense stack {:?}: {:?} -> {:?}",
        DENSE_WIDTHS,
        dense_input.dims(),
        dense_output.dims()
    );

    let embed = config.mab.embed_dim;
    let ipab = Ipab::new(config, vb.pp("ipab"))?;
    let xs = Tensor::ones((options.batch, options.set_size, embed), DType::F32, device)?;
    let mut latent = Tensor::ones((options.batch, embed), DType::F32, device)?;
    let mut output = xs.clone();
    for step in 0..options.steps {
        let (out, next) = ipab.forward_t(&xs, &latent, options.train)?;
        log::info!(
            "ipab step {}: x={:?} out={:?} z={:?}",
            step,
            xs.dims(),
            out.dims(),
            next.dims()
        );
        output = out;
        latent = next;
    }

    let parameters = varmap
        .all_vars()
        .iter()
        .map(|var| var.as_tensor().elem_count())
        .sum();
    log::info!("trainable parameters: {}", parameters);

    Ok(DemoReport {
        dense_output: dense_output.dims().to_vec(),
        block_output: output.dims().to_vec(),
        latent: latent.dims().to_vec(),
        parameters,
    })
}
