//! Initialisation policies for free-standing learnable tensors.
//!
//! Linear projections rely on [`candle_nn::linear`]'s built-in Kaiming scheme.
//! Parameters that are not wrapped in a layer (seed vectors, inducing points)
//! are created with [`candle_nn::VarBuilder::get_with_hints`] and one of the
//! hints below. Fan computation follows the PyTorch convention so that
//! checkpoints trained elsewhere start from the same distribution: for a
//! tensor of rank `>= 2`, `fan_in = dims[1] * receptive` and
//! `fan_out = dims[0] * receptive` where `receptive` is the product of the
//! remaining dimensions.

use candle_core::{Error, Result};
use candle_nn::Init;

/// Returns `(fan_in, fan_out)` for a parameter of the given shape.
pub fn fans(dims: &[usize]) -> Result<(usize, usize)> {
    match dims {
        [] | [_] => Err(Error::Msg(format!(
            "fan in/out requires a tensor with at least 2 dimensions, got {:?}",
            dims
        ))),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            Ok((inp * receptive, out * receptive))
        }
    }
}

/// Xavier/Glorot uniform hint: `U(-b, b)` with `b = sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform(dims: &[usize]) -> Result<Init> {
    let (fan_in, fan_out) = fans(dims)?;
    let bound = (6.0f64 / (fan_in + fan_out) as f64).sqrt();
    Ok(Init::Uniform {
        lo: -bound,
        up: bound,
    })
}

/// Default `nn.Linear` weight hint: Kaiming-uniform with `a = sqrt(5)`,
/// which reduces to `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
pub fn linear_default(dims: &[usize]) -> Result<Init> {
    let (fan_in, _) = fans(dims)?;
    let bound = 1.0 / (fan_in as f64).sqrt();
    Ok(Init::Uniform {
        lo: -bound,
        up: bound,
    })
}

/// Standard normal hint, `N(0, 1)`.
pub fn standard_normal() -> Init {
    Init::Randn {
        mean: 0.0,
        stdev: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Tensor};
    use candle_nn::{VarBuilder, VarMap};

    fn tensor_stats(tensor: &Tensor) -> Result<(f64, f64, f64)> {
        let values = tensor.flatten_all()?.to_vec1::<f32>()?;
        let n = values.len() as f64;
        let mean = values.iter().copied().map(f64::from).sum::<f64>() / n;
        let var = values
            .iter()
            .map(|v| {
                let diff = f64::from(*v) - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        let max_abs = values
            .iter()
            .map(|v| f64::from(v.abs()))
            .fold(0.0f64, f64::max);
        Ok((mean, var.sqrt(), max_abs))
    }

    #[test]
    fn fans_follow_torch_convention_for_rank_three() -> Result<()> {
        assert_eq!(fans(&[1, 4, 16])?, (64, 16));
        assert_eq!(fans(&[8, 3])?, (3, 8));
        assert!(fans(&[7]).is_err());
        Ok(())
    }

    #[test]
    fn xavier_uniform_respects_bound() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let dims = [1usize, 32, 64];
        let seeds = vb.get_with_hints((1, 32, 64), "seeds", xavier_uniform(&dims)?)?;
        let bound = (6.0f64 / (32.0 * 64.0 + 64.0)).sqrt();
        let (mean, _, max_abs) = tensor_stats(&seeds)?;
        assert!(max_abs <= bound + 1e-6);
        assert!(mean.abs() < bound * 0.1);
        Ok(())
    }

    #[test]
    fn linear_default_scales_with_fan_in() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let weight = vb.get_with_hints((16, 100), "weight", linear_default(&[16, 100])?)?;
        let (_, _, max_abs) = tensor_stats(&weight)?;
        assert!(max_abs <= 0.1 + 1e-6);
        assert!(max_abs > 0.05);
        assert!(linear_default(&[4]).is_err());
        Ok(())
    }

    #[test]
    fn standard_normal_has_unit_scale() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let points = vb.get_with_hints((128, 64), "points", standard_normal())?;
        let (mean, std, _) = tensor_stats(&points)?;
        assert!(mean.abs() < 0.05);
        assert!((std - 1.0).abs() < 0.1);
        Ok(())
    }
}
