//! Lightweight validation helpers shared across layer and attention components.
//!
//! These routines provide concise shape assertions that can be wired into
//! forward paths where a Candle kernel would otherwise fail with a less
//! descriptive message. They return `candle_core::Result<()>` so call sites
//! can propagate errors without panicking.

use candle_core::{Error, Result, Tensor};

/// Ensures a tensor has exactly `rank` dimensions.
pub fn expect_rank(name: &str, tensor: &Tensor, rank: usize) -> Result<()> {
    let dims = tensor.dims();
    if dims.len() == rank {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{name}: expected rank {rank}, got shape {:?}",
            dims
        )))
    }
}

/// Validates the `(batch, set, embed)` convention with a known embedding size.
pub fn expect_batch_set_embed(name: &str, tensor: &Tensor, embed: usize) -> Result<()> {
    match tensor.dims() {
        [_, _, actual] if *actual == embed => Ok(()),
        dims => Err(Error::Msg(format!(
            "{name}: expected (batch, set, {embed}) layout, got {:?}",
            dims
        ))),
    }
}

/// Checks two tensors agree on their trailing (feature) dimension.
pub fn expect_same_last_dim(
    left_name: &str,
    left: &Tensor,
    right_name: &str,
    right: &Tensor,
) -> Result<()> {
    match (left.dims().last(), right.dims().last()) {
        (Some(l), Some(r)) if l == r => Ok(()),
        _ => Err(Error::Msg(format!(
            "{left_name} {:?} and {right_name} {:?} must share the trailing dimension",
            left.dims(),
            right.dims()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn batch_set_embed_rejects_wrong_embedding() -> Result<()> {
        let tensor = Tensor::zeros((2, 3, 4), DType::F32, &Device::Cpu)?;
        assert!(expect_batch_set_embed("x", &tensor, 4).is_ok());
        let err = expect_batch_set_embed("x", &tensor, 5).unwrap_err();
        assert!(err.to_string().contains("(batch, set, 5)"));
        Ok(())
    }

    #[test]
    fn trailing_dimension_mismatch_is_reported() -> Result<()> {
        let device = Device::Cpu;
        let q = Tensor::zeros((2, 3, 4), DType::F32, &device)?;
        let k = Tensor::zeros((2, 5, 6), DType::F32, &device)?;
        assert!(expect_same_last_dim("q", &q, "k", &k).is_err());
        assert!(expect_rank("q", &q, 3).is_ok());
        Ok(())
    }
}
