//! Portable, exact implementation of scaled dot-product attention.
//!
//! This path favours clarity over performance and is the kernel used by the
//! multihead layer.

pub mod exact;

pub use exact::ScaledDotProduct;
