//! Baseband decoder for ISO/IEC 14443 Type A tag-to-reader traffic.
//!
//! Two front ends decode the same modified-Miller line code from a raw,
//! per-sample bitstream: [`variant_a::GapDecoder`] measures run widths
//! directly, [`variant_b::WindowDecoder`] sums fixed windows and resolves
//! half-bit symbols. Both feed a shared [`frame`] stage that packs decoded
//! bits into bytes, checks parity, and renders a human-readable trace.

pub mod config;
pub mod error;
pub mod frame;
pub mod variant_a;
pub mod variant_b;

pub use error::{Error, Result};
pub use variant_a::GapDecoder;
pub use variant_b::WindowDecoder;
