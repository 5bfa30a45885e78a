use thiserror::Error;

/// The only caller-visible failure mode: a bad construction argument.
///
/// Every other irregularity this crate encounters (framing errors, parity
/// mismatches, frame-buffer overflow) is recovered internally and surfaced
/// through the trace text instead — see the module docs on `frame`.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum Error {
    #[error("invalid sample rate {sample_rate_hz} Hz: must be positive and finite")]
    InvalidSampleRate { sample_rate_hz: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
