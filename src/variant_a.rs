//! Gap-based front end ("Variant A"): measures the widths of runs of ones
//! and zeros directly and classifies them with width thresholds.
//!
//! [`GapDecoder`] folds the run-measurement stage (SPEC_FULL.md §4.1) and the
//! bit-decoding state machine (§4.2) into one type, since both stages share
//! the same `count_one`/`count_zero` run counters and neither is meaningful
//! standalone — exactly as in the system this crate is modeled on.

use crate::config::{samples_per_microsecond, GapThresholds};
use crate::frame::{FrameAssembler, FrameBuffer};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapState {
    WaitForStart,
    LastBitZero,
    LastBitOne,
}

pub struct GapDecoder {
    thresholds: GapThresholds,
    samples_per_us: f64,
    state: GapState,
    count_one: u32,
    count_zero: u32,
    frame: FrameBuffer,
    assembler: FrameAssembler,
}

impl GapDecoder {
    pub fn new(sample_rate_hz: f64) -> Result<Self> {
        let sps = samples_per_microsecond(sample_rate_hz)?;
        Ok(GapDecoder {
            thresholds: GapThresholds::new(sps),
            samples_per_us: sps,
            state: GapState::WaitForStart,
            count_one: 0,
            count_zero: 0,
            frame: FrameBuffer::new(),
            assembler: FrameAssembler::new(),
        })
    }

    /// `n_in = 8 * n_out * samples-per-microsecond`.
    pub fn required_inputs(&self, n_output_bytes: usize) -> usize {
        (n_output_bytes as f64 * 8.0 * self.samples_per_us) as usize
    }

    pub fn process(&mut self, samples: &[u8], out: &mut [u8]) -> usize {
        let mut produced = 0usize;
        for &sample in samples {
            let bit = sample != 0;
            match self.state {
                GapState::WaitForStart => self.step_wait_for_start(bit),
                GapState::LastBitZero => self.step_last_bit_zero(bit, out, &mut produced),
                GapState::LastBitOne => self.step_last_bit_one(bit, out, &mut produced),
            }
        }
        produced
    }

    pub fn take_trace(&mut self) -> String {
        self.assembler.take_trace()
    }

    fn finish_frame(&mut self, out: &mut [u8], produced: &mut usize) {
        let written = self.assembler.assemble(&mut self.frame, &mut out[*produced..]);
        *produced += written;
        self.state = GapState::WaitForStart;
    }

    fn step_wait_for_start(&mut self, bit: bool) {
        let t = self.thresholds;
        if bit {
            if self.count_zero > 0 {
                if self.count_zero >= t.start_min && self.count_zero <= t.start_max {
                    if self.count_one > t.start_min {
                        log::debug!(
                            "start of frame: count_zero={} count_one={}",
                            self.count_zero,
                            self.count_one
                        );
                        self.state = GapState::LastBitOne;
                    }
                    // Reset regardless of whether the start actually fired —
                    // this hysteresis is intentional, see Decision 1.
                    self.count_one = 0;
                } else if self.count_zero < t.gap_min {
                    log::trace!("folding short gap of {} into carrier", self.count_zero);
                    self.count_one += self.count_zero;
                    self.count_zero = 0;
                } else {
                    self.count_zero = 0;
                }
            }
            self.count_one += 1;
        } else {
            self.count_zero += 1;
        }
    }

    fn step_last_bit_zero(&mut self, bit: bool, out: &mut [u8], produced: &mut usize) {
        let t = self.thresholds;
        if bit {
            if self.count_zero > 0 {
                if self.count_zero > t.end_threshold && !self.frame.is_empty() {
                    self.finish_frame(out, produced);
                } else if self.count_zero >= t.gap_min && self.count_zero <= t.gap_max {
                    if self.count_one > t.long_threshold {
                        log::trace!("decoded bit 1 (LastBitZero)");
                        self.frame.push(1);
                        self.state = GapState::LastBitOne;
                    } else if self.count_one > t.short_threshold {
                        log::trace!("decoded bit 0 (LastBitZero)");
                        self.frame.push(0);
                        self.state = GapState::LastBitZero;
                        self.count_zero = 0;
                    }
                    self.count_one = 0;
                } else if self.count_zero < t.gap_min {
                    self.count_one += self.count_zero;
                    self.count_zero = 0;
                }
            }
            self.count_one += 1;
        } else if self.count_zero > t.end_threshold && !self.frame.is_empty() {
            if self.count_one > t.long_threshold {
                self.frame.push(1);
            }
            self.finish_frame(out, produced);
        } else {
            self.count_zero += 1;
        }
    }

    fn step_last_bit_one(&mut self, bit: bool, out: &mut [u8], produced: &mut usize) {
        let t = self.thresholds;
        // Asymmetric vs `step_last_bit_zero`: here the end-of-frame check is
        // evaluated unconditionally, before branching on the sample's
        // polarity. This mirrors the source system's control flow exactly
        // rather than "fixing" it into symmetry — see Decision 1 in
        // SPEC_FULL.md.
        if self.count_zero > t.end_threshold && !self.frame.is_empty() {
            self.finish_frame(out, produced);
            return;
        }

        if !bit {
            if self.count_one > 0 {
                if self.count_one >= t.gap_min && self.count_one <= t.gap_max {
                    if self.count_zero > t.long_threshold {
                        log::trace!("decoded bit 0 (LastBitOne)");
                        self.frame.push(0);
                        self.state = GapState::LastBitZero;
                    } else if self.count_zero > t.short_threshold {
                        log::trace!("decoded bit 1 (LastBitOne)");
                        self.frame.push(1);
                        self.state = GapState::LastBitOne;
                        self.count_one = 0;
                    }
                    self.count_zero = 0;
                } else if self.count_one < t.gap_min {
                    self.count_zero += self.count_one;
                    self.count_one = 0;
                }
            }
            self.count_zero += 1;
        } else {
            self.count_one += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(n: usize) -> Vec<u8> {
        vec![1; n]
    }
    fn zeros(n: usize) -> Vec<u8> {
        vec![0; n]
    }

    #[test]
    fn rejects_bad_sample_rate() {
        assert_eq!(
            GapDecoder::new(0.0),
            Err(Error::InvalidSampleRate { sample_rate_hz: 0.0 })
        );
    }

    #[test]
    fn empty_carrier_produces_nothing() {
        let mut decoder = GapDecoder::new(1_000_000.0).unwrap();
        let samples = ones(200);
        let mut out = [0u8; 32];
        let n = decoder.process(&samples, &mut out);
        assert_eq!(n, 0);
        assert_eq!(decoder.take_trace(), "");
    }

    #[test]
    fn single_frame_with_two_decoded_bits() {
        // Start gap must fall in [start_min, start_max] = [8, 12] at 1 MHz
        // (see examples/original_source/test.cpp's own sample vector, which
        // uses the same 9-sample gap for this). A run of 11 ones after the
        // second bit exceeds gap_max so the tail doesn't get misread as a
        // third bit, letting the trailing silence end the frame cleanly.
        let mut decoder = GapDecoder::new(1_000_000.0).unwrap();
        let mut samples = Vec::new();
        samples.extend(ones(16));
        samples.extend(zeros(9));
        samples.extend(ones(9));
        samples.extend(zeros(5));
        samples.extend(ones(11));
        samples.extend(zeros(20));

        let mut out = [0u8; 32];
        let n = decoder.process(&samples, &mut out);
        assert_eq!(n, 1);
        assert_eq!(out[0], 0x02);
        let trace = decoder.take_trace();
        assert!(trace.starts_with("Tag ->"));
        assert!(trace.ends_with('\n'));
    }

    #[test]
    fn noise_absorption_behaves_like_clean_carrier() {
        // A single-sample zero run is below gap_min (2 at 1 MHz) and folds
        // into the surrounding carrier rather than being read as a symbol.
        let mut decoder = GapDecoder::new(1_000_000.0).unwrap();
        let mut samples = Vec::new();
        samples.extend(ones(16));
        samples.push(0);
        samples.extend(ones(3));
        samples.extend(zeros(4));
        samples.extend(ones(4));
        samples.extend(zeros(16));

        let mut out = [0u8; 32];
        let n = decoder.process(&samples, &mut out);
        // The noise-folded run means no start-of-frame ever fires here.
        assert_eq!(n, 0);
    }

    #[test]
    fn truncated_byte_is_marked_broken_in_trace() {
        // Same grounded start gap as above, but the carrier run following
        // the second bit (9 samples) stays inside [gap_min, gap_max] so a
        // third bit gets decoded before the trailing silence ends the
        // frame at 3 bits total, short of a full byte.
        let mut decoder = GapDecoder::new(1_000_000.0).unwrap();
        let mut samples = Vec::new();
        samples.extend(ones(16));
        samples.extend(zeros(9));
        samples.extend(ones(9));
        samples.extend(zeros(5));
        samples.extend(ones(9));
        samples.extend(zeros(20));

        let mut out = [0u8; 32];
        let n = decoder.process(&samples, &mut out);
        assert!(n > 0);
        assert_eq!(out[0], 0x06);
        assert!(decoder.take_trace().contains('\\'));
    }

    #[test]
    fn cross_call_continuity_matches_single_call() {
        let mut samples = Vec::new();
        samples.extend(ones(16));
        samples.extend(zeros(4));
        samples.extend(ones(4));
        samples.extend(zeros(4));
        samples.extend(ones(4));
        samples.extend(zeros(16));

        let mut whole = GapDecoder::new(1_000_000.0).unwrap();
        let mut out_whole = [0u8; 32];
        let n_whole = whole.process(&samples, &mut out_whole);
        let trace_whole = whole.take_trace();

        let mut split = GapDecoder::new(1_000_000.0).unwrap();
        let mut out_split = [0u8; 32];
        let mut n_split = 0;
        let (first, second) = samples.split_at(samples.len() / 2);
        n_split += split.process(first, &mut out_split[n_split..]);
        n_split += split.process(second, &mut out_split[n_split..]);
        let trace_split = split.take_trace();

        assert_eq!(n_whole, n_split);
        assert_eq!(&out_whole[..n_whole], &out_split[..n_split]);
        assert_eq!(trace_whole, trace_split);
    }

    #[test]
    fn required_inputs_matches_forecast_formula() {
        let decoder = GapDecoder::new(1_000_000.0).unwrap();
        assert_eq!(decoder.required_inputs(1), 8);
        assert_eq!(decoder.required_inputs(10), 80);
    }
}
