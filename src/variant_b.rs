//! Window-sum front end ("Variant B"): sums fixed-width windows of samples
//! to classify half-bit symbols, then pairs them up to recover full bits.
//!
//! Unlike [`crate::variant_a::GapDecoder`], this front end needs to look
//! ahead of the sample it is currently classifying, so incoming samples are
//! staged in a [`SampleRing`] instead of being folded into counters one at a
//! time. [`HalfBitBuffer`] plays the role `FrameBuffer` plays for the gap
//! decoder, but one stage earlier: it accumulates the half-bit symbols that
//! get resolved into full bits once a terminator pair is seen.

use crate::config::{samples_per_microsecond, WindowThresholds};
use crate::frame::{FrameAssembler, FrameBuffer};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    WaitForStart,
    PreDecode,
    Decode,
}

/// Unconsumed samples staged for lookahead, with a read cursor so the
/// front end can peek ahead of the sample it is currently classifying
/// without having to receive it all in one `process` call.
#[derive(Debug, Default)]
struct SampleRing {
    buf: Vec<u8>,
    pos: usize,
}

impl SampleRing {
    fn new() -> Self {
        SampleRing { buf: Vec::new(), pos: 0 }
    }

    fn extend(&mut self, samples: &[u8]) {
        self.buf.extend_from_slice(samples);
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn get(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.pos + offset).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Drops already-consumed samples so the backing buffer doesn't grow
    /// without bound across many `process` calls.
    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.drain(0..self.pos);
            self.pos = 0;
        }
    }
}

/// Half-bit symbols pending resolution into full bits.
#[derive(Debug, Default)]
struct HalfBitBuffer {
    bits: Vec<u8>,
}

impl HalfBitBuffer {
    fn new() -> Self {
        HalfBitBuffer { bits: Vec::new() }
    }

    fn push(&mut self, bit: u8) {
        self.bits.push(bit);
    }

    fn len(&self) -> usize {
        self.bits.len()
    }

    fn bits(&self) -> &[u8] {
        &self.bits
    }

    fn clear(&mut self) {
        self.bits.clear();
    }

    fn last_two_bit_zero(&self) -> bool {
        let n = self.bits.len();
        n > 2 && self.bits[n - 1] == 0 && self.bits[n - 2] == 0
    }

    fn last_two_bit_one(&self) -> bool {
        let n = self.bits.len();
        n > 2 && self.bits[n - 1] == 1 && self.bits[n - 2] == 1
    }

    fn remove_last(&mut self) {
        self.bits.pop();
    }

    fn remove_last_two(&mut self) {
        self.bits.pop();
        self.bits.pop();
    }
}

pub struct WindowDecoder {
    thresholds: WindowThresholds,
    samples_per_us: f64,
    state: WindowState,
    ring: SampleRing,
    halfbits: HalfBitBuffer,
    frame: FrameBuffer,
    assembler: FrameAssembler,
}

impl WindowDecoder {
    pub fn new(sample_rate_hz: f64) -> Result<Self> {
        let sps = samples_per_microsecond(sample_rate_hz)?;
        Ok(WindowDecoder {
            thresholds: WindowThresholds::new(sps),
            samples_per_us: sps,
            state: WindowState::WaitForStart,
            ring: SampleRing::new(),
            halfbits: HalfBitBuffer::new(),
            frame: FrameBuffer::new(),
            assembler: FrameAssembler::new(),
        })
    }

    pub fn required_inputs(&self, n_output_bytes: usize) -> usize {
        (n_output_bytes as f64 * 8.0 * self.samples_per_us) as usize
    }

    pub fn process(&mut self, samples: &[u8], out: &mut [u8]) -> usize {
        self.ring.extend(samples);
        let mut produced = 0usize;
        loop {
            let made_progress = match self.state {
                WindowState::WaitForStart => self.step_wait_for_start(),
                WindowState::PreDecode => self.step_pre_decode(),
                WindowState::Decode => {
                    self.step_decode(out, &mut produced);
                    true
                }
            };
            if !made_progress {
                break;
            }
        }
        self.ring.compact();
        produced
    }

    pub fn take_trace(&mut self) -> String {
        self.assembler.take_trace()
    }

    /// Sums the next `14 * bit_window` samples to look for the long silence
    /// plus short pulse pattern that marks the start of a frame. Returns
    /// `false` when the ring doesn't yet hold enough lookahead, so `process`
    /// can wait for the next call instead of spinning.
    fn step_wait_for_start(&mut self) -> bool {
        let bit_window = self.thresholds.bit_window as usize;
        let window = bit_window * 14;
        if self.ring.remaining() < window {
            return false;
        }

        let mut start_sum: u32 = 0;
        let mut start_sum_next: u32 = 0;
        for j in 0..window {
            let sample = self.ring.get(j).unwrap() as u32;
            start_sum += sample;
            if j < bit_window {
                start_sum_next += sample;
            }
        }

        let t = self.thresholds;
        let hit = start_sum >= t.start_min * 7
            && start_sum <= t.start_max * 7
            && start_sum_next >= t.start_min
            && start_sum_next <= t.start_max;

        if hit && self.ring.get(0) == Some(1) {
            log::debug!("start of frame: start_sum={start_sum} start_sum_next={start_sum_next}");
            self.ring.advance(bit_window * 2);
            self.state = WindowState::PreDecode;
        } else {
            self.ring.advance(1);
        }
        true
    }

    /// Classifies one half-bit window as a 1 or a 0 by its sample sum, with
    /// a resync scan when the window straddles a transition. Returns `false`
    /// when lookahead for that scan isn't available yet.
    fn step_pre_decode(&mut self) -> bool {
        let bit_window = self.thresholds.bit_window as usize;
        if self.ring.remaining() < bit_window + 1 {
            return false;
        }
        let t = self.thresholds;

        let mut sum: u32 = 0;
        for j in 0..bit_window {
            sum += self.ring.get(j).unwrap() as u32;
        }

        let mut advance = 1usize;

        if sum >= t.mean_window && sum < t.start_max {
            if self.halfbits.last_two_bit_one() {
                log::trace!("half-bit resync saw 1,1; discarding frame attempt");
                self.frame.clear();
                self.halfbits.clear();
                self.state = WindowState::WaitForStart;
                advance += bit_window - 1;
            } else {
                if sum < bit_window as u32 {
                    // The window only partially overlapped a high run.
                    // Faithful to the original's `x = sum` typo here: the
                    // scan always stops after a single peek rather than
                    // looping (see Decision 2 in SPEC_FULL.md).
                    let peek = self.ring.get(bit_window);
                    let x = if peek == Some(0) { 0 } else { bit_window - sum as usize };
                    advance += x + bit_window;
                } else {
                    advance += bit_window - 1;
                }
                log::trace!("half-bit 1");
                self.halfbits.push(1);
            }
        } else if self.halfbits.last_two_bit_zero() {
            if self.halfbits.len() % 2 == 0 {
                self.halfbits.remove_last_two();
            } else {
                self.halfbits.remove_last();
            }
            self.state = WindowState::Decode;
            advance += bit_window - 1;
        } else {
            if sum > 3 {
                let peek = self.ring.get(bit_window);
                let x = if peek == Some(1) { 0 } else { sum as usize };
                advance += x + bit_window;
            } else {
                advance += bit_window - 1;
            }
            log::trace!("half-bit 0");
            self.halfbits.push(0);
        }

        self.ring.advance(advance);
        true
    }

    /// Resolves the pending half-bit pairs into full bits and, if they form
    /// a coherent terminator, hands the frame to the assembler.
    fn step_decode(&mut self, out: &mut [u8], produced: &mut usize) {
        let halfbits: Vec<u8> = self.halfbits.bits().to_vec();
        self.halfbits.clear();

        if halfbits.len() >= 2 && halfbits[0] != halfbits[1] {
            let mut j = 0;
            while j < halfbits.len() {
                self.frame.push(halfbits[j]);
                j += 2;
            }
            let written = self.assembler.assemble(&mut self.frame, &mut out[*produced..]);
            *produced += written;
        } else {
            log::trace!("half-bit terminator inconsistent; discarding frame attempt");
        }

        self.state = WindowState::WaitForStart;
        self.ring.advance(1);
    }
}
