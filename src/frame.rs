//! Shared frame buffer and frame-assembly stage.
//!
//! Both decoder variants feed their decoded bits into a [`FrameBuffer`] and,
//! once a frame ends, hand it to a [`FrameAssembler`] which packs the bits
//! into bytes, checks parity, and renders the trace line described in the
//! base specification's external-interfaces section.

const FRAME_CAPACITY: usize = 1000;

/// Decoded bits accumulated for the frame currently in progress.
///
/// Pushes past [`FRAME_CAPACITY`] are silently dropped rather than panicking
/// or reallocating without bound — a pathologically long frame is truncated,
/// not fatal.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    bits: Vec<u8>,
    capacity_warned: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            bits: Vec::with_capacity(FRAME_CAPACITY),
            capacity_warned: false,
        }
    }

    pub fn push(&mut self, bit: u8) {
        if self.bits.len() < FRAME_CAPACITY {
            self.bits.push(bit);
        } else if !self.capacity_warned {
            log::warn!("frame buffer reached {FRAME_CAPACITY}-bit capacity; dropping further bits");
            self.capacity_warned = true;
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn clear(&mut self) {
        self.bits.clear();
        self.capacity_warned = false;
    }
}

/// XOR-reduction of a byte's 8 bits; this is the even-parity check value used
/// by the frame assembler.
pub fn compute_even_parity(byte: u8) -> u8 {
    (0..8).fold(0u8, |parity, i| parity ^ ((byte >> i) & 1))
}

/// Packs decoded bits into bytes, checks parity, and renders the trace.
///
/// The "last-known parity mode" flag is owned here because it must persist
/// across frames whose bit count is a multiple of 72 (see the base
/// specification's frame-assembly section). It starts in parity-checked mode
/// before any frame has been decoded.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    no_parity_mode: bool,
    trace: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            no_parity_mode: false,
            trace: String::new(),
        }
    }

    /// Assembles `frame` into bytes, writing as many as fit into `out` and
    /// returning that count. The frame buffer is cleared on return. Does
    /// nothing (returns 0) if the frame is empty.
    pub fn assemble(&mut self, frame: &mut FrameBuffer, out: &mut [u8]) -> usize {
        let decoded_bit_num = frame.len();
        if decoded_bit_num == 0 {
            return 0;
        }

        // "Last known mode" is kept for lengths that are a multiple of 72;
        // otherwise it's derived fresh from the bit count (see Decision 3 in
        // SPEC_FULL.md for the startup default).
        if decoded_bit_num % 72 != 0 {
            self.no_parity_mode = decoded_bit_num % 9 != 0 && decoded_bit_num % 8 == 0;
        }
        let no_parity_mode = self.no_parity_mode;

        let bits = frame.bits();
        let mut line = String::from("Tag ->");
        let mut in_bit = 0usize;
        let mut out_bit = 0u32;
        let mut cur_byte: u8 = 0;
        let mut parity_ok = false;
        let mut bytes_written = 0usize;

        while in_bit < decoded_bit_num {
            cur_byte |= bits[in_bit] << out_bit;
            in_bit += 1;
            out_bit += 1;

            if !no_parity_mode && out_bit == 8 && in_bit < decoded_bit_num {
                let parity_bit = bits[in_bit];
                let expected = if parity_bit == 0 { 1 } else { 0 };
                parity_ok = compute_even_parity(cur_byte) == expected;
                in_bit += 1;
            }

            if out_bit == 8 || in_bit == decoded_bit_num {
                let broken = out_bit < 8 || (decoded_bit_num == 8 && !no_parity_mode);
                if decoded_bit_num == 7 {
                    line.push_str(&format!(" [{cur_byte:02X}]"));
                } else if broken {
                    line.push_str(&format!(" /{cur_byte:02X}\\"));
                    log::warn!("truncated byte in frame of {decoded_bit_num} bits");
                } else if parity_ok || no_parity_mode {
                    line.push_str(&format!("  {cur_byte:02X} "));
                } else {
                    line.push_str(&format!(" ({cur_byte:02X})"));
                    log::warn!("parity check failed for byte {cur_byte:#04x}");
                }

                if bytes_written < out.len() {
                    out[bytes_written] = cur_byte;
                    bytes_written += 1;
                }

                out_bit = 0;
                cur_byte = 0;
            }
        }

        if no_parity_mode {
            line.push_str(" (No parity)");
        }
        line.push('\n');

        log::info!("{}", line.trim_end());
        self.trace.push_str(&line);
        frame.clear();

        bytes_written
    }

    /// Drains the trace text accumulated since the last call.
    pub fn take_trace(&mut self) -> String {
        std::mem::take(&mut self.trace)
    }
}
