//! External coupling to the GPIO rotary-encoder/switch subsystem.
//!
//! The real hardware driver (pins, MCP23008 expander, emulator mode; see
//! `examples/original_source/zyncoder_test.c`) is an out-of-scope external
//! collaborator. The only thing the process callback needs from it is a
//! place to deposit a freshly-seen CC value, so it is expressed here as a
//! narrow trait rather than the callback reaching into the encoder
//! module's descriptor arrays directly.

/// Sink for CC values the callback observes, matching the original's
/// write into `zyncoders[j].value`/`subvalue` for every encoder bound to
/// that (channel, controller) pair.
pub trait OnCc: Send {
    fn on_cc(&mut self, channel: u8, controller: u8, value: u8);
}

/// Ticks-per-detent used to derive `subvalue` from a raw CC value, as in
/// the original `zyncoders[j].subvalue = value * ZYNCODER_TICKS_PER_RETENT`.
pub const TICKS_PER_RETENT: i32 = 4;

#[derive(Debug, Clone, Copy)]
struct EncoderBinding {
    channel: u8,
    controller: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct EncoderValue {
    value: u8,
    subvalue: i32,
}

/// Standalone in-memory implementation of `OnCc`, used when no real
/// rotary-encoder hardware is attached (tests, headless operation). Holds
/// up to 4 bindings, mirroring `MAX_NUM_ZYNCODERS` in the original
/// hardware library.
pub struct EncoderBank {
    bindings: [Option<EncoderBinding>; 4],
    values: [EncoderValue; 4],
}

impl EncoderBank {
    pub fn new() -> Self {
        Self {
            bindings: [None; 4],
            values: [EncoderValue::default(); 4],
        }
    }

    pub fn bind(&mut self, slot: usize, channel: u8, controller: u8) {
        self.bindings[slot] = Some(EncoderBinding { channel, controller });
    }

    pub fn value(&self, slot: usize) -> u8 {
        self.values[slot].value
    }

    pub fn subvalue(&self, slot: usize) -> i32 {
        self.values[slot].subvalue
    }
}

impl Default for EncoderBank {
    fn default() -> Self {
        Self::new()
    }
}

impl OnCc for EncoderBank {
    fn on_cc(&mut self, channel: u8, controller: u8, value: u8) {
        for (binding, slot) in self.bindings.iter().zip(self.values.iter_mut()) {
            if let Some(b) = binding {
                if b.channel == channel && b.controller == controller {
                    slot.value = value;
                    slot.subvalue = value as i32 * TICKS_PER_RETENT;
                }
            }
        }
    }
}

/// Discards every CC value. Used where no encoder coupling is wired up.
pub struct NullEncoderSink;

impl OnCc for NullEncoderSink {
    fn on_cc(&mut self, _channel: u8, _controller: u8, _value: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_encoder_tracks_cc_value() {
        let mut bank = EncoderBank::new();
        bank.bind(0, 2, 10);
        bank.on_cc(2, 10, 64);
        assert_eq!(bank.value(0), 64);
        assert_eq!(bank.subvalue(0), 64 * TICKS_PER_RETENT);
    }

    #[test]
    fn unmatched_cc_does_not_touch_other_slots() {
        let mut bank = EncoderBank::new();
        bank.bind(0, 2, 10);
        bank.on_cc(3, 11, 99);
        assert_eq!(bank.value(0), 0);
    }
}
