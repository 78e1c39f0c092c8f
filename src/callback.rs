//! The real-time process callback: input phase (filter, transpose, tune,
//! capture, enqueue) and output phase (drain the outbound ring to the
//! audio-server output port). Grounded on `jack_process` in
//! `examples/original_source/zynmidirouter.c`, restructured around the
//! `MidiSource`/`MidiSink` trait seam (modeled on the `Plugin` trait in
//! `src/plugin/mod.rs`) so it can be driven by an in-memory fake in tests
//! instead of a live audio server.
//!
//! Nothing here allocates, locks, or blocks: both phases only touch
//! stack buffers, the rings, `FilterState` (read-only, a published
//! snapshot), and `RtMemo` (owned outright).

use crate::encoder::OnCc;
use crate::event::{self, EventClass, ParsedEvent};
use crate::filter::{FilterState, RtMemo};
use crate::ring::{ByteSource, CaptureSink, OutboundRing};
#[cfg(test)]
use crate::ring::CaptureRing;

/// A source of inbound MIDI events for one audio period.
pub trait MidiSource {
    fn len(&self) -> usize;
    fn event(&self, index: usize) -> &[u8];
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sink for outbound MIDI events for one audio period.
pub trait MidiSink {
    /// Reserve space for and write one message. Returns `false` if the
    /// port has no room left this period.
    fn write(&mut self, bytes: &[u8]) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFault {
    /// More input events arrived this period than the port could hold.
    InputOverflow,
    /// More output events were queued this period than the port could hold.
    OutputOverflow,
}

fn pack_gui_word(status: u8, d1: u8, d2: u8) -> u32 {
    ((status as u32) << 16) | ((d1 as u32) << 8) | d2 as u32
}

/// Drain `source`, rewrite each event through the filter, and enqueue the
/// result(s) onto `outbound`. `frame_limit` bounds how many events a
/// single period may process (mirrors the original's "TOO MANY EVENTS"
/// guard).
pub fn input_phase(
    filter: &FilterState,
    memo: &mut RtMemo,
    outbound: &mut OutboundRing,
    capture: &mut impl CaptureSink,
    encoder: &mut dyn OnCc,
    source: &impl MidiSource,
    frame_limit: usize,
) -> Result<(), CallbackFault> {
    for i in 0..source.len() {
        if i > frame_limit {
            log::error!("midi input: too many events this period");
            return Err(CallbackFault::InputOverflow);
        }

        let raw = source.event(i);
        let Some(parsed) = event::parse_input(raw) else {
            continue; // SysEx or an unrecognized status: pass neither through nor filter it
        };

        // GUI pre-capture: Control-Change, before any rewriting.
        if parsed.class == EventClass::ControlChange {
            let d1 = raw.get(1).copied().unwrap_or(0) & 0x7F;
            let d2 = raw.get(2).copied().unwrap_or(0) & 0x7F;
            capture.write(pack_gui_word(raw[0], d1, d2));
        }

        let Some((class, chan, mut buf, len)) = remap(filter, &parsed, raw) else {
            continue; // Drop
        };

        if class == EventClass::ControlChange {
            memo.record_last_ctrl(chan, buf[1], buf[2]);
            encoder.on_cc(chan, buf[1], buf[2]);
        } else if class.is_note() {
            let offset = filter.get_transpose(chan).unwrap_or(0);
            if offset != 0 {
                let note = buf[1] as i32 + offset;
                if !(0..=127).contains(&note) {
                    continue; // transposed out of range: drop entirely
                }
                buf[1] = note as u8;
            }
        }

        if filter.tuning_pitchbend().is_some() {
            if class == EventClass::NoteOn {
                let pb = memo.last_pb(chan);
                let tuned = filter.tuned_pitchbend(pb);
                let (lsb, msb) = event::split_pitch_bend(tuned);
                outbound.write(&[0xE0 | (chan & 0x0F), lsb, msb]);
            } else if class == EventClass::PitchBend {
                let pb = event::pitch_bend_14(buf[1], buf[2]);
                memo.set_last_pb(chan, pb);
                let tuned = filter.tuned_pitchbend(pb);
                let (lsb, msb) = event::split_pitch_bend(tuned);
                buf[1] = lsb;
                buf[2] = msb;
            }
        }

        if matches!(
            class,
            EventClass::NoteOff | EventClass::NoteOn | EventClass::ProgramChange
        ) {
            capture.write(pack_gui_word(buf[0], buf[1], buf[2]));
        }

        outbound.write(&buf[..len]);
    }
    Ok(())
}

/// Apply the remap table to one parsed event. Returns `None` if the cell
/// says Drop. On success, returns `(final_class, final_channel, wire_bytes, len)`.
fn remap(filter: &FilterState, parsed: &ParsedEvent, raw: &[u8]) -> Option<(EventClass, u8, [u8; 3], usize)> {
    let bucket_class = parsed.class;
    let cell = filter
        .get_map((bucket_class, parsed.channel, parsed.num))
        .unwrap_or(crate::event::Event::pass_through(parsed.channel, parsed.num));

    if cell.class == EventClass::Drop {
        return None;
    }

    if cell.class == EventClass::PassThrough {
        // No rewrite: forward the original bytes untouched.
        let mut buf = [0u8; 3];
        let len = raw.len().min(3);
        buf[..len].copy_from_slice(&raw[..len]);
        return Some((parsed.class, parsed.channel, buf, len));
    }

    // Substitute (concrete class) or Swap.
    let final_class = if cell.class == EventClass::Swap {
        parsed.class
    } else {
        cell.class
    };
    let final_chan = cell.channel;
    let status = (final_class.to_nibble().unwrap_or(parsed.class.to_nibble().unwrap_or(0x8)) << 4) | (final_chan & 0x0F);

    let (buf, len) = match cell.class {
        EventClass::ProgramChange | EventClass::ChannelPressure => ([status, parsed.val, 0], 2),
        EventClass::PitchBend => ([status, 0, parsed.val], 3),
        _ => ([status, cell.datum, parsed.val], 3),
    };
    Some((final_class, final_chan, buf, len))
}

/// Drain a framed byte ring into `sink`, sizing each message per the
/// output-phase rules. `frame_limit` bounds events per period. Used both
/// for the callback's own filtered-output ring and for the control
/// thread's injection ring.
pub fn output_phase(outbound: &mut impl ByteSource, sink: &mut impl MidiSink, frame_limit: usize) -> Result<(), CallbackFault> {
    let mut scratch = [0u8; OutboundRing::MAX_DRAIN];
    let n = outbound.read_into(&mut scratch);
    let mut pos = 0;
    let mut count = 0usize;
    while pos < n {
        let status = scratch[pos];
        let len = event::output_message_len(status);
        if pos + len > n {
            break; // truncated message, nothing more to do this period
        }
        if count > frame_limit {
            log::error!("midi output: too many events this period");
            return Err(CallbackFault::OutputOverflow);
        }
        if !sink.write(&scratch[pos..pos + len]) {
            log::warn!("midi output port out of space, dropping event");
        }
        pos += len;
        count += 1;
    }
    Ok(())
}

impl OutboundRing {
    /// Upper bound on bytes drained in a single period: the whole ring.
    pub const MAX_DRAIN: usize = crate::ring::OUTBOUND_RING_CAPACITY;
}

#[cfg(test)]
pub struct FakeSource {
    events: Vec<Vec<u8>>,
}

#[cfg(test)]
impl FakeSource {
    pub fn new(events: Vec<Vec<u8>>) -> Self {
        Self { events }
    }
}

#[cfg(test)]
impl MidiSource for FakeSource {
    fn len(&self) -> usize {
        self.events.len()
    }
    fn event(&self, index: usize) -> &[u8] {
        &self.events[index]
    }
}

#[cfg(test)]
pub struct FakeSink {
    pub written: Vec<Vec<u8>>,
}

#[cfg(test)]
impl FakeSink {
    pub fn new() -> Self {
        Self { written: Vec::new() }
    }
}

#[cfg(test)]
impl MidiSink for FakeSink {
    fn write(&mut self, bytes: &[u8]) -> bool {
        self.written.push(bytes.to_vec());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::NullEncoderSink;

    fn run_one(
        filter: &FilterState,
        events: Vec<Vec<u8>>,
    ) -> (Vec<Vec<u8>>, CaptureRing) {
        let mut memo = RtMemo::new();
        let mut outbound = OutboundRing::new(4096);
        let mut capture = CaptureRing::new();
        let mut encoder = NullEncoderSink;
        let source = FakeSource::new(events);
        input_phase(filter, &mut memo, &mut outbound, &mut capture, &mut encoder, &source, 64).unwrap();
        let mut sink = FakeSink::new();
        output_phase(&mut outbound, &mut sink, 64).unwrap();
        (sink.written, capture)
    }

    #[test]
    fn drop_suppresses_forward_but_not_pre_capture() {
        let mut filter = FilterState::new();
        filter.set_cc_ignore(0, 7).unwrap();
        let (out, mut capture) = run_one(&filter, vec![vec![0xB0, 7, 99]]);
        assert!(out.is_empty());
        // pre-capture still fires for CC before the drop check
        assert_eq!(capture.read(), pack_gui_word(0xB0, 7, 99));
    }

    #[test]
    fn transpose_boundary_drops_out_of_range_note() {
        let mut filter = FilterState::new();
        filter.set_transpose(3, 60).unwrap();
        let (out, _) = run_one(&filter, vec![vec![0x93, 68, 100]]);
        assert!(out.is_empty());
        let (out, _) = run_one(&filter, vec![vec![0x93, 67, 100]]);
        assert_eq!(out, vec![vec![0x93, 127, 100]]);
    }

    #[test]
    fn tuning_caches_pitch_bend_and_precedes_note_on() {
        let mut filter = FilterState::new();
        filter.set_tuning_freq(442.0).unwrap();
        let (out, _) = run_one(&filter, vec![vec![0xE0, 0x40, 0x40]]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][0], 0xE0);

        let (out, _) = run_one(&filter, vec![vec![0xE0, 0x40, 0x40], vec![0x90, 60, 100]]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0][0], 0xE0); // tuned pitch bend from the PB event itself
        assert_eq!(out[1][0], 0xE0); // inserted pitch bend ahead of the note-on
        assert_eq!(out[2], vec![0x90, 60, 100]);
    }

    #[test]
    fn cc_swap_commutes_through_the_callback() {
        let mut filter = FilterState::new();
        filter.set_cc_swap(0, 7, 1, 7).unwrap();
        let (out, _) = run_one(&filter, vec![vec![0xB0, 7, 50]]);
        assert_eq!(out, vec![vec![0xB1, 7, 50]]);
        let (out, _) = run_one(&filter, vec![vec![0xB1, 7, 60]]);
        assert_eq!(out, vec![vec![0xB0, 7, 60]]);
    }

    #[test]
    fn class_preserving_swap_keeps_original_class() {
        let mut filter = FilterState::new();
        filter
            .set_map(
                (EventClass::KeyPressure, 0, 40),
                crate::event::Event::swap(1, 50),
            )
            .unwrap();
        let (out, _) = run_one(&filter, vec![vec![0xA0, 40, 90]]);
        assert_eq!(out, vec![vec![0xA1, 50, 90]]);
    }

    #[test]
    fn sysex_is_skipped_entirely() {
        let filter = FilterState::new();
        let (out, _) = run_one(&filter, vec![vec![0xF0, 1, 2, 3]]);
        assert!(out.is_empty());
    }
}
