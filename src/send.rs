//! Send helpers: pack a MIDI status+data triple and push it onto the
//! outbound ring. Grounded on `zynmidi_send_*` in
//! `examples/original_source/zynmidirouter.c`.

use crate::event::split_pitch_bend;
use crate::filter::FilterState;
use crate::ring::{ByteSink, OutboundRing};
#[cfg(test)]
use crate::ring::ByteSource;

/// These take `&mut impl ByteSink` rather than a concrete ring so they
/// serve both the RT callback's own outbound ring and the control
/// thread's `OutboundProducer` half of the injection ring (`engine.rs`).

pub fn send_note_off(ring: &mut impl ByteSink, chan: u8, note: u8, vel: u8) -> bool {
    ring.write(&[0x80 | (chan & 0x0F), note, vel])
}

pub fn send_note_on(ring: &mut impl ByteSink, chan: u8, note: u8, vel: u8) -> bool {
    ring.write(&[0x90 | (chan & 0x0F), note, vel])
}

pub fn send_cc(ring: &mut impl ByteSink, chan: u8, ctrl: u8, val: u8) -> bool {
    ring.write(&[0xB0 | (chan & 0x0F), ctrl, val])
}

pub fn send_program_change(ring: &mut impl ByteSink, chan: u8, program: u8) -> bool {
    ring.write(&[0xC0 | (chan & 0x0F), program])
}

pub fn send_pitchbend_change(ring: &mut impl ByteSink, chan: u8, pb: u16) -> bool {
    let (lsb, msb) = split_pitch_bend(pb);
    ring.write(&[0xE0 | (chan & 0x0F), lsb, msb])
}

/// `zynmidi_send_master_ccontrol_change`: forwards to the master channel
/// if one is configured, otherwise no-ops and reports failure. This
/// resolves the spec's open question about the unset-master case: the
/// source function has no `return` when the master channel is unset
/// (undefined behavior in C); here that path is an explicit `false`.
pub fn send_master_cc(ring: &mut impl ByteSink, filter: &FilterState, ctrl: u8, val: u8) -> bool {
    match filter.master_chan() {
        Some(chan) => send_cc(ring, chan, ctrl, val),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_cc_fails_when_unset() {
        let mut ring = OutboundRing::new(32);
        let filter = FilterState::new();
        assert!(!send_master_cc(&mut ring, &filter, 7, 100));
        assert_eq!(ring.occupied_len(), 0);
    }

    #[test]
    fn master_cc_forwards_when_set() {
        let mut ring = OutboundRing::new(32);
        let mut filter = FilterState::new();
        filter.set_master_chan(Some(2)).unwrap();
        assert!(send_master_cc(&mut ring, &filter, 7, 100));
        let mut buf = [0u8; 3];
        ring.read_into(&mut buf);
        assert_eq!(buf, [0xB2, 7, 100]);
    }

    #[test]
    fn pitchbend_send_splits_lsb_msb() {
        let mut ring = OutboundRing::new(32);
        assert!(send_pitchbend_change(&mut ring, 0, 8256));
        let mut buf = [0u8; 3];
        ring.read_into(&mut buf);
        assert_eq!(buf, [0xE0, 0x40, 0x40]);
    }

    #[test]
    fn sends_work_against_a_split_producer_too() {
        let (mut producer, mut consumer) = OutboundRing::new(32).split();
        assert!(send_note_on(&mut producer, 2, 60, 100));
        let mut buf = [0u8; 3];
        assert_eq!(consumer.read_into(&mut buf), 3);
        assert_eq!(buf, [0x92, 60, 100]);
    }
}
