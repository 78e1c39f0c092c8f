//! Owns the live filter configuration, the GUI capture consumer, and the
//! JACK client handle; exposes the control-thread configuration API from
//! §6 of the design. Bring-up either fully succeeds or tears everything
//! back down — no partial initialization survives, grounded on the
//! teacher's `main.rs` shutdown-order comment ("stop audio first ... then
//! drop MIDI connections").

use crate::config::Config;
use crate::encoder::OnCc;
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventClass};
use crate::filter::FilterState;
use crate::jack_client::{self, JackHandle};
use crate::ring::{CaptureRing, OutboundProducer};
use crate::send;

fn ok_or_full(sent: bool) -> EngineResult<()> {
    if sent {
        Ok(())
    } else {
        Err(EngineError::RingFull)
    }
}

pub struct Engine {
    handle: JackHandle,
    capture: crate::ring::CaptureConsumer,
    inject: OutboundProducer,
}

impl Engine {
    /// Bring up the JACK client with a fresh, identity-initialized filter.
    pub fn start(config: &Config, encoder: Box<dyn OnCc>) -> EngineResult<Self> {
        let (producer, consumer) = CaptureRing::new().split();
        let (handle, inject) = jack_client::start(config, FilterState::new(), producer, encoder)?;
        Ok(Self {
            handle,
            capture: consumer,
            inject,
        })
    }

    /// Poll the GUI capture ring. Returns 0 when empty.
    pub fn read_zynmidi(&mut self) -> u32 {
        self.capture.read()
    }

    /// `zynmidi_send_note_off`.
    pub fn send_note_off(&mut self, chan: u8, note: u8, vel: u8) -> EngineResult<()> {
        ok_or_full(send::send_note_off(&mut self.inject, chan, note, vel))
    }

    /// `zynmidi_send_note_on`.
    pub fn send_note_on(&mut self, chan: u8, note: u8, vel: u8) -> EngineResult<()> {
        ok_or_full(send::send_note_on(&mut self.inject, chan, note, vel))
    }

    /// `zynmidi_send_ccontrol_change`.
    pub fn send_cc(&mut self, chan: u8, ctrl: u8, val: u8) -> EngineResult<()> {
        ok_or_full(send::send_cc(&mut self.inject, chan, ctrl, val))
    }

    /// `zynmidi_send_program_change`.
    pub fn send_program_change(&mut self, chan: u8, program: u8) -> EngineResult<()> {
        ok_or_full(send::send_program_change(&mut self.inject, chan, program))
    }

    /// `zynmidi_send_pitchbend_change`.
    pub fn send_pitchbend_change(&mut self, chan: u8, pb: u16) -> EngineResult<()> {
        ok_or_full(send::send_pitchbend_change(&mut self.inject, chan, pb))
    }

    /// `zynmidi_send_master_ccontrol_change`: forwards to the master
    /// channel if one is configured, otherwise no-ops without touching
    /// the ring.
    pub fn send_master_cc(&mut self, ctrl: u8, val: u8) -> EngineResult<()> {
        let filter = self.snapshot();
        if filter.master_chan().is_none() {
            return Ok(());
        }
        ok_or_full(send::send_master_cc(&mut self.inject, &filter, ctrl, val))
    }

    fn snapshot(&self) -> FilterState {
        (**self.handle.filter_handle().load()).clone()
    }

    fn try_update(&self, f: impl FnOnce(&mut FilterState) -> EngineResult<()>) -> EngineResult<()> {
        let mut next = self.snapshot();
        f(&mut next)?;
        self.handle.publish(next);
        Ok(())
    }

    pub fn set_master_chan(&self, chan: Option<u8>) -> EngineResult<()> {
        self.try_update(|f| f.set_master_chan(chan))
    }

    pub fn master_chan(&self) -> Option<u8> {
        self.snapshot().master_chan()
    }

    pub fn set_tuning_freq(&self, freq_hz: f64) -> EngineResult<()> {
        self.try_update(|f| f.set_tuning_freq(freq_hz))
    }

    pub fn tuning_pitchbend(&self) -> Option<u16> {
        self.snapshot().tuning_pitchbend()
    }

    pub fn set_transpose(&self, chan: u8, offset: i32) -> EngineResult<()> {
        self.try_update(|f| f.set_transpose(chan, offset))
    }

    pub fn get_transpose(&self, chan: u8) -> EngineResult<i32> {
        self.snapshot().get_transpose(chan)
    }

    pub fn set_event_map(&self, from: (EventClass, u8, u8), to: Event) -> EngineResult<()> {
        self.try_update(|f| f.set_map(from, to))
    }

    pub fn set_event_ignore(&self, from: (EventClass, u8, u8)) -> EngineResult<()> {
        self.try_update(|f| f.set_ignore(from))
    }

    pub fn get_event_map(&self, from: (EventClass, u8, u8)) -> EngineResult<Event> {
        self.snapshot().get_map(from)
    }

    pub fn del_event_map(&self, from: (EventClass, u8, u8)) -> EngineResult<()> {
        self.try_update(|f| f.del_map(from))
    }

    pub fn reset_event_map(&self) -> EngineResult<()> {
        self.try_update(|f| {
            f.reset_all();
            Ok(())
        })
    }

    pub fn set_cc_map(&self, chan_from: u8, num_from: u8, chan_to: u8, num_to: u8) -> EngineResult<()> {
        self.try_update(|f| f.set_cc_map(chan_from, num_from, chan_to, num_to))
    }

    pub fn set_cc_ignore(&self, chan: u8, num: u8) -> EngineResult<()> {
        self.try_update(|f| f.set_cc_ignore(chan, num))
    }

    pub fn get_cc_map(&self, chan: u8, num: u8) -> EngineResult<Event> {
        self.snapshot().get_cc_map(chan, num)
    }

    pub fn del_cc_map(&self, chan: u8, num: u8) -> EngineResult<()> {
        self.try_update(|f| f.del_cc_map(chan, num))
    }

    pub fn reset_cc_map(&self) -> EngineResult<()> {
        self.try_update(|f| {
            f.reset_cc_map();
            Ok(())
        })
    }

    pub fn set_cc_swap(&self, chan_from: u8, num_from: u8, chan_to: u8, num_to: u8) -> EngineResult<()> {
        self.try_update(|f| f.set_cc_swap(chan_from, num_from, chan_to, num_to))
    }

    pub fn del_cc_swap(&self, chan: u8, num: u8) -> EngineResult<()> {
        self.try_update(|f| f.del_cc_swap(chan, num))
    }

    pub fn get_cc_swap(&self, chan: u8, num: u8) -> EngineResult<(u8, u8)> {
        self.snapshot().get_cc_swap(chan, num)
    }

    /// Shut the JACK client down. Consumes the engine: nothing may call
    /// back into it afterward.
    pub fn stop(self) -> EngineResult<()> {
        self.handle.stop()
    }
}
