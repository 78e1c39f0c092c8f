//! Real audio-server client bring-up: a JACK client with two MIDI ports
//! ("input"/"output") and a `jack::ProcessHandler` wiring the published
//! `FilterState`, the callback-owned `RtMemo`, both rings, and the
//! encoder sink into one process period. Grounded on `init_jack_midi`/
//! `jack_process` in `examples/original_source/zynmidirouter.c` and on
//! the teacher's `AudioEngine::start` (`src/audio.rs`) for the
//! pre-allocated, no-per-callback-alloc shape of the closure/handler.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::callback::{self, CallbackFault, MidiSink, MidiSource};
use crate::config::Config;
use crate::encoder::OnCc;
use crate::error::{EngineError, EngineResult};
use crate::filter::{FilterState, RtMemo};
use crate::ring::{CaptureProducer, OutboundConsumer, OutboundProducer, OutboundRing};

struct JackSource<'a> {
    port: &'a jack::Port<jack::MidiIn>,
    scope: &'a jack::ProcessScope,
}

impl MidiSource for JackSource<'_> {
    fn len(&self) -> usize {
        self.port.iter(self.scope).count()
    }

    fn event(&self, index: usize) -> &[u8] {
        self.port
            .iter(self.scope)
            .nth(index)
            .map(|raw| raw.bytes)
            .unwrap_or(&[])
    }
}

struct JackSink<'a> {
    writer: jack::MidiWriter<'a>,
}

impl MidiSink for JackSink<'_> {
    fn write(&mut self, bytes: &[u8]) -> bool {
        self.writer.write(&jack::RawMidi { time: 0, bytes }).is_ok()
    }
}

/// Owns everything the real-time callback touches each period.
pub struct Processor {
    filter: Arc<ArcSwap<FilterState>>,
    memo: RtMemo,
    outbound: OutboundRing,
    inject: OutboundConsumer,
    capture: CaptureProducer,
    encoder: Box<dyn OnCc>,
    input_port: jack::Port<jack::MidiIn>,
    output_port: jack::Port<jack::MidiOut>,
}

impl jack::ProcessHandler for Processor {
    fn process(&mut self, _client: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        // The overflow guard is relative to this period's actual frame
        // count, not a fixed ring capacity: a server reconfigured to a
        // different period size changes this every callback.
        let frame_limit = ps.n_frames() as usize;

        let filter = self.filter.load();
        let source = JackSource {
            port: &self.input_port,
            scope: ps,
        };

        if let Err(fault) =
            callback::input_phase(&filter, &mut self.memo, &mut self.outbound, &mut self.capture, self.encoder.as_mut(), &source, frame_limit)
        {
            log::error!("input phase fault: {fault:?}");
            return jack::Control::Continue;
        }

        let mut sink = JackSink {
            writer: self.output_port.writer(ps),
        };
        if let Err(fault) = callback::output_phase(&mut self.outbound, &mut sink, frame_limit) {
            log::error!("output phase fault: {fault:?}");
        }
        if let Err(fault) = callback::output_phase(&mut self.inject, &mut sink, frame_limit) {
            log::error!("output phase fault (injected): {fault:?}");
        }

        jack::Control::Continue
    }
}

/// A live JACK client bring-up: the active client plus the handles the
/// control thread needs (filter publish handle, GUI consumer).
pub struct JackHandle {
    active: jack::AsyncClient<(), Processor>,
    filter: Arc<ArcSwap<FilterState>>,
}

impl JackHandle {
    pub fn publish(&self, filter: FilterState) {
        self.filter.store(Arc::new(filter));
    }

    pub fn filter_handle(&self) -> Arc<ArcSwap<FilterState>> {
        self.filter.clone()
    }

    /// Deactivate the client and close its connection to the audio server.
    pub fn stop(self) -> EngineResult<()> {
        self.active
            .deactivate()
            .map(|_| ())
            .map_err(|e| EngineError::BringUp(format!("deactivate failed: {e}")))
    }
}

/// Bring up a JACK client named per `config`, register its two MIDI
/// ports, and activate a process callback wired to `filter`/`encoder`.
/// No partial initialization survives: any failure after client-open
/// tears the client back down before returning.
pub fn start(
    config: &Config,
    initial_filter: FilterState,
    capture: CaptureProducer,
    encoder: Box<dyn OnCc>,
) -> EngineResult<(JackHandle, OutboundProducer)> {
    let (client, _status) = jack::Client::new(&config.client_name, jack::ClientOptions::NO_START_SERVER)
        .map_err(|e| EngineError::BringUp(format!("jack client open failed: {e}")))?;

    let input_port = client
        .register_port(&config.input_port_name, jack::MidiIn::default())
        .map_err(|e| EngineError::BringUp(format!("input port registration failed: {e}")))?;
    let output_port = client
        .register_port(&config.output_port_name, jack::MidiOut::default())
        .map_err(|e| EngineError::BringUp(format!("output port registration failed: {e}")))?;

    let (inject_producer, inject_consumer) = OutboundRing::new(crate::ring::INJECT_RING_CAPACITY).split();

    let filter = Arc::new(ArcSwap::from_pointee(initial_filter));
    let processor = Processor {
        filter: filter.clone(),
        memo: RtMemo::new(),
        outbound: OutboundRing::new(config.outbound_ring_capacity),
        inject: inject_consumer,
        capture,
        encoder,
        input_port,
        output_port,
    };

    let active = client
        .activate_async((), processor)
        .map_err(|e| EngineError::BringUp(format!("client activation failed: {e}")))?;

    Ok((JackHandle { active, filter }, inject_producer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::NullEncoderSink;
    use crate::callback::{FakeSink, FakeSource};

    #[test]
    fn processor_fields_wire_to_the_same_filter_handle() {
        // Smoke-tests the publish path without a live JACK server: a
        // fresh snapshot swapped in is visible through `load()`.
        let filter = Arc::new(ArcSwap::from_pointee(FilterState::new()));
        let mut updated = FilterState::new();
        updated.set_transpose(0, 12).unwrap();
        filter.store(Arc::new(updated));
        assert_eq!(filter.load().get_transpose(0).unwrap(), 12);
    }

    #[test]
    fn fakes_exercise_the_same_phases_the_real_client_drives() {
        let filter = FilterState::new();
        let mut memo = RtMemo::new();
        let mut outbound = OutboundRing::new(64);
        let mut capture = crate::ring::CaptureRing::new();
        let mut encoder: Box<dyn OnCc> = Box::new(NullEncoderSink);
        let source = FakeSource::new(vec![vec![0x90, 60, 100]]);
        callback::input_phase(&filter, &mut memo, &mut outbound, &mut capture, encoder.as_mut(), &source, 16).unwrap();
        let mut sink = FakeSink::new();
        callback::output_phase(&mut outbound, &mut sink, 16).unwrap();
        assert_eq!(sink.written, vec![vec![0x90, 60, 100]]);
    }

    #[test]
    fn injected_sends_drain_through_the_same_output_phase() {
        let (mut producer, mut consumer) = OutboundRing::new(32).split();
        crate::send::send_cc(&mut producer, 3, 7, 99);
        let mut sink = FakeSink::new();
        callback::output_phase(&mut consumer, &mut sink, 16).unwrap();
        assert_eq!(sink.written, vec![vec![0xB3, 7, 99]]);
    }
}
