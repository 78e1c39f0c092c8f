mod callback;
mod cli;
mod config;
mod encoder;
mod engine;
mod enumerate;
mod error;
mod event;
mod filter;
mod jack_client;
mod ring;
mod send;

use std::io::Write;
use std::time::{Duration, SystemTime};

use clap::Parser;
use cli::{Cli, Command, RunArgs};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyModifiers};
use encoder::EncoderBank;
use engine::Engine;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => config::load_file(std::path::Path::new(path)),
        None => config::Config::default(),
    };

    match cli.command {
        Command::Ports => {
            env_logger::init();
            enumerate::midi_ports()
        }
        Command::Run(args) => {
            install_raw_mode_logger();
            apply_run_args(&mut cfg, &args);
            config::init(cfg);
            run_blocking(&args, false)
        }
        Command::Watch(args) => {
            install_raw_mode_logger();
            apply_run_args(&mut cfg, &args);
            config::init(cfg);
            run_blocking(&args, true)
        }
    }
}

fn apply_run_args(cfg: &mut config::Config, args: &RunArgs) {
    if let Some(name) = &args.client_name {
        cfg.client_name = name.clone();
    }
}

/// Bring the engine up, block polling terminal input (Ctrl+C/Ctrl+Q to
/// quit), optionally printing captured GUI events, then tear down in the
/// order that matters: client first, then any open terminal state.
fn run_blocking(args: &RunArgs, watch: bool) -> anyhow::Result<()> {
    let cfg = config::get();
    let encoder: Box<dyn encoder::OnCc> = Box::new(EncoderBank::new());
    let mut engine = Engine::start(&cfg, encoder)?;

    if let Some(chan) = args.master_chan {
        if let Err(e) = engine.set_master_chan(Some(chan)) {
            log::warn!("--master-chan {chan} rejected: {e}");
        }
    }

    crossterm::terminal::enable_raw_mode()?;
    log::info!("Running. Ctrl+C or Ctrl+Q to quit.");

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let TermEvent::Key(key_event) = event::read()? {
                if key_event.modifiers.contains(KeyModifiers::CONTROL) {
                    match key_event.code {
                        KeyCode::Char('c') | KeyCode::Char('q') => break,
                        _ => {}
                    }
                }
            }
        }

        if watch {
            loop {
                let word = engine.read_zynmidi();
                if word == 0 {
                    break;
                }
                let status = (word >> 16) as u8;
                let d1 = (word >> 8) as u8 & 0x7F;
                let d2 = word as u8 & 0x7F;
                log::info!("captured: status={status:#04x} d1={d1} d2={d2}");
            }
        }
    }

    crossterm::terminal::disable_raw_mode()?;
    log::info!("Stopping...");
    engine.stop()?;
    Ok(())
}

/// Custom logger writing to stderr with \r\n line endings, needed while
/// the terminal is in raw mode. Adapted from the teacher's `main.rs`.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400;
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

fn install_raw_mode_logger() {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );
}
