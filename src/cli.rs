use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zynmidi-router", about = "Real-time MIDI routing and filtering engine")]
pub struct Cli {
    /// Optional path to a config.toml overriding bring-up defaults
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring up the engine against the real audio-server client and block until interrupted
    Run(RunArgs),
    /// List the audio server's MIDI ports
    Ports,
    /// Poll the GUI capture ring and print captured events until interrupted
    Watch(RunArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Audio-server client name (default: from config)
    #[arg(long)]
    pub client_name: Option<String>,

    /// Master MIDI channel 0-15 to route master-CC sends to
    #[arg(long)]
    pub master_chan: Option<u8>,
}
