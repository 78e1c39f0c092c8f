use thiserror::Error;

/// Errors surfaced by the engine's control-thread API and bring-up path.
///
/// The real-time callback never constructs or propagates this type; it
/// reports faults as a plain boolean/status and logs (see `callback.rs`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("channel {0} out of range (expected 0..=15)")]
    InvalidChannel(u8),

    #[error("event class {0:#x} is not a valid channel-voice status nibble")]
    InvalidClass(u8),

    #[error("data value {0} out of range (expected 0..=127)")]
    InvalidDatum(u8),

    #[error("transpose offset {0} out of range (expected -60..=60)")]
    InvalidTranspose(i32),

    #[error("tuning frequency {0:.2} Hz is out of the acceptable range around 440 Hz")]
    InvalidTuningFreq(f64),

    #[error("cc ({channel},{num}) already has an outgoing substitution; remove it first")]
    SwapEndpointBusy { channel: u8, num: u8 },

    #[error("cc swap path from ({channel},{num}) exceeds 128 hops")]
    SwapPathTooLong { channel: u8, num: u8 },

    #[error("outbound ring is full, event dropped")]
    RingFull,

    #[error("failed to bring up audio client: {0}")]
    BringUp(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
