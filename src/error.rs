use thiserror::Error;

/// Reasons a cartridge image can be rejected at load time.
///
/// A failed load never touches the running system: the previously inserted
/// cartridge (or the empty slot) stays in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("invalid iNES magic, expected \"NES\\x1A\"")]
    InvalidMagic,

    #[error("image truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("trainer data is not supported")]
    TrainerUnsupported,

    #[error("unsupported console type {0} (only the baseline NES/Famicom is emulated)")]
    UnsupportedConsole(u8),

    #[error("NES 2.0 headers are not supported")]
    Nes2Unsupported,

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

/// Misuse of the audio sample buffer by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("requested {requested} samples but only {available} are buffered")]
    NotEnoughSamples { requested: usize, available: usize },

    #[error("destination holds {capacity} samples, {requested} requested")]
    DestinationTooSmall { requested: usize, capacity: usize },
}

/// Top level error used by the binary.
#[derive(Debug, Error)]
pub enum NesError {
    #[error("ROM load failed: {0}")]
    Rom(#[from] RomError),

    #[error("audio: {0}")]
    Audio(#[from] AudioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frontend: {0}")]
    Frontend(String),
}

pub type NesResult<T> = Result<T, NesError>;
