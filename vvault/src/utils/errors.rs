#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum TrailerError {
    #[error("No embedded data found (magic number missing)")]
    NoEmbeddedData,

    #[error(
        "Trailer candidate at offset {offset:#X} declares {declared} body byte(s) but {actual} remain; skipping"
    )]
    InconsistentLength {
        offset: usize,
        declared: u64,
        actual: u64,
    },

    #[error("Container body is missing its {0:?} entry")]
    MissingEntry(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Payload needs {needed} bits but the carrier provides {capacity}")]
    CapacityExceeded { needed: u128, capacity: u64 },

    #[error("Stream ended before the 64-bit length header was recovered")]
    HeaderUndecodable,

    #[error(
        "Stream ended early: payload declares {declared} byte(s), only {available_bits} bits followed the header"
    )]
    TruncatedPayload { declared: u64, available_bits: u64 },

    #[error("Carrier cannot report a frame count; capacity must be known before any frame is written")]
    UnknownCapacity,
}

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("Not a Data-Reel video (magic number mismatch, read {0:02X?})")]
    BadMagic([u8; 5]),

    #[error("Video ends before the 45-byte reel header is complete")]
    HeaderUndecodable,

    #[error(
        "Reel payload truncated: declares {declared} byte(s), only {available_bits} bits follow the header"
    )]
    TruncatedPayload { declared: u64, available_bits: u64 },

    #[error("Checksum mismatch. Stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },

    #[error("Bits past the payload region are not all zero")]
    NonZeroPadding,
}

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("Extraction failed. Incorrect password or corrupted data")]
    WrongPasswordOrCorrupt,

    #[error("Embedded data is not a valid archive")]
    BadArchive,
}

#[derive(thiserror::Error, Debug)]
pub enum AiError {
    #[error("AI disabled. GEMINI_API_KEY not set")]
    NotConfigured,

    #[error("AI call failed: {0}")]
    ServiceUnavailable(String),
}
