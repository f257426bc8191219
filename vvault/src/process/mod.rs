//! Embedding codecs and method dispatch.
//!
//! Each method pairs an embed operation (payload bytes + carrier → produced
//! resource) with a decode operation (produced resource → payload bytes).
//! The method is a tagged variant selected once at the entry point; the
//! codecs never chain-probe each other.

/// Trailer appended after the carrier's own bytes.
///
/// Provides the [`TrailerCodec`](append::TrailerCodec) for the container
/// and legacy append formats.
pub mod append;

/// Least-significant-bit embedding across frame samples.
pub mod lsb;

/// Black/white visual frames carrying one bit per pixel.
///
/// Provides the [`ReelCodec`](reel::ReelCodec) for the Data-Reel format.
pub mod reel;

/// Embedding method, selected once at the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Append,
    Steganography,
    DataReel,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Append => write!(f, "append"),
            Method::Steganography => write!(f, "steganography"),
            Method::DataReel => write!(f, "datareel"),
        }
    }
}
