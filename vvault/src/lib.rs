//! Container and bitstream codecs for embedding file archives in video.
//!
//! Three interchangeable formats hide a length-prefixed payload inside a
//! carrier and recover it bit-exactly later:
//!
//! - **Append** ([`process::append`]): a magic-sentinel trailer after the
//!   carrier's own bytes, optionally wrapping a manifest alongside the
//!   payload. Located by an end-anchored, structurally validated scan.
//! - **Steganography** ([`process::lsb`]): one payload bit in the
//!   least-significant bit of every pixel-channel byte, frame-sequential,
//!   with an up-front capacity precondition.
//! - **Data-Reel** ([`process::reel`]): one payload bit per full
//!   black/white pixel on a fixed grayscale grid, digest-protected so
//!   codec-induced bit flips are detected rather than silently decoded.
//!
//! Carriers are ordered frame streams behind the [`video`] traits; the
//! payload itself is an opaque archive produced and consumed by the
//! [`archive`] collaborator.
//!
//! ```
//! use vvault::process::reel::ReelCodec;
//! use vvault::video::MemorySink;
//!
//! let codec = ReelCodec::default();
//! let mut sink = MemorySink::new(codec.output_info());
//! codec.encode(&mut sink, b"payload")?;
//!
//! let recovered = codec.decode(&mut sink.into_source())?;
//! assert_eq!(recovered, b"payload");
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Archive collaborator: builds and extracts the user-file archive.
pub mod archive;

/// Embedding codecs and method dispatch.
pub mod process;

/// Wire-format records: trailer and reel headers, magic constants.
pub mod structs;

/// Bit I/O, capacity/integrity checks, error taxonomy.
pub mod utils;

/// Frame model and the video I/O collaborator seam.
pub mod video;
