//! Visual frame codec ("Data-Reel").
//!
//! Renders each bit of `header || payload` as one full black/white pixel
//! across a fixed grayscale grid. The whole-pixel encoding survives codecs
//! that preserve gross luminance but not exact sample values, trading
//! capacity (one bit per pixel instead of one per channel byte) for
//! robustness; the header digest detects residual bit flips.

use anyhow::{Result, anyhow};
use log::{Level, debug};

use crate::log_or_err;
use crate::structs::reel::{REEL_HEADER_BITS, REEL_HEADER_BYTES, ReelHeader};
use crate::utils::bits::{BitAccumulator, BitSource};
use crate::utils::capacity::{hex_digest, reel_frames_needed, sha256_digest};
use crate::utils::errors::ReelError;
use crate::video::{ColorMode, Frame, FrameSink, FrameSource, VideoInfo};

pub const REEL_WIDTH: u32 = 640;
pub const REEL_HEIGHT: u32 = 360;
pub const REEL_FRAME_RATE: (u32, u32) = (30, 1);

/// Midpoint threshold separating dark samples from bright ones.
const THRESHOLD: u8 = 127;

#[derive(Debug)]
pub struct ReelCodec {
    width: u32,
    height: u32,
    fail_level: Level,
}

impl Default for ReelCodec {
    fn default() -> Self {
        Self {
            width: REEL_WIDTH,
            height: REEL_HEIGHT,
            fail_level: Level::Error,
        }
    }
}

impl ReelCodec {
    pub fn with_grid(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn set_fail_level(&mut self, level: Level) {
        self.fail_level = level;
    }

    /// Geometry of the video this codec produces.
    pub fn output_info(&self) -> VideoInfo {
        VideoInfo {
            width: self.width,
            height: self.height,
            rate: REEL_FRAME_RATE,
            color: ColorMode::Gray,
        }
    }

    /// Frames a payload of `payload_len` bytes will occupy.
    pub fn frames_for(&self, payload_len: u64) -> u64 {
        reel_frames_needed(
            REEL_HEADER_BITS + 8 * payload_len,
            self.pixels_per_frame(),
        )
    }

    fn pixels_per_frame(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Renders `header || payload` as black/white frames into `sink`.
    ///
    /// The final chunk is padded with trailing zero bits to a full frame.
    pub fn encode<K: FrameSink>(&self, sink: &mut K, payload: &[u8]) -> Result<()> {
        let header = ReelHeader::for_payload(payload);
        let mut stream = Vec::with_capacity(REEL_HEADER_BYTES + payload.len());
        stream.extend_from_slice(&header.to_bytes());
        stream.extend_from_slice(payload);

        let mut bits = BitSource::from_slice(&stream);
        let pixels = self.pixels_per_frame() as usize;
        let frames = reel_frames_needed(bits.len_bits(), self.pixels_per_frame());
        debug!(
            "rendering {} bits across {frames} {}x{} frame(s)",
            bits.len_bits(),
            self.width,
            self.height
        );

        for _ in 0..frames {
            let mut data = vec![0u8; pixels];
            for sample in data.iter_mut() {
                if bits.remaining() == 0 {
                    break; // trailing pad stays black
                }
                if bits.next_bit()? {
                    *sample = u8::MAX;
                }
            }
            sink.write_frame(&Frame { data })?;
        }

        sink.finish()?;
        Ok(())
    }

    /// Reads the whole video, thresholds every pixel, and validates
    /// magic, length, and digest.
    ///
    /// Unlike the LSB codec there is no early termination: the header is
    /// parsed only after all frames are read, because its bit-offset is
    /// defined on the concatenated sequence rather than relative to any
    /// frame boundary a partial read could rely on.
    pub fn decode<S: FrameSource>(&self, source: &mut S) -> Result<Vec<u8>> {
        let channels = source.info().color.channels();
        let mut acc = BitAccumulator::default();

        while let Some(frame) = source.next_frame()? {
            match channels {
                1 => {
                    for &sample in &frame.data {
                        acc.push_bit(sample > THRESHOLD);
                    }
                }
                _ => {
                    for pixel in frame.data.chunks_exact(channels) {
                        acc.push_bit(luma(pixel) > THRESHOLD);
                    }
                }
            }
        }

        if acc.len_bits() < REEL_HEADER_BITS {
            return Err(ReelError::HeaderUndecodable.into());
        }

        let total_bits = acc.len_bits();
        let bytes = acc.into_bytes();
        let mut raw = [0u8; REEL_HEADER_BYTES];
        raw.copy_from_slice(&bytes[..REEL_HEADER_BYTES]);
        let header = ReelHeader::parse(&raw)?;

        let available_bits = total_bits - REEL_HEADER_BITS;
        if 8 * header.payload_len as u128 > available_bits as u128 {
            return Err(ReelError::TruncatedPayload {
                declared: header.payload_len,
                available_bits,
            }
            .into());
        }

        let start = REEL_HEADER_BYTES;
        let end = start + header.payload_len as usize;
        let payload = bytes[start..end].to_vec();

        let computed = sha256_digest(&payload);
        if computed != header.checksum {
            return Err(ReelError::ChecksumMismatch {
                stored: hex_digest(&header.checksum),
                computed: hex_digest(&computed),
            }
            .into());
        }

        if bytes[end..].iter().any(|&b| b != 0) {
            log_or_err!(self, Level::Warn, anyhow!(ReelError::NonZeroPadding));
        }

        debug!("reel decoded: {} payload byte(s), digest verified", payload.len());
        Ok(payload)
    }

    /// Parses only the 45-byte header, for non-destructive probing.
    pub fn probe<S: FrameSource>(&self, source: &mut S) -> Result<ReelHeader> {
        let channels = source.info().color.channels();
        let mut acc = BitAccumulator::with_capacity(REEL_HEADER_BITS);

        'frames: while let Some(frame) = source.next_frame()? {
            match channels {
                1 => {
                    for &sample in &frame.data {
                        acc.push_bit(sample > THRESHOLD);
                        if acc.len_bits() == REEL_HEADER_BITS {
                            break 'frames;
                        }
                    }
                }
                _ => {
                    for pixel in frame.data.chunks_exact(channels) {
                        acc.push_bit(luma(pixel) > THRESHOLD);
                        if acc.len_bits() == REEL_HEADER_BITS {
                            break 'frames;
                        }
                    }
                }
            }
        }

        if acc.len_bits() < REEL_HEADER_BITS {
            return Err(ReelError::HeaderUndecodable.into());
        }

        let mut raw = [0u8; REEL_HEADER_BYTES];
        raw.copy_from_slice(acc.complete_bytes());
        Ok(ReelHeader::parse(&raw)?)
    }
}

/// BT.601 integer luminance over an (R, G, B) pixel.
fn luma(pixel: &[u8]) -> u8 {
    let (r, g, b) = (pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
    ((299 * r + 587 * g + 114 * b) / 1000) as u8
}

#[cfg(test)]
use crate::video::{MemorySink, MemorySource};

#[cfg(test)]
fn tiny_codec() -> ReelCodec {
    // A small grid keeps test videos at a few frames.
    ReelCodec::with_grid(16, 8)
}

#[cfg(test)]
fn encode_to_frames(codec: &ReelCodec, payload: &[u8]) -> MemorySink {
    let mut sink = MemorySink::new(codec.output_info());
    codec.encode(&mut sink, payload).unwrap();
    sink
}

#[test]
fn round_trip_preserves_the_payload() {
    let codec = tiny_codec();
    let payload = b"reel payload \x00\xFF";
    let sink = encode_to_frames(&codec, payload);

    assert_eq!(
        sink.frames().len() as u64,
        codec.frames_for(payload.len() as u64)
    );
    let recovered = codec.decode(&mut sink.into_source()).unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn frames_are_strictly_black_and_white() {
    let codec = tiny_codec();
    let sink = encode_to_frames(&codec, b"anything");

    for frame in sink.frames() {
        assert!(frame.data.iter().all(|&s| s == 0 || s == u8::MAX));
    }
}

#[test]
fn single_flipped_pixel_is_detected() {
    let codec = tiny_codec();
    let mut sink = encode_to_frames(&codec, b"checksummed payload");

    // Flip the first payload bit: bit 360 of the sequence, i.e. pixel 104
    // of the third 128-pixel frame.
    let frame = &mut sink.frames_mut()[2];
    frame.data[104] ^= u8::MAX;

    let err = codec.decode(&mut sink.into_source()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReelError>(),
        Some(ReelError::ChecksumMismatch { .. })
    ));
}

#[test]
fn foreign_video_has_a_bad_magic() {
    let codec = tiny_codec();
    let info = codec.output_info();
    let frames = vec![
        Frame {
            data: vec![u8::MAX; info.frame_bytes()],
        };
        4
    ];

    let err = codec
        .decode(&mut MemorySource::new(info, frames))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReelError>(),
        Some(ReelError::BadMagic(_))
    ));
}

#[test]
fn sub_header_video_is_undecodable() {
    let codec = tiny_codec();
    let info = codec.output_info();
    let frames = vec![Frame {
        data: vec![0; info.frame_bytes()],
    }];

    let err = codec
        .decode(&mut MemorySource::new(info, frames))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReelError>(),
        Some(ReelError::HeaderUndecodable)
    ));
}

#[test]
fn truncated_reel_is_detected() {
    let codec = tiny_codec();
    let payload = [0xC3u8; 64];
    let sink = encode_to_frames(&codec, &payload);
    let info = codec.output_info();

    let mut frames = sink.into_frames();
    frames.pop();
    let err = codec
        .decode(&mut MemorySource::new(info, frames))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReelError>(),
        Some(ReelError::TruncatedPayload { declared: 64, .. })
    ));
}

#[test]
fn three_channel_replay_still_decodes() {
    // A produced reel that survived a colourspace conversion: every gray
    // sample replicated across three channels.
    let codec = tiny_codec();
    let payload = b"converted but intact";
    let sink = encode_to_frames(&codec, payload);

    let rgb_info = VideoInfo {
        color: ColorMode::Rgb,
        ..codec.output_info()
    };
    let rgb_frames = sink
        .into_frames()
        .into_iter()
        .map(|frame| Frame {
            data: frame.data.iter().flat_map(|&s| [s, s, s]).collect(),
        })
        .collect();

    let recovered = codec
        .decode(&mut MemorySource::new(rgb_info, rgb_frames))
        .unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn extra_black_tail_frames_are_tolerated() {
    // Some pipelines pad a stream to a minimum duration; all-black frames
    // past the declared payload are padding, not data.
    let codec = tiny_codec();
    let payload = b"padded stream";
    let mut sink = encode_to_frames(&codec, payload);

    let blank = Frame {
        data: vec![0u8; codec.output_info().frame_bytes()],
    };
    sink.write_frame(&blank).unwrap();
    sink.write_frame(&blank).unwrap();

    let recovered = codec.decode(&mut sink.into_source()).unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn empty_payload_round_trips() {
    let codec = tiny_codec();
    let sink = encode_to_frames(&codec, &[]);

    // Header alone: 360 bits in 128-pixel frames.
    assert_eq!(sink.frames().len(), 3);
    let recovered = codec.decode(&mut sink.into_source()).unwrap();
    assert!(recovered.is_empty());
}
