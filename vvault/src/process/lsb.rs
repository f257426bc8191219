//! LSB bitstream codec.
//!
//! Embeds a length-prefixed payload into the least-significant bit of each
//! pixel-channel byte, pixel-major, frame-sequential. The logical bitstream
//! is MSB-first within each payload byte while embedding consumes the
//! rightmost physical bit of each carrier byte; the two orderings are
//! independent and must not be confused.

use anyhow::Result;
use log::debug;

use crate::utils::bits::{BitAccumulator, BitSource, read_u64_be};
use crate::utils::capacity::bitstream_capacity;
use crate::utils::errors::StreamError;
use crate::video::{FrameSink, FrameSource};

/// Wire header: one big-endian u64 payload length.
pub const LENGTH_HEADER_BITS: u64 = 64;

/// Streams `source` into `sink`, hiding `header || payload` in the carrier
/// byte LSBs.
///
/// The capacity precondition is checked before any frame is written; on
/// [`StreamError::CapacityExceeded`] the sink receives nothing. Once the
/// bitstream is exhausted, remaining bytes and frames pass through
/// bit-identical, and frame count and order are preserved.
pub fn embed<S, K>(source: &mut S, sink: &mut K, payload: &[u8]) -> Result<()>
where
    S: FrameSource,
    K: FrameSink,
{
    let info = source.info();
    let frames = source.frame_count().ok_or(StreamError::UnknownCapacity)?;
    let capacity = bitstream_capacity(&info, frames);

    let needed = LENGTH_HEADER_BITS as u128 + 8 * payload.len() as u128;
    if needed > capacity as u128 {
        return Err(StreamError::CapacityExceeded { needed, capacity }.into());
    }

    let mut stream = Vec::with_capacity(8 + payload.len());
    stream.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    stream.extend_from_slice(payload);
    let mut bits = BitSource::from_slice(&stream);

    debug!(
        "embedding {} bits into a carrier holding {capacity}",
        bits.len_bits()
    );

    while let Some(mut frame) = source.next_frame()? {
        if bits.remaining() > 0 {
            for byte in frame.data.iter_mut() {
                if bits.remaining() == 0 {
                    break;
                }
                *byte = (*byte & 0xFE) | bits.next_bit()? as u8;
            }
        }
        sink.write_frame(&frame)?;
    }

    sink.finish()?;
    Ok(())
}

/// Recovers the payload from a produced video's byte LSBs.
///
/// Frames are consumed in order only until `64 + 8 * length` bits are
/// held; the tail of the video is never read.
pub fn extract<S: FrameSource>(source: &mut S) -> Result<Vec<u8>> {
    let mut acc = BitAccumulator::default();
    let mut declared: Option<u64> = None;
    let mut needed: Option<u128> = None;

    'frames: while let Some(frame) = source.next_frame()? {
        for &byte in &frame.data {
            acc.push_bit(byte & 1 == 1);

            if needed.is_none() && acc.len_bits() == LENGTH_HEADER_BITS {
                let length = read_u64_be(acc.complete_bytes(), 0)
                    .ok_or(StreamError::HeaderUndecodable)?;
                debug!("length header decoded: {length} payload byte(s)");
                declared = Some(length);
                // 128-bit arithmetic so a corrupt length cannot overflow.
                needed = Some(LENGTH_HEADER_BITS as u128 + 8 * length as u128);
            }

            if let Some(needed) = needed {
                if acc.len_bits() as u128 >= needed {
                    break 'frames;
                }
            }
        }
    }

    let Some(length) = declared else {
        return Err(StreamError::HeaderUndecodable.into());
    };

    if let Some(needed) = needed {
        if (acc.len_bits() as u128) < needed {
            return Err(StreamError::TruncatedPayload {
                declared: length,
                available_bits: acc.len_bits() - LENGTH_HEADER_BITS,
            }
            .into());
        }
    }

    let bytes = acc.into_bytes();
    Ok(bytes[8..8 + length as usize].to_vec())
}

/// Reads only the 64-bit length header, for non-destructive probing.
pub fn probe<S: FrameSource>(source: &mut S) -> Result<u64> {
    let mut acc = BitAccumulator::with_capacity(LENGTH_HEADER_BITS);

    while let Some(frame) = source.next_frame()? {
        for &byte in &frame.data {
            acc.push_bit(byte & 1 == 1);
            if acc.len_bits() == LENGTH_HEADER_BITS {
                return read_u64_be(acc.complete_bytes(), 0)
                    .ok_or_else(|| StreamError::HeaderUndecodable.into());
            }
        }
    }

    Err(StreamError::HeaderUndecodable.into())
}

#[cfg(test)]
use crate::video::{ColorMode, Frame, MemorySink, MemorySource, VideoInfo};

#[cfg(test)]
fn test_carrier(frames: usize, frame_bytes: usize) -> MemorySource {
    let info = VideoInfo {
        width: (frame_bytes / 3) as u32,
        height: 1,
        rate: (30, 1),
        color: ColorMode::Rgb,
    };

    // Deterministic non-trivial carrier samples.
    let frames = (0..frames)
        .map(|f| Frame {
            data: (0..frame_bytes)
                .map(|i| ((f * 31 + i * 7) % 256) as u8)
                .collect(),
        })
        .collect();
    MemorySource::new(info, frames)
}

#[cfg(test)]
fn embed_to_sink(source: &mut MemorySource, payload: &[u8]) -> Result<MemorySink> {
    let mut sink = MemorySink::new(source.info());
    embed(source, &mut sink, payload)?;
    Ok(sink)
}

#[test]
fn round_trip_preserves_the_payload() {
    let payload = b"any opaque archive bytes \x00\xFF\x7F";
    let mut source = test_carrier(4, 120);
    let sink = embed_to_sink(&mut source, payload).unwrap();

    let recovered = extract(&mut sink.into_source()).unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn carrier_outside_the_lsb_plane_is_untouched() {
    let payload = [0xA5u8; 10];
    let mut source = test_carrier(3, 60);
    let mut reference = test_carrier(3, 60);
    let sink = embed_to_sink(&mut source, &payload).unwrap();

    let mut produced = sink.into_source();
    let mut frames = 0;
    while let Some(frame) = produced.next_frame().unwrap() {
        let original = reference.next_frame().unwrap().unwrap();
        for (out, src) in frame.data.iter().zip(&original.data) {
            assert_eq!(out & 0xFE, src & 0xFE);
        }
        frames += 1;
    }
    assert_eq!(frames, 3);
}

#[test]
fn empty_payload_round_trips() {
    let mut source = test_carrier(1, 66);
    let sink = embed_to_sink(&mut source, &[]).unwrap();

    let recovered = extract(&mut sink.into_source()).unwrap();
    assert!(recovered.is_empty());
}

#[test]
fn capacity_boundary_is_exact() {
    // 2 frames of 48 bytes = 96 bit positions; 64 header bits leave room
    // for exactly 4 payload bytes.
    let fits = [0u8; 4];
    let mut source = test_carrier(2, 48);
    let sink = embed_to_sink(&mut source, &fits).unwrap();
    assert_eq!(extract(&mut sink.into_source()).unwrap(), fits);

    let mut source = test_carrier(2, 48);
    let mut sink = MemorySink::new(source.info());
    let err = embed(&mut source, &mut sink, &[0u8; 5]).unwrap_err();
    match err.downcast_ref::<StreamError>() {
        Some(StreamError::CapacityExceeded { needed, capacity }) => {
            assert_eq!(*needed, 104);
            assert_eq!(*capacity, 96);
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
    // The precondition failed before any frame was emitted.
    assert!(sink.frames().is_empty());
}

#[test]
fn truncated_video_is_detected() {
    let payload = [0x5Au8; 40]; // 64 + 320 bits, needs all 4 frames
    let mut source = test_carrier(4, 99);
    let sink = embed_to_sink(&mut source, &payload).unwrap();

    let mut frames = sink.into_frames();
    frames.truncate(2);
    let info = test_carrier(1, 99).info();
    let err = extract(&mut MemorySource::new(info, frames)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StreamError>(),
        Some(StreamError::TruncatedPayload { declared: 40, .. })
    ));
}

#[test]
fn sub_header_video_is_undecodable() {
    let info = VideoInfo {
        width: 10,
        height: 1,
        rate: (30, 1),
        color: ColorMode::Rgb,
    };
    let frames = vec![Frame { data: vec![0; 30] }];

    let err = extract(&mut MemorySource::new(info, frames)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StreamError>(),
        Some(StreamError::HeaderUndecodable)
    ));
}

#[test]
fn unknown_frame_count_refuses_to_embed() {
    struct Endless;

    impl FrameSource for Endless {
        fn info(&self) -> VideoInfo {
            VideoInfo {
                width: 1,
                height: 1,
                rate: (30, 1),
                color: ColorMode::Gray,
            }
        }
        fn frame_count(&self) -> Option<u64> {
            None
        }
        fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
            Ok(Some(Frame { data: vec![0] }))
        }
    }

    let mut sink = MemorySink::new(Endless.info());
    let err = embed(&mut Endless, &mut sink, b"x").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StreamError>(),
        Some(StreamError::UnknownCapacity)
    ));
}

#[test]
fn probe_reports_the_declared_length() {
    let payload = [1u8; 16];
    let mut source = test_carrier(2, 81);
    let sink = embed_to_sink(&mut source, &payload).unwrap();

    assert_eq!(probe(&mut sink.into_source()).unwrap(), 16);
}
