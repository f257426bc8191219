//! Shared capacity and integrity checks.
//!
//! Capacity math for both frame codecs, the magic-sentinel scan used by the
//! append formats, and the digest helpers backing the reel checksum.

use sha2::{Digest, Sha256};

use crate::video::VideoInfo;

/// Total LSB positions a carrier offers: one per pixel-channel byte.
pub fn bitstream_capacity(info: &VideoInfo, frame_count: u64) -> u64 {
    frame_count.saturating_mul(info.frame_bytes() as u64)
}

/// Frames a reel of `total_bits` occupies at one bit per pixel.
pub fn reel_frames_needed(total_bits: u64, pixels_per_frame: u64) -> u64 {
    total_bits.div_ceil(pixels_per_frame)
}

/// Last occurrence of `needle` in `haystack`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).rposition(|w| w == needle)
}

pub fn sha256_digest(payload: &[u8]) -> [u8; 32] {
    Sha256::digest(payload).into()
}

pub fn hex_digest(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[test]
fn capacity_counts_every_channel_byte() {
    use crate::video::ColorMode;

    let info = VideoInfo {
        width: 4,
        height: 2,
        rate: (30, 1),
        color: ColorMode::Rgb,
    };
    assert_eq!(bitstream_capacity(&info, 10), 10 * 4 * 2 * 3);

    let gray = VideoInfo {
        color: ColorMode::Gray,
        ..info
    };
    assert_eq!(bitstream_capacity(&gray, 10), 10 * 4 * 2);
}

#[test]
fn reel_frame_count_rounds_up() {
    assert_eq!(reel_frames_needed(1, 100), 1);
    assert_eq!(reel_frames_needed(100, 100), 1);
    assert_eq!(reel_frames_needed(101, 100), 2);
}

#[test]
fn rfind_picks_the_last_match() {
    let data = b"..MAGIC..MAGIC..";
    assert_eq!(rfind(data, b"MAGIC"), Some(9));
    assert_eq!(rfind(&data[..9], b"MAGIC"), Some(2));
    assert_eq!(rfind(data, b"ABSENT"), None);
    assert_eq!(rfind(b"..", b"MAGIC"), None);
}

#[test]
fn digest_is_sha256() {
    // SHA-256 of the empty input.
    assert_eq!(
        hex_digest(&sha256_digest(b"")),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
