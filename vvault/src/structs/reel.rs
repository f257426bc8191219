//! Data-Reel wire header.

use crate::utils::capacity::sha256_digest;
use crate::utils::errors::ReelError;

/// Visual-frame format sentinel.
pub const REEL_MAGIC: &[u8; 5] = b"VREEL";

/// Header length on the wire: magic, SHA-256 digest, u64 payload length.
pub const REEL_HEADER_BYTES: usize = 5 + 32 + 8;

pub const REEL_HEADER_BITS: u64 = (REEL_HEADER_BYTES as u64) * 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelHeader {
    pub checksum: [u8; 32],
    pub payload_len: u64,
}

impl ReelHeader {
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            checksum: sha256_digest(payload),
            payload_len: payload.len() as u64,
        }
    }

    pub fn to_bytes(&self) -> [u8; REEL_HEADER_BYTES] {
        let mut raw = [0u8; REEL_HEADER_BYTES];
        raw[..5].copy_from_slice(REEL_MAGIC);
        raw[5..37].copy_from_slice(&self.checksum);
        raw[37..].copy_from_slice(&self.payload_len.to_be_bytes());
        raw
    }

    pub fn parse(raw: &[u8; REEL_HEADER_BYTES]) -> Result<Self, ReelError> {
        let mut magic = [0u8; 5];
        magic.copy_from_slice(&raw[..5]);
        if &magic != REEL_MAGIC {
            return Err(ReelError::BadMagic(magic));
        }

        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&raw[5..37]);

        let mut len = [0u8; 8];
        len.copy_from_slice(&raw[37..]);

        Ok(Self {
            checksum,
            payload_len: u64::from_be_bytes(len),
        })
    }
}

#[test]
fn header_round_trips() {
    let header = ReelHeader::for_payload(b"some payload");
    let parsed = ReelHeader::parse(&header.to_bytes()).unwrap();
    assert_eq!(parsed, header);
    assert_eq!(parsed.payload_len, 12);
}

#[test]
fn parse_rejects_foreign_magic() {
    let mut raw = ReelHeader::for_payload(b"x").to_bytes();
    raw[0] ^= 0xFF;

    match ReelHeader::parse(&raw) {
        Err(ReelError::BadMagic(read)) => assert_ne!(&read, REEL_MAGIC),
        other => panic!("expected BadMagic, got {other:?}"),
    }
}
