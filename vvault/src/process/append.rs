//! Append container codec.
//!
//! Embeds a length-prefixed body as a trailer after the carrier's own
//! bytes, located on decode by an end-anchored magic scan. Scanning from
//! the end tolerates magic collisions inside carrier content on the
//! assumption that the producer-authored trailer is the last occurrence;
//! a candidate is additionally accepted only when its declared body runs
//! exactly to end-of-file, so a collision nearer the end than the real
//! trailer cannot shadow it.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{Level, debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::log_or_err;
use crate::structs::trailer::{
    MANIFEST_ENTRY, PAYLOAD_ENTRY, Trailer, TrailerKind, write_trailer,
};
use crate::utils::bits::read_u64_be;
use crate::utils::capacity::rfind;
use crate::utils::errors::{ArchiveError, TrailerError};

#[derive(Debug)]
pub struct TrailerCodec {
    fail_level: Level,
}

impl Default for TrailerCodec {
    fn default() -> Self {
        Self {
            fail_level: Level::Error,
        }
    }
}

impl TrailerCodec {
    pub fn set_fail_level(&mut self, level: Level) {
        self.fail_level = level;
    }

    /// Copies `carrier` to `output` and appends the trailer.
    ///
    /// A manifest selects the container layout; without one the payload is
    /// appended raw under the legacy magic. The carrier is never mutated.
    pub fn encode(
        &self,
        carrier: &Path,
        output: &Path,
        payload: &[u8],
        manifest: Option<&str>,
    ) -> Result<()> {
        let (kind, body) = match manifest {
            Some(text) => (TrailerKind::Container, wrap_container(payload, text)?),
            None => (TrailerKind::Legacy, payload.to_vec()),
        };

        let mut reader = BufReader::new(
            File::open(carrier).with_context(|| format!("opening carrier {}", carrier.display()))?,
        );
        let mut writer = BufWriter::new(
            File::create(output).with_context(|| format!("creating {}", output.display()))?,
        );

        let copied = io::copy(&mut reader, &mut writer)?;
        write_trailer(&mut writer, kind, &body)?;
        writer.flush()?;

        info!(
            "appended {} trailer ({} body bytes) after {copied} carrier bytes",
            kind,
            body.len()
        );
        Ok(())
    }

    /// Locates the authoritative trailer in a produced file, container
    /// format first.
    pub fn locate(&self, data: &[u8]) -> Result<Option<Trailer>> {
        for kind in [TrailerKind::Container, TrailerKind::Legacy] {
            if let Some(trailer) = self.scan(data, kind)? {
                return Ok(Some(trailer));
            }
        }

        Ok(None)
    }

    fn scan(&self, data: &[u8], kind: TrailerKind) -> Result<Option<Trailer>> {
        let magic = kind.magic();
        let mut end = data.len();

        while let Some(offset) = rfind(&data[..end], magic) {
            let length_at = offset + magic.len();
            let body_start = length_at + 8;
            let declared = read_u64_be(data, length_at);

            match declared {
                Some(len) if body_start as u64 + len == data.len() as u64 => {
                    debug!("{kind} trailer verified at offset {offset:#X}, body {len} bytes");
                    return Ok(Some(Trailer {
                        kind,
                        magic_offset: offset,
                        body_start,
                        body_len: len,
                    }));
                }
                _ => {
                    log_or_err!(
                        self,
                        Level::Warn,
                        anyhow!(TrailerError::InconsistentLength {
                            offset,
                            declared: declared.unwrap_or(0),
                            actual: data.len().saturating_sub(body_start) as u64,
                        })
                    );
                }
            }

            end = offset;
        }

        Ok(None)
    }

    /// Decodes a produced file into the payload archive bytes plus the
    /// manifest, when the container layout carries one.
    pub fn decode(&self, data: &[u8]) -> Result<(Vec<u8>, Option<String>)> {
        let Some(trailer) = self.locate(data)? else {
            return Err(TrailerError::NoEmbeddedData.into());
        };

        match trailer.kind {
            TrailerKind::Container => {
                let (payload, manifest) = unwrap_container(trailer.body(data))?;
                Ok((payload, Some(manifest)))
            }
            TrailerKind::Legacy => Ok((trailer.body(data).to_vec(), None)),
        }
    }

    /// Reads only the manifest of a container trailer, without touching
    /// the payload entry.
    pub fn peek_manifest(&self, data: &[u8]) -> Result<Option<String>> {
        match self.locate(data)? {
            Some(trailer) if trailer.kind == TrailerKind::Container => {
                let mut container = open_container(trailer.body(data))?;
                let manifest = read_entry(&mut container, MANIFEST_ENTRY)?;
                Ok(Some(String::from_utf8_lossy(&manifest).into_owned()))
            }
            _ => Ok(None),
        }
    }
}

fn wrap_container(payload: &[u8], manifest: &str) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(PAYLOAD_ENTRY, options.clone())?;
    writer.write_all(payload)?;
    writer.start_file(MANIFEST_ENTRY, options)?;
    writer.write_all(manifest.as_bytes())?;

    Ok(writer.finish()?.into_inner())
}

fn open_container(body: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(body)).map_err(|err| {
        debug!("container body is not a readable archive: {err}");
        ArchiveError::BadArchive.into()
    })
}

fn unwrap_container(body: &[u8]) -> Result<(Vec<u8>, String)> {
    let mut container = open_container(body)?;
    let payload = read_entry(&mut container, PAYLOAD_ENTRY)?;
    let manifest = read_entry(&mut container, MANIFEST_ENTRY)?;

    Ok((payload, String::from_utf8_lossy(&manifest).into_owned()))
}

fn read_entry(container: &mut ZipArchive<Cursor<&[u8]>>, name: &'static str) -> Result<Vec<u8>> {
    let mut entry = container
        .by_name(name)
        .map_err(|_| TrailerError::MissingEntry(name))?;

    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}

#[cfg(test)]
fn encode_to_vec(carrier: &[u8], payload: &[u8], manifest: Option<&str>) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let carrier_path = dir.path().join("carrier.bin");
    let output_path = dir.path().join("out.bin");
    std::fs::write(&carrier_path, carrier).unwrap();

    TrailerCodec::default()
        .encode(&carrier_path, &output_path, payload, manifest)
        .unwrap();
    std::fs::read(&output_path).unwrap()
}

#[test]
fn container_round_trip_with_manifest() {
    let produced = encode_to_vec(b"carrier bytes", b"payload archive", Some("Two text files."));

    let codec = TrailerCodec::default();
    let (payload, manifest) = codec.decode(&produced).unwrap();
    assert_eq!(payload, b"payload archive");
    assert_eq!(manifest.as_deref(), Some("Two text files."));

    assert_eq!(
        codec.peek_manifest(&produced).unwrap().as_deref(),
        Some("Two text files.")
    );
}

#[test]
fn legacy_round_trip_without_manifest() {
    let produced = encode_to_vec(b"carrier bytes", b"raw archive", None);

    let codec = TrailerCodec::default();
    let (payload, manifest) = codec.decode(&produced).unwrap();
    assert_eq!(payload, b"raw archive");
    assert_eq!(manifest, None);
    assert_eq!(codec.peek_manifest(&produced).unwrap(), None);
}

#[test]
fn bare_carrier_has_no_embedded_data() {
    let codec = TrailerCodec::default();
    let err = codec.decode(b"just an ordinary file").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrailerError>(),
        Some(TrailerError::NoEmbeddedData)
    ));
}

#[test]
fn decoy_magic_in_carrier_content_is_skipped() {
    let mut carrier = b"movie data ".to_vec();
    carrier.extend_from_slice(crate::structs::trailer::LEGACY_MAGIC);
    carrier.extend_from_slice(b" more movie data");

    let produced = encode_to_vec(&carrier, b"the real payload", None);
    let (payload, _) = TrailerCodec::default().decode(&produced).unwrap();
    assert_eq!(payload, b"the real payload");
}

#[test]
fn decoy_magic_inside_the_body_is_skipped() {
    // The payload itself contains the magic bytes, nearer end-of-file than
    // the authentic trailer magic. Trusting position alone would misparse;
    // the consistency check rejects the decoy and the scan continues
    // toward the front.
    let mut payload = b"prefix ".to_vec();
    payload.extend_from_slice(crate::structs::trailer::LEGACY_MAGIC);
    payload.extend_from_slice(b" and plenty of suffix bytes");

    let produced = encode_to_vec(b"carrier", &payload, None);
    let (recovered, _) = TrailerCodec::default().decode(&produced).unwrap();
    assert_eq!(recovered, payload);
}

#[test]
fn decoy_magic_after_the_real_trailer_is_skipped() {
    // Trailing garbage that happens to contain the magic sits closer to
    // the end than the authentic trailer; position alone would misparse.
    let mut produced = encode_to_vec(b"carrier", b"authentic", None);
    produced.extend_from_slice(crate::structs::trailer::LEGACY_MAGIC);
    produced.extend_from_slice(&[0xAA; 3]);

    // The authentic trailer no longer ends at EOF either, so the strict
    // scan reports nothing rather than guessing.
    let err = TrailerCodec::default().decode(&produced).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrailerError>(),
        Some(TrailerError::NoEmbeddedData)
    ));
}

#[test]
fn strict_mode_fails_on_inconsistent_candidates() {
    let mut produced = encode_to_vec(b"carrier", b"payload", None);
    produced.extend_from_slice(b"trailing junk");

    let mut codec = TrailerCodec::default();
    codec.set_fail_level(Level::Warn);

    let err = codec.decode(&produced).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrailerError>(),
        Some(TrailerError::InconsistentLength { .. })
    ));
}

#[test]
fn missing_container_entry_is_reported() {
    // A container trailer whose body is a zip without the expected entries.
    let mut body_writer = ZipWriter::new(Cursor::new(Vec::new()));
    body_writer
        .start_file("unrelated.txt", SimpleFileOptions::default())
        .unwrap();
    body_writer.write_all(b"?").unwrap();
    let body = body_writer.finish().unwrap().into_inner();

    let mut produced = b"carrier".to_vec();
    write_trailer(&mut produced, TrailerKind::Container, &body).unwrap();

    let err = TrailerCodec::default().decode(&produced).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrailerError>(),
        Some(TrailerError::MissingEntry(PAYLOAD_ENTRY))
    ));
}
