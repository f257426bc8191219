//! Archive collaborator: builds and extracts the user-file archive.
//!
//! Archives are assembled in memory, one cursor per invocation; no fixed
//! temporary paths exist, so concurrent invocations in one working
//! directory cannot collide. A password applies AES-256 entry encryption.
//! Extraction cannot distinguish a wrong password from corrupted bytes,
//! so both report as [`ArchiveError::WrongPasswordOrCorrupt`].

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::debug;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipArchive, ZipWriter};

use crate::utils::errors::ArchiveError;

/// Builds a deflate-compressed archive of `files` in memory.
///
/// Entries are stored under their file names only; zero files produce a
/// valid empty archive.
pub fn build(files: &[PathBuf], password: Option<&str>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    if let Some(password) = password {
        options = options.with_aes_encryption(AesMode::Aes256, password);
    }

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("input path has no usable file name: {}", path.display()))?;

        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

        writer.start_file(name, options.clone())?;
        writer.write_all(&data)?;
        debug!("archived {name} ({} bytes)", data.len());
    }

    Ok(writer.finish()?.into_inner())
}

/// Extracts every entry of `bytes` under `out_dir`, returning the count.
pub fn extract(bytes: &[u8], out_dir: &Path, password: Option<&str>) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|err| {
        debug!("payload is not a readable archive: {err}");
        ArchiveError::BadArchive
    })?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut extracted = 0usize;
    for index in 0..archive.len() {
        let mut entry = match password {
            Some(password) => archive
                .by_index_decrypt(index, password.as_bytes())
                .map_err(|err| {
                    debug!("entry {index} failed to open: {err}");
                    ArchiveError::WrongPasswordOrCorrupt
                })?,
            None => archive.by_index(index).map_err(|err| {
                debug!("entry {index} failed to open: {err}");
                ArchiveError::WrongPasswordOrCorrupt
            })?,
        };

        let Some(relative) = entry.enclosed_name() else {
            debug!("skipping entry with unsafe name: {}", entry.name());
            continue;
        };

        let dest = out_dir.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        // CRC and decryption failures surface while streaming the entry.
        io::copy(&mut entry, &mut out).map_err(|err| {
            debug!("entry {index} failed to extract: {err}");
            ArchiveError::WrongPasswordOrCorrupt
        })?;

        extracted += 1;
    }

    Ok(extracted)
}

#[cfg(test)]
fn stage_files(dir: &Path, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, data)| {
            let path = dir.join(name);
            fs::write(&path, data).unwrap();
            path
        })
        .collect()
}

#[test]
fn archive_round_trips_files() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = stage_files(dir.path(), &[("a.txt", b"alpha"), ("b.bin", &[0u8, 1, 2, 255])]);

    let bytes = build(&inputs, None).unwrap();
    let out = tempfile::tempdir().unwrap();
    let count = extract(&bytes, out.path(), None).unwrap();

    assert_eq!(count, 2);
    assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(out.path().join("b.bin")).unwrap(), &[0u8, 1, 2, 255]);
}

#[test]
fn empty_archive_round_trips_to_zero_files() {
    let bytes = build(&[], None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let count = extract(&bytes, out.path(), None).unwrap();
    assert_eq!(count, 0);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn wrong_password_is_reported_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = stage_files(dir.path(), &[("secret.txt", b"classified")]);

    let bytes = build(&inputs, Some("abc123")).unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = extract(&bytes, out.path(), Some("wrong")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArchiveError>(),
        Some(ArchiveError::WrongPasswordOrCorrupt)
    ));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn password_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = stage_files(dir.path(), &[("secret.txt", b"classified")]);

    let bytes = build(&inputs, Some("abc123")).unwrap();
    let out = tempfile::tempdir().unwrap();

    assert_eq!(extract(&bytes, out.path(), Some("abc123")).unwrap(), 1);
    assert_eq!(
        fs::read(out.path().join("secret.txt")).unwrap(),
        b"classified"
    );
}

#[test]
fn garbage_is_not_an_archive() {
    let out = tempfile::tempdir().unwrap();
    let err = extract(b"definitely not a zip", out.path(), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArchiveError>(),
        Some(ArchiveError::BadArchive)
    ));
}
