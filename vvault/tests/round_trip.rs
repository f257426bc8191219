//! End-to-end recovery: archive the files, embed with each method, decode,
//! extract, and compare byte for byte.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use vvault::archive;
use vvault::process::append::TrailerCodec;
use vvault::process::lsb;
use vvault::process::reel::ReelCodec;
use vvault::video::{ColorMode, Frame, FrameSource, MemorySink, MemorySource, VideoInfo};

const FILES: &[(&str, &[u8])] = &[
    ("notes.txt", b"meeting notes, draft two"),
    ("raw.bin", &[0u8, 1, 2, 3, 254, 255, 0, 128]),
    ("empty.dat", b""),
];

fn stage_inputs(dir: &Path) -> Vec<PathBuf> {
    FILES
        .iter()
        .map(|(name, data)| {
            let path = dir.join(name);
            fs::write(&path, data).unwrap();
            path
        })
        .collect()
}

fn assert_recovered(dir: &Path) {
    for (name, data) in FILES {
        assert_eq!(&fs::read(dir.join(name)).unwrap(), data, "{name}");
    }
    assert_eq!(fs::read_dir(dir).unwrap().count(), FILES.len());
}

fn lsb_carrier(frames: usize) -> MemorySource {
    let info = VideoInfo {
        width: 40,
        height: 20,
        rate: (30, 1),
        color: ColorMode::Rgb,
    };
    let frames = (0..frames)
        .map(|f| Frame {
            data: (0..info.frame_bytes())
                .map(|i| ((f * 19 + i * 3) % 256) as u8)
                .collect(),
        })
        .collect();
    MemorySource::new(info, frames)
}

#[test]
fn append_recovers_the_original_files() -> Result<()> {
    let inputs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let carrier = work.path().join("carrier.mp4");
    fs::write(&carrier, b"pretend this is a video")?;
    let produced = work.path().join("produced.mp4");

    let payload = archive::build(&stage_inputs(inputs.path()), None)?;
    let codec = TrailerCodec::default();
    codec.encode(&carrier, &produced, &payload, Some("Notes and raw data."))?;

    let produced_bytes = fs::read(&produced)?;
    let (recovered, manifest) = codec.decode(&produced_bytes)?;
    assert_eq!(manifest.as_deref(), Some("Notes and raw data."));

    archive::extract(&recovered, out.path(), None)?;
    assert_recovered(out.path());
    Ok(())
}

#[test]
fn append_with_password_recovers_the_original_files() -> Result<()> {
    let inputs = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let carrier = work.path().join("carrier.mp4");
    fs::write(&carrier, b"carrier")?;
    let produced = work.path().join("produced.mp4");

    let payload = archive::build(&stage_inputs(inputs.path()), Some("abc123"))?;
    let codec = TrailerCodec::default();
    codec.encode(&carrier, &produced, &payload, Some("Locked."))?;

    let (recovered, _) = codec.decode(&fs::read(&produced)?)?;
    archive::extract(&recovered, out.path(), Some("abc123"))?;
    assert_recovered(out.path());
    Ok(())
}

#[test]
fn steganography_recovers_the_original_files() -> Result<()> {
    let inputs = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let payload = archive::build(&stage_inputs(inputs.path()), None)?;

    let mut carrier = lsb_carrier(8);
    let mut sink = MemorySink::new(carrier.info());
    lsb::embed(&mut carrier, &mut sink, &payload)?;

    let recovered = lsb::extract(&mut sink.into_source())?;
    assert_eq!(recovered, payload);

    archive::extract(&recovered, out.path(), None)?;
    assert_recovered(out.path());
    Ok(())
}

#[test]
fn datareel_recovers_the_original_files() -> Result<()> {
    let inputs = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let payload = archive::build(&stage_inputs(inputs.path()), None)?;

    let codec = ReelCodec::default();
    let mut sink = MemorySink::new(codec.output_info());
    codec.encode(&mut sink, &payload)?;

    let recovered = codec.decode(&mut sink.into_source())?;
    assert_eq!(recovered, payload);

    archive::extract(&recovered, out.path(), None)?;
    assert_recovered(out.path());
    Ok(())
}

#[test]
fn empty_file_set_round_trips_to_zero_files() -> Result<()> {
    let work = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    let carrier = work.path().join("carrier.mp4");
    fs::write(&carrier, b"carrier")?;
    let produced = work.path().join("produced.mp4");

    let payload = archive::build(&[], None)?;
    let codec = TrailerCodec::default();
    codec.encode(&carrier, &produced, &payload, Some("Nothing inside."))?;

    let (recovered, _) = codec.decode(&fs::read(&produced)?)?;
    assert_eq!(archive::extract(&recovered, out.path(), None)?, 0);
    assert_eq!(fs::read_dir(out.path())?.count(), 0);
    Ok(())
}
