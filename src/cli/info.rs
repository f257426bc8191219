use std::fs;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use serde::Serialize;

use vvault::process::append::TrailerCodec;
use vvault::process::lsb;
use vvault::process::reel::ReelCodec;
use vvault::utils::capacity::{bitstream_capacity, hex_digest};
use vvault::video::{ColorMode, FrameSource};

use super::command::{Cli, InfoArgs};
use crate::y4m::Y4mReader;

/// Non-destructive probe of every format, printed as YAML.
#[derive(Debug, Serialize)]
struct ProbeReport {
    file: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    append: Option<AppendReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steganography: Option<LsbReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datareel: Option<ReelReport>,
}

#[derive(Debug, Serialize)]
struct VideoReport {
    width: u32,
    height: u32,
    frame_rate: String,
    colourspace: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AppendReport {
    format: String,
    body_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<String>,
}

#[derive(Debug, Serialize)]
struct LsbReport {
    declared_bytes: u64,
    fits_carrier: bool,
}

#[derive(Debug, Serialize)]
struct ReelReport {
    declared_bytes: u64,
    checksum: String,
}

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, _multi: Option<&MultiProgress>) -> Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let report = ProbeReport {
        file: args.input.display().to_string(),
        size_bytes: data.len() as u64,
        video: probe_video(args),
        append: probe_append(&data),
        steganography: probe_lsb(args),
        datareel: probe_reel(args),
    };

    print!("{}", serde_yaml_ng::to_string(&report)?);
    Ok(())
}

fn probe_video(args: &InfoArgs) -> Option<VideoReport> {
    let reader = Y4mReader::open(&args.input).ok()?;
    let info = reader.video_info();

    Some(VideoReport {
        width: info.width,
        height: info.height,
        frame_rate: format!("{}:{}", info.rate.0, info.rate.1),
        colourspace: match info.color {
            ColorMode::Gray => "mono",
            ColorMode::Rgb => "444",
        },
        frames: reader.frame_count(),
    })
}

fn probe_append(data: &[u8]) -> Option<AppendReport> {
    let codec = TrailerCodec::default();
    let trailer = codec.locate(data).ok().flatten()?;

    Some(AppendReport {
        format: trailer.kind.to_string(),
        body_bytes: trailer.body_len,
        manifest: codec.peek_manifest(data).ok().flatten(),
    })
}

fn probe_lsb(args: &InfoArgs) -> Option<LsbReport> {
    let mut reader = Y4mReader::open(&args.input).ok()?;
    let capacity = bitstream_capacity(&reader.video_info(), reader.frame_count()?);
    let declared = lsb::probe(&mut reader).ok()?;

    Some(LsbReport {
        declared_bytes: declared,
        fits_carrier: lsb::LENGTH_HEADER_BITS as u128 + 8 * declared as u128 <= capacity as u128,
    })
}

fn probe_reel(args: &InfoArgs) -> Option<ReelReport> {
    let mut reader = Y4mReader::open(&args.input).ok()?;
    let header = ReelCodec::default().probe(&mut reader).ok()?;

    Some(ReelReport {
        declared_bytes: header.payload_len,
        checksum: hex_digest(&header.checksum),
    })
}
