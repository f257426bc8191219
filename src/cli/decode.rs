use std::fs;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::Level;

use vvault::archive;
use vvault::process::append::TrailerCodec;
use vvault::process::reel::ReelCodec;
use vvault::process::{Method, lsb};

use super::command::{Cli, DecodeArgs};
use super::conclude;
use super::progress::Reporter;
use crate::y4m::Y4mReader;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let mut reporter = Reporter::new(multi, cli.machine_progress)?;

    let outcome = match args.method.to_method() {
        Method::Append => decode_append(args, cli, &mut reporter),
        Method::Steganography => decode_lsb(args, &mut reporter),
        Method::DataReel => decode_reel(args, cli, &mut reporter),
    };

    conclude(outcome, &mut reporter)
}

fn decode_append(args: &DecodeArgs, cli: &Cli, reporter: &mut Reporter) -> Result<String> {
    reporter.update(0, "Searching for embedded data...");
    let data = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let mut codec = TrailerCodec::default();
    if cli.strict {
        codec.set_fail_level(Level::Warn);
    }

    let (payload, manifest) = codec.decode(&data)?;
    match &manifest {
        Some(text) => reporter.update(10, &format!("Container format detected. Manifest: {text}")),
        None => reporter.update(10, "Legacy format detected. No manifest available."),
    }

    reporter.update(20, "Extracting archive...");
    let count = archive::extract(&payload, &args.output, args.password.as_deref())?;

    Ok(success_message(count, args))
}

fn decode_lsb(args: &DecodeArgs, reporter: &mut Reporter) -> Result<String> {
    reporter.update(5, "Reading video frames...");
    let mut source = Y4mReader::open(&args.input)?;

    let payload = lsb::extract(&mut source)?;
    reporter.update(90, "Data extracted. Unpacking archive...");

    let count = archive::extract(&payload, &args.output, args.password.as_deref())?;
    if count == 0 {
        return Ok("Decoded video contained no embedded files.".to_owned());
    }

    Ok(success_message(count, args))
}

fn decode_reel(args: &DecodeArgs, cli: &Cli, reporter: &mut Reporter) -> Result<String> {
    reporter.update(5, "Reading Data-Reel video...");
    let mut source = Y4mReader::open(&args.input)?;

    let mut codec = ReelCodec::default();
    if cli.strict {
        codec.set_fail_level(Level::Warn);
    }

    let payload = codec.decode(&mut source)?;
    reporter.update(85, "Checksum OK. Extracting archive...");

    let count = archive::extract(&payload, &args.output, args.password.as_deref())?;
    Ok(success_message(count, args))
}

fn success_message(count: usize, args: &DecodeArgs) -> String {
    format!(
        "Success. {count} file(s) extracted to {}",
        args.output.display()
    )
}
