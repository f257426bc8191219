use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::MultiProgress;
use log::Level;

use vvault::archive;
use vvault::process::append::TrailerCodec;
use vvault::process::reel::ReelCodec;
use vvault::process::{Method, lsb};

use super::command::{Cli, EncodeArgs};
use super::conclude;
use super::progress::Reporter;
use crate::ai;
use crate::y4m::{Y4mReader, Y4mWriter};

/// Manifest stored when the AI collaborator is disabled or unreachable.
const FALLBACK_MANIFEST: &str = "No summary available.";

pub fn cmd_encode(args: &EncodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let mut reporter = Reporter::new(multi, cli.machine_progress)?;

    let outcome = match args.method.to_method() {
        Method::Append => encode_append(args, cli, &mut reporter),
        Method::Steganography => encode_lsb(args, &mut reporter),
        Method::DataReel => encode_reel(args, &mut reporter),
    };

    conclude(outcome, &mut reporter)
}

fn encode_append(args: &EncodeArgs, cli: &Cli, reporter: &mut Reporter) -> Result<String> {
    let (carrier, files) = split_carrier(&args.inputs);

    let manifest = if args.no_ai_manifest {
        FALLBACK_MANIFEST.to_owned()
    } else {
        reporter.update(5, "Generating manifest...");
        match ai::summarize(files) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("manifest generation unavailable: {err}");
                FALLBACK_MANIFEST.to_owned()
            }
        }
    };
    reporter.update(10, &format!("Manifest: {manifest}"));

    reporter.update(15, "Archiving files...");
    let payload = archive::build(files, args.password.as_deref())?;

    reporter.update(20, "Container created. Appending to carrier...");
    let mut codec = TrailerCodec::default();
    if cli.strict {
        codec.set_fail_level(Level::Warn);
    }
    codec.encode(carrier, &args.output, &payload, Some(&manifest))?;

    Ok(format!(
        "Encoding complete. Output written to {}",
        args.output.display()
    ))
}

fn encode_lsb(args: &EncodeArgs, reporter: &mut Reporter) -> Result<String> {
    let (carrier, files) = split_carrier(&args.inputs);

    let payload = archive::build(files, args.password.as_deref())?;
    reporter.update(10, "Data prepared for embedding.");

    let mut source = Y4mReader::open(carrier)?;
    let mut sink = Y4mWriter::create(&args.output, source.video_info())?;

    if let Err(err) = lsb::embed(&mut source, &mut sink, &payload) {
        discard_output(sink, &args.output);
        return Err(err);
    }

    reporter.update(95, "Frames written.");
    Ok("Steganography encoding complete.".to_owned())
}

fn encode_reel(args: &EncodeArgs, reporter: &mut Reporter) -> Result<String> {
    let payload = archive::build(&args.inputs, args.password.as_deref())?;
    reporter.update(20, "Data prepared. Generating video frames...");

    let codec = ReelCodec::default();
    let mut sink = Y4mWriter::create(&args.output, codec.output_info())?;

    if let Err(err) = codec.encode(&mut sink, &payload) {
        discard_output(sink, &args.output);
        return Err(err);
    }

    reporter.update(95, "Frames written.");
    Ok("Data-Reel video created successfully.".to_owned())
}

fn split_carrier(inputs: &[PathBuf]) -> (&PathBuf, &[PathBuf]) {
    // clap guarantees at least one input; the rest may legally be empty.
    (&inputs[0], &inputs[1..])
}

/// A failed embed must not leave a partial output behind.
fn discard_output<W: std::io::Write>(sink: Y4mWriter<W>, path: &Path) {
    drop(sink);
    if let Err(err) = fs::remove_file(path) {
        log::warn!("could not remove partial output {}: {err}", path.display());
    }
}
