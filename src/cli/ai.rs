use std::fs;

use anyhow::{Context, Result};
use indicatif::MultiProgress;

use vvault::process::append::TrailerCodec;

use super::command::{AiArgs, AiTask, Cli};
use crate::ai;

/// AI results are emitted as `AI_RESULT:` lines so a host process can
/// read them; collaborator failures report through the same channel
/// rather than crashing.
pub fn cmd_ai(args: &AiArgs, _cli: &Cli, _multi: Option<&MultiProgress>) -> Result<()> {
    match &args.task {
        AiTask::Password => {
            let line = match ai::generate_password() {
                Ok(password) => password,
                Err(err) => format!("Error: {err}"),
            };
            println!("AI_RESULT:{line}");
        }
        AiTask::Peek { input } => {
            let data =
                fs::read(input).with_context(|| format!("reading {}", input.display()))?;

            let line = match TrailerCodec::default().peek_manifest(&data) {
                Ok(Some(manifest)) => manifest,
                Ok(None) => {
                    "No manifest found (legacy format or no embedded data).".to_owned()
                }
                Err(err) => format!("Could not read manifest: {err}"),
            };
            println!("AI_RESULT:{line}");
        }
    }

    Ok(())
}
