pub mod ai;
pub mod command;
pub mod decode;
pub mod encode;
pub mod info;
pub mod progress;

use anyhow::Result;

use vvault::utils::errors::{AiError, ArchiveError, ReelError, StreamError, TrailerError};

use self::progress::Reporter;

/// Operation boundary: classified errors become a terminal status message
/// at 100% and a clean exit; anything unclassified propagates.
pub(crate) fn conclude(outcome: Result<String>, reporter: &mut Reporter) -> Result<()> {
    match outcome {
        Ok(message) => {
            reporter.finish(&message);
            Ok(())
        }
        Err(err) if is_classified(&err) => {
            log::error!("{err:#}");
            reporter.finish(&format!("Error: {err}"));
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn is_classified(err: &anyhow::Error) -> bool {
    err.downcast_ref::<TrailerError>().is_some()
        || err.downcast_ref::<StreamError>().is_some()
        || err.downcast_ref::<ReelError>().is_some()
        || err.downcast_ref::<ArchiveError>().is_some()
        || err.downcast_ref::<AiError>().is_some()
}
