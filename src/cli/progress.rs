//! Progress channel: coarse milestones for humans and host processes.

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Reports milestones as a monotonically non-decreasing percentage.
///
/// Interactive runs get an indicatif bar; `--machine-progress` emits
/// `PROGRESS:<pct>:<msg>` lines on stdout for a host process. Every
/// outcome, success or recovered failure, terminates at 100.
pub struct Reporter {
    bar: Option<ProgressBar>,
    machine: bool,
    last_pct: u64,
}

impl Reporter {
    pub fn new(multi: Option<&MultiProgress>, machine: bool) -> Result<Self> {
        let bar = match multi {
            Some(multi) => {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos:>3}% {msg}",
                )?);
                Some(bar)
            }
            None => None,
        };

        Ok(Self {
            bar,
            machine,
            last_pct: 0,
        })
    }

    pub fn update(&mut self, pct: u64, msg: &str) {
        let pct = pct.clamp(self.last_pct, 100);
        self.last_pct = pct;

        if let Some(bar) = &self.bar {
            bar.set_position(pct);
            bar.set_message(msg.to_owned());
        }
        if self.machine {
            println!("PROGRESS:{pct}:{msg}");
        }
        log::debug!("progress {pct}%: {msg}");
    }

    /// Terminal milestone.
    pub fn finish(&mut self, msg: &str) {
        self.update(100, msg);
        if let Some(bar) = &self.bar {
            bar.finish_with_message(msg.to_owned());
        } else if !self.machine {
            println!("{msg}");
        }
    }
}
