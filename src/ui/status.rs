//! Live status line.
//!
//! Runs as its own task and only ever reads snapshots from a watch channel,
//! so a slow terminal can never hold up the cleaning cycle.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use crate::cleaner::{Phase, StatusSnapshot};

const TICK_MS: u64 = 100;
const SPINNER_FRAMES: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner colour per phase: grey while waiting, blue while monitoring,
/// green while doing work.
fn spinner_style(phase: Phase) -> ProgressStyle {
    let template = match phase {
        Phase::Watching => "{spinner:.dim} {msg}",
        Phase::Monitoring => "{spinner:.blue} {msg}",
        _ => "{spinner:.green} {msg}",
    };
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_FRAMES)
}

/// One-line rendering of a snapshot.
pub fn render_status_line(snapshot: &StatusSnapshot) -> String {
    let stats = &snapshot.stats;
    format!(
        "{} | folders cleaned: {} | deleted: {} | kept: {} | freed: {} | {}",
        snapshot.phase.label().bold(),
        stats.folders_cleaned,
        stats.files_deleted.to_string().red(),
        stats.files_kept.to_string().green(),
        stats.freed_human(),
        snapshot.activity
    )
}

/// Draw snapshots until the run reaches [`Phase::Done`] or the scheduler goes away.
pub async fn run_status_display(mut rx: watch::Receiver<StatusSnapshot>) {
    let pb = ProgressBar::new_spinner();
    let mut phase = rx.borrow().phase;
    pb.set_style(spinner_style(phase));
    pb.enable_steady_tick(Duration::from_millis(TICK_MS));

    loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.phase != phase {
            phase = snapshot.phase;
            pb.set_style(spinner_style(phase));
        }
        pb.set_message(render_status_line(&snapshot));

        if snapshot.phase == Phase::Done || rx.changed().await.is_err() {
            break;
        }
    }

    pb.finish_and_clear();
}
