use std::io::{self, Write};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::reconcile::{Outcome, ProgressEvent, ProgressSink, Resolution};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Machine-readable mode: no progress rendering.
pub struct JsonOutput;

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

const BAR_WIDTH: usize = 30;

/// Single-line progress bar on stderr, redrawn after every accession.
pub struct TerminalProgress;

impl TerminalProgress {
    fn render(event: &ProgressEvent) -> io::Result<()> {
        let filled = (event.fraction() * BAR_WIDTH as f64).round() as usize;
        let bar = format!(
            "[{}{}] {:>3}% {}/{} {}",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH.saturating_sub(filled)),
            (event.fraction() * 100.0).round() as u32,
            event.processed,
            event.total,
            event.accession
        );
        let mut stderr = io::stderr();
        stderr
            .queue(MoveToColumn(0))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(SetForegroundColor(Color::Cyan))?
            .queue(Print(bar))?
            .queue(ResetColor)?;
        if event.processed == event.total {
            stderr.queue(Print("\n"))?;
        }
        stderr.flush()
    }
}

impl ProgressSink for TerminalProgress {
    fn event(&self, event: ProgressEvent) {
        if let Err(err) = Self::render(&event) {
            tracing::debug!(error = %err, "progress rendering failed");
        }
    }
}

pub fn print_summary(resolution: &Resolution) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    if resolution.records.is_empty() {
        eprintln!("{yellow}No sequences found.{reset}");
    } else {
        eprintln!(
            "{green}Resolved {} of {} accessions ({} from store, {} fetched).{reset}",
            resolution.records.len(),
            resolution.outcomes.len(),
            resolution.satisfied().count(),
            resolution.fetched().count()
        );
    }

    for (id, outcome) in &resolution.outcomes {
        if let Outcome::Unresolved { reason } = outcome {
            let detail = serde_json::to_string(reason).unwrap_or_default();
            eprintln!("{cyan}  unresolved {id}: {detail}{reset}");
        }
    }
}
