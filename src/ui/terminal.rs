use std::io::Write;
use std::sync::{Arc, Mutex};

use clx::progress::{ProgressJob, ProgressJobBuilder, ProgressStatus};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ChatSession;
use crate::bridge::{TurnObserver, TurnState};
use crate::error::Result;

/// Spinner shown while a turn is in flight.
#[derive(Default)]
pub struct Spinner {
    job: Mutex<Option<Arc<ProgressJob>>>,
}

impl Spinner {
    fn with_job(&self, f: impl FnOnce(&Arc<ProgressJob>)) {
        if let Some(job) = self.job.lock().ok().and_then(|job| job.clone()) {
            f(&job);
        }
    }
}

impl TurnObserver for Spinner {
    fn turn_started(&self) {
        let job = ProgressJobBuilder::new()
            .body("{{spinner()}} {{message | flex}}")
            .prop("message", "Thinking...")
            .start();
        if let Ok(mut slot) = self.job.lock() {
            *slot = Some(job);
        }
    }

    fn state_changed(&self, state: TurnState, tool: Option<&str>) {
        let message = match (state, tool) {
            (TurnState::ToolDispatch, Some(tool)) => format!("Looking up {tool}..."),
            (TurnState::SecondCompletion, _) => "Composing answer...".to_string(),
            _ => return,
        };
        self.with_job(|job| job.prop("message", &message));
    }

    fn turn_finished(&self, ok: bool) {
        self.with_job(|job| {
            if ok {
                job.set_status(ProgressStatus::Done);
                job.prop("message", "Done");
            } else {
                job.set_status(ProgressStatus::Warn);
                job.prop("message", "Failed");
            }
        });
        if let Ok(mut slot) = self.job.lock() {
            *slot = None;
        }
        clx::progress::flush();
    }
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "quit" | "exit")
}

fn prompt() {
    if console::user_attended() {
        eprint!("{} ", style("Query:").cyan().bold());
        let _ = std::io::stderr().flush();
    }
}

/// Reads queries from stdin until `quit`, `exit` or end of input.
pub async fn run(mut session: ChatSession, tools: usize) -> Result<()> {
    if console::user_attended() {
        eprintln!(
            "{} {}",
            style("Medical Finder").bold(),
            style(format!("(tools ready: {tools}, type 'quit' to exit)")).dim()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        if is_quit(&line) {
            break;
        }
        if let Some(reply) = session.on_submit(&line).await {
            if reply.is_error {
                eprintln!("{}", style(&reply.text).red());
            } else {
                println!("{}\n", reply.text);
            }
        }
        prompt();
    }
    log::info!("chat session ended after {} entries", session.transcript().len());
    Ok(())
}
