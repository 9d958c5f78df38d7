pub mod terminal;
pub mod web;

use std::sync::Arc;

use log::warn;
use serde::Serialize;

use crate::bridge::{TurnBridge, TurnObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
    Error,
}

/// One visible line of the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub speaker: Speaker,
    pub text: String,
}

/// What the UI shows for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub is_error: bool,
}

/// A per-user chat: the turn bridge plus what the user can see.
pub struct ChatSession {
    bridge: TurnBridge,
    transcript: Vec<Entry>,
}

/// Holds the session's processing state: the observer hears
/// `turn_started` on creation and `turn_finished` on drop, whichever way
/// the turn ends.
struct Processing {
    observer: Arc<dyn TurnObserver>,
    ok: bool,
}

impl Processing {
    fn start(bridge: &TurnBridge) -> Self {
        let observer = Arc::clone(bridge.observer());
        observer.turn_started();
        Self {
            observer,
            ok: false,
        }
    }
}

impl Drop for Processing {
    fn drop(&mut self) {
        self.observer.turn_finished(self.ok);
    }
}

impl ChatSession {
    pub fn new(bridge: TurnBridge) -> Self {
        Self {
            bridge,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[Entry] {
        &self.transcript
    }

    #[cfg(test)]
    pub fn bridge(&self) -> &TurnBridge {
        &self.bridge
    }

    /// Handles one line of user input. Blank input yields `None`. Errors are
    /// rendered into the reply, never returned.
    pub async fn on_submit(&mut self, text: &str) -> Option<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut guard = Processing::start(&self.bridge);
        self.transcript.push(Entry {
            speaker: Speaker::User,
            text: text.to_string(),
        });

        let reply = match self.bridge.submit(text).await {
            Ok(answer) => {
                guard.ok = true;
                Reply {
                    text: answer,
                    is_error: false,
                }
            }
            Err(e) => {
                warn!("turn failed: {e}");
                Reply {
                    text: format!("Error: {e}"),
                    is_error: true,
                }
            }
        };
        self.transcript.push(Entry {
            speaker: if reply.is_error {
                Speaker::Error
            } else {
                Speaker::Assistant
            },
            text: reply.text.clone(),
        });
        Some(reply)
    }
}
