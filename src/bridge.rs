use std::sync::Arc;

use log::{debug, info, warn};

use crate::conversation::{
    Conversation, ToolCallRequest, ToolCallResult, ToolFailure, ToolOutput, Turn,
};
use crate::error::Result;
use crate::llm::{Completion, CompletionClient};
use crate::mcp::ToolRegistry;

pub const EMPTY_RESPONSE: &str = "(empty response)";

/// Where a turn is. A turn visits `ToolDispatch` and `SecondCompletion` only
/// when the first completion asks for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TurnState {
    AwaitingUserInput,
    FirstCompletion,
    ToolDispatch,
    SecondCompletion,
    Done,
}

/// Hooks for showing turn progress. All methods default to no-ops.
pub trait TurnObserver: Send + Sync {
    fn turn_started(&self) {}

    fn state_changed(&self, _state: TurnState, _tool: Option<&str>) {}

    fn turn_finished(&self, _ok: bool) {}
}

struct Silent;

impl TurnObserver for Silent {}

/// Runs one user turn at a time against a completion client and the tool
/// registry, and owns the conversation.
pub struct TurnBridge {
    llm: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    system: String,
    conversation: Conversation,
    state: TurnState,
    observer: Arc<dyn TurnObserver>,
}

impl TurnBridge {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        registry: Arc<ToolRegistry>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            registry,
            system: system.into(),
            conversation: Conversation::new(),
            state: TurnState::AwaitingUserInput,
            observer: Arc::new(Silent),
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn TurnObserver>) {
        self.observer = observer;
    }

    pub fn observer(&self) -> &Arc<dyn TurnObserver> {
        &self.observer
    }

    #[cfg(test)]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[cfg(test)]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Resolves one user message into an answer. The turn is built on a copy
    /// of the conversation and committed only once it reaches `Done`, so a
    /// failed or dropped turn leaves the conversation as it was.
    pub async fn submit(&mut self, text: &str) -> Result<String> {
        let mut draft = self.conversation.clone();
        match self.run_turn(&mut draft, text).await {
            Ok(answer) => {
                debug_assert!(draft.is_well_formed(), "turn left a dangling tool call");
                self.conversation = draft;
                debug!(
                    "conversation has {} turns, last {:?}",
                    self.conversation.len(),
                    self.conversation.last().map(Turn::role)
                );
                Ok(answer)
            }
            Err(e) => {
                warn!("turn failed in {}: {e}", self.state);
                self.enter(TurnState::AwaitingUserInput, None);
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self, conversation: &mut Conversation, text: &str) -> Result<String> {
        self.enter(TurnState::AwaitingUserInput, None);
        conversation.push(Turn::User(text.to_string()));

        self.enter(TurnState::FirstCompletion, None);
        let answer = match self.complete(conversation).await? {
            Completion::Answer(text) => text,
            Completion::ToolCall { text, call } => {
                conversation.push(Turn::ToolCall {
                    text,
                    call: call.clone(),
                });

                self.enter(TurnState::ToolDispatch, Some(&call.name));
                let result = self.dispatch(call).await;
                conversation.push(Turn::ToolResult(result));

                self.enter(TurnState::SecondCompletion, None);
                match self.complete(conversation).await? {
                    Completion::Answer(text) => text,
                    // Single hop per turn: a further request is shown as text.
                    Completion::ToolCall { text, call } => {
                        warn!("model asked for {} after a tool result, not dispatching", call.name);
                        text.unwrap_or_default()
                    }
                }
            }
        };

        let answer = if answer.trim().is_empty() {
            EMPTY_RESPONSE.to_string()
        } else {
            answer
        };
        conversation.push(Turn::Assistant(answer.clone()));
        self.enter(TurnState::Done, None);
        Ok(answer)
    }

    async fn complete(&self, conversation: &Conversation) -> Result<Completion> {
        let response = self
            .llm
            .complete(&self.system, conversation, self.registry.descriptors())
            .await?;
        info!(
            "usage: {} input, {} output tokens",
            response.usage.input_tokens, response.usage.output_tokens
        );
        Ok(response.completion)
    }

    /// Runs the requested tool. Failures become the tool's result so the
    /// model can explain them.
    async fn dispatch(&self, call: ToolCallRequest) -> ToolCallResult {
        info!("calling tool: {}", call.name);
        let output = match self.registry.call(&call.name, call.arguments).await {
            Ok(value) => ToolOutput::Success(value),
            Err(e) => {
                warn!("tool {} error: {e}", call.name);
                ToolOutput::Failure(ToolFailure::from(e))
            }
        };
        ToolCallResult {
            call_id: call.id,
            name: call.name,
            output,
        }
    }

    fn enter(&mut self, state: TurnState, tool: Option<&str>) {
        debug!("{} -> {state}", self.state);
        self.state = state;
        self.observer.state_changed(state, tool);
    }
}
