//! Two-round generation with an optional tool round in between.

use std::sync::Arc;
use std::time::Instant;
use lectern_core::course::Source;
use lectern_core::event::{DomainEvent, EventBus};
use lectern_core::message::{Message, MessageToolCall, SessionId};
use lectern_core::provider::{Provider, ProviderRequest, ProviderResponse, Reply, ToolDefinition};
use lectern_core::tool::{ToolCall, ToolRegistry, ToolScope};
use tracing::{debug, info, warn};
use crate::prompt::{query_prompt, system_prompt};

/// The outcome of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub answer: String,
    pub sources: Vec<Source>,
    pub used_tools: bool,
    pub tokens_used: u32,
}

/// Drives the LLM through round 1, the optional tool round and round 2.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 800,
            tools,
            event_bus,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, messages: &[Message], tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools,
            stop: vec![],
        }
    }

    async fn call(&self, request: ProviderRequest) -> Result<ProviderResponse, lectern_core::Error> {
        match self.provider.complete(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("generation via {}", self.provider.name()),
                    error_message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e.into())
            }
        }
    }

    /// Answer `query`, optionally in the light of earlier `history`.
    ///
    /// Provider failures propagate as [`lectern_core::Error::Generation`];
    /// tool failures are handed to the model as text.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        session_id: &SessionId,
    ) -> Result<Generation, lectern_core::Error> {
        info!(session_id = %session_id, has_history = history.is_some(), "Generating answer");

        let mut scope = ToolScope::new(Arc::clone(&self.tools));
        let mut messages = vec![Message::system(system_prompt(history)), Message::user(query_prompt(query))];

        let first = self.call(self.request(&messages, scope.definitions())).await?;
        let mut tokens_used = first.total_tokens();

        let (answer, used_tools) = match first.reply() {
            Reply::Text(text) => {
                debug!(session_id = %session_id, "Direct answer");
                (text, false)
            }
            Reply::ToolCalls { preamble, calls } => {
                messages.push(Message::assistant_tool_calls(preamble, calls.clone()));
                messages.extend(self.run_tool_round(&mut scope, &calls).await);

                let second = self.call(self.request(&messages, Vec::new())).await?;
                tokens_used += second.total_tokens();
                let answer = match second.reply() {
                    Reply::Text(text) => text,
                    Reply::ToolCalls { preamble, calls } => {
                        warn!(
                            session_id = %session_id,
                            ignored = calls.len(),
                            "Synthesis round requested more tools; ignoring"
                        );
                        preamble
                    }
                };
                (answer, true)
            }
        };

        let sources = scope.take_sources();
        self.event_bus.publish(DomainEvent::ResponseGenerated {
            session_id: session_id.to_string(),
            model: self.model.clone(),
            tokens_used,
            used_tools,
            timestamp: chrono::Utc::now(),
        });
        info!(session_id = %session_id, used_tools, sources = sources.len(), tokens_used, "Answer ready");

        Ok(Generation {
            answer,
            sources,
            used_tools,
            tokens_used,
        })
    }

    /// Run every requested call and build one tool-result message per call,
    /// in request order.
    async fn run_tool_round(&self, scope: &mut ToolScope, calls: &[MessageToolCall]) -> Vec<Message> {
        let parsed: Vec<_> = calls.iter().map(ToolCall::from_message).collect();
        let runnable: Vec<ToolCall> = parsed.iter().filter_map(|p| p.as_ref().ok().cloned()).collect();

        let start = Instant::now();
        let mut executed = scope.execute_round(&runnable).await.into_iter();
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut results = Vec::with_capacity(calls.len());
        for (call, parsed) in calls.iter().zip(parsed) {
            let outcome = match parsed {
                Ok(_) => executed.next(),
                Err(e) => Some(Err(e)),
            };
            let (text, success) = match outcome {
                Some(Ok(result)) => (result.output, result.success),
                Some(Err(e)) => (format!("Error: {e}"), false),
                None => ("Error: tool produced no result".to_string(), false),
            };

            debug!(tool = %call.name, success, "Tool call finished");
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success,
                duration_ms,
                timestamp: chrono::Utc::now(),
            });
            results.push(Message::tool_result(call.id.clone(), text));
        }
        results
    }
}
