//! Stateful mapping from an [`events::Event`] stream to the AG-UI wire
//! event sequence (spec §6.5).
//!
//! The translator never inspects the graph engine's internals; it only
//! looks at each event's `response` and `state_delta` fields and the
//! `tool_calls`/`content`/`role` conventions the model layer serializes
//! messages with, treating everything else opaquely.

use crate::error::{Result, TranslatorError};
use crate::wire::WireEvent;
use events::{Event, ResponseKind};
use std::collections::{HashMap, HashSet};

/// Tracks which `*-start` ids are still open so `translate_event` can emit
/// the matching `*-end` and so `finish_*` can assert every started id was
/// eventually closed (spec §8: "every `*-start` has a matching `*-end`").
pub struct Translator {
    thread_id: String,
    run_id: String,
    started: bool,
    finished: bool,
    open_text_messages: HashSet<String>,
    open_tool_calls: HashSet<String>,
    known_tool_call_ids: HashSet<String>,
}

impl Translator {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            started: false,
            finished: false,
            open_text_messages: HashSet::new(),
            open_tool_calls: HashSet::new(),
            known_tool_call_ids: HashSet::new(),
        }
    }

    /// Emits `run-started`. Must be called exactly once, before any other
    /// method.
    pub fn run_started(&mut self) -> Result<WireEvent> {
        if self.started {
            return Err(TranslatorError::AlreadyStarted);
        }
        self.started = true;
        Ok(WireEvent::RunStarted {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
        })
    }

    /// Maps one internal event to zero or more wire events, in emission
    /// order.
    pub fn translate_event(&mut self, event: &Event) -> Result<Vec<WireEvent>> {
        if !self.started {
            return Err(TranslatorError::NotStarted);
        }
        if self.finished {
            return Err(TranslatorError::AlreadyFinished);
        }

        let mut out = Vec::new();

        if let Some(response) = &event.response {
            for choice in &response.choices {
                let payload = choice.delta_message.as_ref().or(choice.message.as_ref());
                let Some(payload) = payload else { continue };

                match response.kind {
                    ResponseKind::Chunk => self.translate_text_delta(payload, &mut out)?,
                    ResponseKind::Final => {
                        self.translate_text_delta(payload, &mut out)?;
                        self.translate_tool_calls(payload, &mut out)?;
                        self.close_open_text_messages(payload, &mut out);
                    }
                    ResponseKind::ToolCall => {
                        self.translate_tool_calls(payload, &mut out)?;
                        self.close_open_tool_calls(payload, &mut out);
                    }
                    ResponseKind::ToolResponse => self.translate_tool_result(payload, &mut out)?,
                    ResponseKind::Error => {}
                }
            }
        }

        if !event.state_delta.is_empty() {
            out.push(WireEvent::StateSnapshot {
                state: decode_state_delta(&event.state_delta),
            });
        }

        Ok(out)
    }

    fn translate_text_delta(&mut self, payload: &serde_json::Value, out: &mut Vec<WireEvent>) -> Result<()> {
        let Some(content) = payload.get("content").and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let id = message_id(payload)?;
        let role = payload
            .get("role")
            .and_then(|v| v.as_str())
            .unwrap_or("assistant")
            .to_string();

        if self.open_text_messages.insert(id.clone()) {
            out.push(WireEvent::TextMessageStart { id: id.clone(), role });
        }
        out.push(WireEvent::TextMessageContent {
            id,
            delta: content.to_string(),
        });
        Ok(())
    }

    fn close_open_text_messages(&mut self, payload: &serde_json::Value, out: &mut Vec<WireEvent>) {
        if payload.get("content").is_none() {
            return;
        }
        if let Ok(id) = message_id(payload) {
            if self.open_text_messages.remove(&id) {
                out.push(WireEvent::TextMessageEnd { id });
            }
        }
    }

    fn translate_tool_calls(&mut self, payload: &serde_json::Value, out: &mut Vec<WireEvent>) -> Result<()> {
        let Some(calls) = payload.get("tool_calls").and_then(|v| v.as_array()) else {
            return Ok(());
        };
        let parent_message_id = payload.get("id").and_then(|v| v.as_str()).map(str::to_string);

        for call in calls {
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| TranslatorError::Malformed("tool call missing id".to_string()))?
                .to_string();
            let name = call
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| TranslatorError::Malformed("tool call missing name".to_string()))?
                .to_string();
            let arguments = call.get("arguments").cloned().unwrap_or(serde_json::Value::Null);

            if self.open_tool_calls.insert(id.clone()) {
                out.push(WireEvent::ToolCallStart {
                    id: id.clone(),
                    name,
                    parent_message_id: parent_message_id.clone(),
                });
            }
            out.push(WireEvent::ToolCallArgs {
                id: id.clone(),
                delta: serde_json::to_string(&arguments)
                    .map_err(|e| TranslatorError::Malformed(e.to_string()))?,
            });
            self.known_tool_call_ids.insert(id);
        }
        Ok(())
    }

    fn close_open_tool_calls(&mut self, payload: &serde_json::Value, out: &mut Vec<WireEvent>) {
        let Some(calls) = payload.get("tool_calls").and_then(|v| v.as_array()) else {
            return;
        };
        for call in calls {
            if let Some(id) = call.get("id").and_then(|v| v.as_str()) {
                if self.open_tool_calls.remove(id) {
                    out.push(WireEvent::ToolCallEnd { id: id.to_string() });
                }
            }
        }
    }

    fn translate_tool_result(&mut self, payload: &serde_json::Value, out: &mut Vec<WireEvent>) -> Result<()> {
        let tool_call_id = payload
            .get("tool_call_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TranslatorError::Malformed("tool result missing tool_call_id".to_string()))?
            .to_string();
        if !self.known_tool_call_ids.contains(&tool_call_id) {
            return Err(TranslatorError::UnknownToolCallId(tool_call_id));
        }
        let message_id = message_id(payload).unwrap_or_else(|_| tool_call_id.clone());
        let content = payload
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        out.push(WireEvent::ToolCallResult {
            message_id,
            tool_call_id,
            content,
        });
        Ok(())
    }

    /// Emits `run-finished`, the terminal, non-error end of the run.
    pub fn finish_ok(&mut self) -> Result<WireEvent> {
        if self.finished {
            return Err(TranslatorError::AlreadyFinished);
        }
        self.finished = true;
        Ok(WireEvent::RunFinished {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
        })
    }

    /// Emits `run-error`, the terminal, error end of the run.
    pub fn finish_error(&mut self, message: impl Into<String>) -> Result<WireEvent> {
        if self.finished {
            return Err(TranslatorError::AlreadyFinished);
        }
        self.finished = true;
        Ok(WireEvent::RunError {
            message: message.into(),
        })
    }

    /// Ids started but never closed — a non-empty result means the stream
    /// ended without satisfying the start/end invariant.
    pub fn unclosed_ids(&self) -> (Vec<String>, Vec<String>) {
        let mut text = self.open_text_messages.iter().cloned().collect::<Vec<_>>();
        let mut tools = self.open_tool_calls.iter().cloned().collect::<Vec<_>>();
        text.sort();
        tools.sort();
        (text, tools)
    }
}

fn message_id(payload: &serde_json::Value) -> Result<String> {
    payload
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| TranslatorError::Malformed("message payload missing id".to_string()))
}

fn decode_state_delta(state_delta: &HashMap<String, Vec<u8>>) -> HashMap<String, serde_json::Value> {
    state_delta
        .iter()
        .map(|(k, v)| {
            let decoded = serde_json::from_slice(v)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(v).into_owned()));
            (k.clone(), decoded)
        })
        .collect()
}
