//! Newline-delimited JSON input for the headless client.
//!
//! Each non-empty line is one of:
//!
//! ```text
//! {"event": "sync_play", "payload": {...}}
//! {"signal": "connected"} | {"signal": "disconnected", "reason": "..."}
//! {"intent": "toggle" | "next" | "previous"} | {"intent": "seek", "position": 42.0}
//! ```
//!
//! Lines starting with `#` are ignored.

use anyhow::{bail, Context, Result};
use roomsync_core::{ConnectionLifecycle, EngineHandle};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Toggle,
    Next,
    Previous,
    Seek,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    /// A wire event from the authority.
    Event {
        event: String,
        #[serde(default)]
        payload: Value,
    },
    /// A transport connection change.
    Signal {
        signal: SignalKind,
        #[serde(default)]
        reason: Option<String>,
    },
    /// A local user control.
    Intent {
        intent: IntentKind,
        #[serde(default)]
        position: Option<f64>,
    },
}

/// Parses one line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<InputLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let parsed = serde_json::from_str(trimmed)
        .with_context(|| format!("Unrecognized input line: {}", trimmed))?;
    Ok(Some(parsed))
}

/// Feeds one input line into the engine.
pub fn dispatch(engine: &EngineHandle, line: InputLine) -> Result<()> {
    match line {
        InputLine::Event { event, payload } => {
            let payload = if payload.is_null() {
                Value::Object(Default::default())
            } else {
                payload
            };
            engine
                .on_event(&event, payload)
                .with_context(|| format!("Rejected event '{}'", event))?;
        }
        InputLine::Signal {
            signal: SignalKind::Connected,
            ..
        } => engine.on_connected(),
        InputLine::Signal {
            signal: SignalKind::Disconnected,
            reason,
        } => engine.on_disconnected(reason),
        InputLine::Intent { intent, position } => match intent {
            IntentKind::Toggle => engine.toggle_play_pause()?,
            IntentKind::Next => engine.next()?,
            IntentKind::Previous => engine.previous()?,
            IntentKind::Seek => {
                let Some(position) = position else {
                    bail!("Seek intent requires a position");
                };
                engine.seek(position)?;
            }
        },
    }
    Ok(())
}
