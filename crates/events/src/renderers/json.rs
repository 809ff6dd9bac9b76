//! JSON renderer for tend events.
//!
//! Renders events as JSON lines for machine consumption.
//! This module is allowed to use println! as it's the output layer.

#![allow(clippy::print_stdout)]

use crate::event::TendEvent;
use crate::layer::EventSink;

/// JSON renderer that outputs events as JSON lines.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    /// Whether to pretty-print JSON.
    pretty: bool,
}

impl JsonRenderer {
    /// Create a new JSON renderer with compact output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON renderer with pretty-printed output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Serialize a single event.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; events are plain data so this is not
    /// expected in practice.
    pub fn to_json(&self, event: &TendEvent) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        }
    }

    /// Render a single event as JSON.
    pub fn render(&self, event: &TendEvent) {
        if let Ok(json) = self.to_json(event) {
            println!("{json}");
        }
    }
}

impl EventSink for JsonRenderer {
    fn handle(&self, event: TendEvent) {
        self.render(&event);
    }
}
