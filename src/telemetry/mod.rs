//! Output formatting for events and tracing initialization.

use std::io::IsTerminal;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::event_bus::Event;

pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Install a global tracing subscriber with env-filter and error context.
///
/// Filtering follows `RUST_LOG` (default `info`). Safe to call once per
/// process; subsequent calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(ErrorLayer::default())
        .try_init();
}

/// Formatter color mode for telemetry output.
///
/// - [`FormatterMode::Auto`]: detect TTY capability via `stderr.is_terminal()`
/// - [`FormatterMode::Colored`]: always include ANSI color codes
/// - [`FormatterMode::Plain`]: never include color codes (logs, files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    #[default]
    Auto,
    Colored,
    Plain,
}

impl FormatterMode {
    /// Detect formatter mode from stderr TTY capability.
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    /// Whether this mode should emit color codes. `Auto` re-detects on
    /// each call.
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Rendered output for a telemetry item, consumable by sinks.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> EventRender;
}

/// Plain text formatter with optional ANSI color codes.
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    /// Formatter with auto-detected color mode.
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    /// Formatter with an explicit color mode.
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> EventRender {
        let line = if self.mode.is_colored() {
            format!("{LINE_COLOR}{event}{RESET_COLOR}\n")
        } else {
            format!("{event}\n")
        };
        EventRender {
            context: Some(event.scope_label().to_string()),
            lines: vec![line],
        }
    }
}
