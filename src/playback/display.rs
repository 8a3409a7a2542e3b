use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Where the active word, clocks, and errors are rendered.
///
/// At most one word is visible at a time; `show_word` replaces it.
pub trait DisplaySink {
    fn show_word(&mut self, word: &str);
    fn clear(&mut self);
    fn show_error(&mut self, message: &str);
    fn show_clock(&mut self, _clock: &str) {}
    fn show_elapsed(&mut self, _elapsed: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Word(String),
    Clear,
    Error(String),
}

/// Keeps what would have been shown. Used for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub events: Vec<DisplayEvent>,
    pub current: Option<String>,
    pub clock: Option<String>,
    pub elapsed: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words in the order they were shown.
    pub fn words(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Word(w) => Some(w.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Error(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySink for MemorySink {
    fn show_word(&mut self, word: &str) {
        self.current = Some(word.to_string());
        self.events.push(DisplayEvent::Word(word.to_string()));
    }

    fn clear(&mut self) {
        self.current = None;
        self.events.push(DisplayEvent::Clear);
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(DisplayEvent::Error(message.to_string()));
    }

    fn show_clock(&mut self, clock: &str) {
        self.clock = Some(clock.to_string());
    }

    fn show_elapsed(&mut self, elapsed: &str) {
        self.elapsed = Some(elapsed.to_string());
    }
}

/// A single refreshing terminal line: `[clock] [elapsed]  word`.
pub struct TerminalSink {
    line: ProgressBar,
    clock: String,
    elapsed: String,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSink {
    pub fn new() -> Self {
        let line = ProgressBar::new_spinner();
        line.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {prefix:.dim} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        line.enable_steady_tick(Duration::from_millis(100));
        Self {
            line,
            clock: String::new(),
            elapsed: String::new(),
        }
    }

    fn refresh_prefix(&self) {
        self.line
            .set_prefix(format!("{} {}", self.clock, self.elapsed).trim().to_string());
    }
}

impl DisplaySink for TerminalSink {
    fn show_word(&mut self, word: &str) {
        self.line.set_message(style(word).bold().to_string());
    }

    fn clear(&mut self) {
        self.line.set_message("");
    }

    fn show_error(&mut self, message: &str) {
        self.line.println(style(format!("✗ {}", message)).red().to_string());
    }

    fn show_clock(&mut self, clock: &str) {
        self.clock = clock.to_string();
        self.refresh_prefix();
    }

    fn show_elapsed(&mut self, elapsed: &str) {
        self.elapsed = elapsed.to_string();
        self.refresh_prefix();
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        self.line.finish_and_clear();
    }
}
