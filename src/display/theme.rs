//! Terminal styling for corpusmap messages.
//!
//! Colors are dropped when `NO_COLOR` is set or stdout is not a terminal,
//! so piped `analyze --json` output stays clean.

use console::Style;
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::path::Path;
use std::sync::LazyLock;

/// Shared theme for CLI output.
pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

/// Kind of one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Failed,
    Warning,
}

impl Status {
    fn icon(self) -> &'static str {
        match self {
            Status::Ok => "✓",
            Status::Failed => "✗",
            Status::Warning => "⚠",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    /// Section titles
    pub header: Style,
    pub dim: Style,
    /// Input and output locations
    pub path: Style,
    /// Counts and thresholds
    pub number: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style::new().green().bright(),
            error: Style::new().red().bright(),
            warning: Style::new().yellow().bright(),
            header: Style::new().cyan().bold(),
            dim: Style::new().dim(),
            path: Style::new().magenta(),
            number: Style::new().cyan(),
        }
    }
}

impl Theme {
    /// One status line: icon followed by the styled text.
    pub fn status(&self, status: Status, text: &str) -> String {
        if Self::should_disable_colors() {
            return format!("{} {text}", status.icon());
        }
        match status {
            Status::Ok => format!("{} {}", status.icon().green(), self.success.apply_to(text)),
            Status::Failed => format!("{} {}", status.icon().red(), self.error.apply_to(text)),
            Status::Warning => {
                format!("{} {}", status.icon().yellow(), self.warning.apply_to(text))
            }
        }
    }

    pub fn success_with_icon(&self, text: &str) -> String {
        self.status(Status::Ok, text)
    }

    pub fn error_with_icon(&self, text: &str) -> String {
        self.status(Status::Failed, text)
    }

    pub fn warning_with_icon(&self, text: &str) -> String {
        self.status(Status::Warning, text)
    }

    /// A file or directory name in path style.
    pub fn path(&self, path: &Path) -> String {
        self.apply(&self.path, path.display())
    }

    /// `label: value` with the value in number style.
    pub fn labeled<T: Display>(&self, label: &str, value: T) -> String {
        format!("{label}: {}", self.apply(&self.number, value))
    }

    /// Check if color output should be disabled.
    pub fn should_disable_colors() -> bool {
        use is_terminal::IsTerminal;
        std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal()
    }

    /// Styles `text` unless colors are disabled.
    pub fn apply<T: Display>(&self, style: &Style, text: T) -> String {
        if Self::should_disable_colors() {
            text.to_string()
        } else {
            style.apply_to(text).to_string()
        }
    }
}
