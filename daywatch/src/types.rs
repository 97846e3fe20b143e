//! Common types shared by the backend, the locator and the controller

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RunError;

/// Interaction strategy used to read and manipulate GUI elements.
///
/// The two modes see different subsets of window text: `Primary` drives
/// clicking and typing, `Alternate` is only entered to read text `Primary`
/// cannot see (composite status-bar labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Primary,
    Alternate,
}

/// Opaque identifier handed out by a backend for a window or control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub u64);

/// A top-level window. Re-resolved on every access, never cached across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef {
    pub handle: ElementHandle,
    pub title: String,
    /// Process owning the window
    pub pid: u32,
}

/// A descendant control of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRef {
    pub handle: ElementHandle,
    pub class_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitFor {
    Exists,
    Vanished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleMatch {
    Exact,
    Regex,
}

/// Title query used to find top-level windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowQuery {
    pub title: String,
    #[serde(rename = "match")]
    pub match_mode: TitleMatch,
}

impl WindowQuery {
    pub fn exact(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            match_mode: TitleMatch::Exact,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            title: pattern.into(),
            match_mode: TitleMatch::Regex,
        }
    }

    /// Compile the query. Regex patterns are anchored at the start of the title.
    pub fn compile(&self) -> Result<TitleMatcher, RunError> {
        match self.match_mode {
            TitleMatch::Exact => Ok(TitleMatcher::Exact(self.title.clone())),
            TitleMatch::Regex => Regex::new(&format!("^(?:{})", self.title))
                .map(TitleMatcher::Regex)
                .map_err(|e| RunError::InvalidPattern(format!("{:?}: {e}", self.title))),
        }
    }
}

impl fmt::Display for WindowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.match_mode {
            TitleMatch::Exact => write!(f, "{:?}", self.title),
            TitleMatch::Regex => write!(f, "/{}/", self.title),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TitleMatcher {
    Exact(String),
    Regex(Regex),
}

impl TitleMatcher {
    pub fn is_match(&self, title: &str) -> bool {
        match self {
            TitleMatcher::Exact(expected) => expected == title,
            TitleMatcher::Regex(re) => re.is_match(title),
        }
    }
}

/// Picks one control out of a window's descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum ControlSelector {
    /// The `nth` (zero-based, in traversal order) control with this class name
    Class { class_name: String, nth: usize },
    /// The first control whose text equals `text`
    Text { text: String },
}

impl ControlSelector {
    pub fn class(class_name: impl Into<String>, nth: usize) -> Self {
        ControlSelector::Class {
            class_name: class_name.into(),
            nth,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ControlSelector::Text { text: text.into() }
    }

    pub fn select<'a>(&self, controls: &'a [ControlRef]) -> Option<&'a ControlRef> {
        match self {
            ControlSelector::Class { class_name, nth } => controls
                .iter()
                .filter(|c| &c.class_name == class_name)
                .nth(*nth),
            ControlSelector::Text { text } => controls.iter().find(|c| &c.text == text),
        }
    }
}

impl fmt::Display for ControlSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSelector::Class { class_name, nth } => write!(f, "{class_name}#{nth}"),
            ControlSelector::Text { text } => write!(f, "text={text:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
}

impl Key {
    /// Key sequence in the `{NAME}` notation understood by UI Automation input helpers.
    pub fn as_sequence(&self) -> &'static str {
        match self {
            Key::Enter => "{ENTER}",
            Key::Escape => "{ESC}",
            Key::Tab => "{TAB}",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of one full `RunController::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The day check completed; `matched` is true when the configured trigger fired.
    Success { matched: bool },
    /// Attempts were exhausted; the outer loop may try again later.
    Retry(String),
    /// A failure the retry policy refuses to retry.
    Fatal(String),
}

impl RunOutcome {
    pub fn target_reached(&self) -> bool {
        matches!(self, RunOutcome::Success { matched: true })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Starting,
    LoggingIn,
    Connecting,
    ConfirmingWarning,
    CheckingDay,
    Retrying,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Starting => "starting",
            RunState::LoggingIn => "logging_in",
            RunState::Connecting => "connecting",
            RunState::ConfirmingWarning => "confirming_warning",
            RunState::CheckingDay => "checking_day",
            RunState::Retrying => "retrying",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(class_name: &str, text: &str, id: u64) -> ControlRef {
        ControlRef {
            handle: ElementHandle(id),
            class_name: class_name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn class_selector_counts_only_matching_class() {
        let controls = vec![
            control("Edit", "", 1),
            control("Static", "Login", 2),
            control("Edit", "", 3),
            control("Button", "OK", 4),
        ];

        let second_edit = ControlSelector::class("Edit", 1).select(&controls).unwrap();
        assert_eq!(second_edit.handle, ElementHandle(3));
        assert!(ControlSelector::class("Edit", 2).select(&controls).is_none());
        assert_eq!(
            ControlSelector::text("OK").select(&controls).unwrap().handle,
            ElementHandle(4)
        );
    }

    #[test]
    fn regex_query_is_anchored_at_start() {
        let matcher = WindowQuery::regex("Status .+").compile().unwrap();
        assert!(matcher.is_match("Status panel 31.01.22"));
        assert!(!matcher.is_match("Old Status panel"));

        let exact = WindowQuery::exact("Login").compile().unwrap();
        assert!(exact.is_match("Login"));
        assert!(!exact.is_match("Login "));
    }

    #[test]
    fn invalid_regex_is_reported() {
        match WindowQuery::regex("Status (").compile() {
            Err(RunError::InvalidPattern(_)) => {}
            other => panic!("Expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("teller", "s3cret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("teller"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn selector_deserializes_from_profile_json() {
        let sel: ControlSelector =
            serde_json::from_str(r#"{"by":"class","class_name":"Static","nth":2}"#).unwrap();
        assert_eq!(sel, ControlSelector::class("Static", 2));
        let sel: ControlSelector = serde_json::from_str(r#"{"by":"text","text":"OK"}"#).unwrap();
        assert_eq!(sel, ControlSelector::text("OK"));
    }
}
