//! Mail list items and address rendering.
//!
//! Items arrive from `GET /api/mail` as JSON. Addresses are internally
//! tagged:
//!
//! ```json
//! { "type": "mailbox", "display_name": "Ann", "address": "ann@example.com" }
//! { "type": "group", "display_name": "Team", "mailboxes": [ ... ] }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identifiers::MailId;

// ============================================================================
// DisplayMode
// ============================================================================

/// How a mailbox is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Display name, or the address when there is none.
    #[default]
    Short,
    /// `Name <address>`, or `<address>` when there is no name.
    Long,
}

// ============================================================================
// Mailbox
// ============================================================================

/// A single mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    /// Display name. Empty names are treated as absent.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Mail address.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox.
    #[must_use]
    pub fn new(display_name: Option<&str>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.map(str::to_owned),
            address: address.into(),
        }
    }

    /// Returns the display name if it is non-empty.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Renders the mailbox.
    #[must_use]
    pub fn display(&self, mode: DisplayMode) -> String {
        match (mode, self.name()) {
            (DisplayMode::Short, Some(name)) => name.to_owned(),
            (DisplayMode::Short, None) => self.address.clone(),
            (DisplayMode::Long, Some(name)) => format!("{name} <{}>", self.address),
            (DisplayMode::Long, None) => format!("<{}>", self.address),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(DisplayMode::Short))
    }
}

// ============================================================================
// Group
// ============================================================================

/// A named group of mailboxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Members.
    #[serde(default)]
    pub mailboxes: Vec<Mailbox>,
}

impl Group {
    /// Renders the group as `Name: a, b;`.
    #[must_use]
    pub fn display(&self, mode: DisplayMode) -> String {
        let members = self
            .mailboxes
            .iter()
            .map(|mailbox| mailbox.display(mode))
            .collect::<Vec<_>>()
            .join(", ");
        let name = self.display_name.as_deref().unwrap_or_default();
        format!("{name}: {members};")
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(DisplayMode::Short))
    }
}

// ============================================================================
// Address
// ============================================================================

/// Recipient entry: a mailbox or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Address {
    /// Single mailbox.
    Mailbox(Mailbox),
    /// Group of mailboxes.
    Group(Group),
}

impl Address {
    /// Renders the address.
    #[must_use]
    pub fn display(&self, mode: DisplayMode) -> String {
        match self {
            Self::Mailbox(mailbox) => mailbox.display(mode),
            Self::Group(group) => group.display(mode),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(DisplayMode::Short))
    }
}

// ============================================================================
// MailListItem
// ============================================================================

/// One entry of the mail list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailListItem {
    /// Server-assigned id; higher is newer.
    pub id: MailId,
    /// Receive time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// `From` header.
    #[serde(default)]
    pub from: Vec<Mailbox>,
    /// `Sender` header.
    #[serde(default, rename = "sender")]
    pub sender_header: Option<Mailbox>,
    /// `To` header.
    #[serde(default)]
    pub to: Vec<Address>,
    /// `Subject` header.
    #[serde(default)]
    pub subject: Option<String>,
}

impl MailListItem {
    /// Returns the `Sender` mailbox, or the first `From` mailbox.
    #[must_use]
    pub fn sender(&self) -> Option<&Mailbox> {
        self.sender_header.as_ref().or_else(|| self.from.first())
    }

    /// Returns the recipients joined by `", "`.
    #[must_use]
    pub fn recipient_display_string(&self) -> String {
        self.to
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// EmailPath
// ============================================================================

static EMAIL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^<>]*?)\s*(?:<([^<>]*)>)?\s*$").expect("email path pattern is valid")
});

/// SMTP path split into display name and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPath {
    /// Text before the angle brackets.
    pub name: Option<String>,
    /// Text inside the angle brackets.
    pub address: Option<String>,
}

impl EmailPath {
    /// Parses `Name <address>`.
    ///
    /// A bare value containing `@` is taken as the address. Returns `None`
    /// for stray or nested angle brackets.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let captures = EMAIL_PATH.captures(input)?;
        let non_empty = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        let name = non_empty(1);
        let address = non_empty(2);

        match (name, address) {
            (Some(bare), None) if bare.contains('@') => Some(Self {
                name: None,
                address: Some(bare),
            }),
            (name, address) => Some(Self { name, address }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
