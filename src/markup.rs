//! Markup Codec: wire markup to display text and back.
//!
//! Inbound messages carry angle-bracket tags (`<@U123>`, `<#C42|general>`,
//! `<!here>`, `<https://example.com|docs>`) and escape `&`, `<` and `>` as
//! HTML entities. [`decode`] expands the tags into readable text and
//! unescapes the rest; [`encode`] only escapes. Outgoing text is sent as plain
//! text: names are never turned back into ids.
//!
//! Every function here is pure and safe to call from any thread.
//!
//! # Example
//!
//! ```
//! use backchannel::markup::{decode, encode, MemoryDirectory};
//!
//! let directory = MemoryDirectory::new().with_user("U1", "alice");
//! assert_eq!(decode("<@U1> &lt;3", &directory, None), "@alice <3");
//! assert_eq!(encode("a&b"), "a&amp;b");
//! ```

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// One tag: optional sigil, identifier (no `<`, `>` or `|`), optional label.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([@#!]?)([^<>|]+)(?:\|([^<>]*))?>").expect("tag pattern is valid")
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt);").expect("entity pattern is valid"));

/// A `!word` token standing on its own.
static ATTENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\W)!\w+").expect("attention pattern is valid"));

/// Black-box lookup of display names.
///
/// `None` means the id is unknown; callers fall back to the raw id.
pub trait Directory: Send + Sync {
    /// Resolve a user id to a display name.
    fn resolve_user(&self, id: &str) -> Option<String>;

    /// Resolve a channel id to a channel name.
    fn resolve_channel(&self, id: &str) -> Option<String>;
}

/// A fixed, in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    users: HashMap<String, String>,
    channels: HashMap<String, String>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user.
    #[must_use]
    pub fn with_user(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.users.insert(id.into(), name.into());
        self
    }

    /// Register a channel.
    #[must_use]
    pub fn with_channel(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.channels.insert(id.into(), name.into());
        self
    }
}

impl Directory for MemoryDirectory {
    fn resolve_user(&self, id: &str) -> Option<String> {
        self.users.get(id).cloned()
    }

    fn resolve_channel(&self, id: &str) -> Option<String> {
        self.channels.get(id).cloned()
    }
}

/// A parsed tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag<'a> {
    /// `<@ID>` or `<@ID|label>`
    User(&'a str),
    /// `<#ID>` or `<#ID|label>`
    Channel(&'a str),
    /// `<!ID>` or `<!ID|label>`
    Command { id: &'a str, label: Option<&'a str> },
    /// `<target>` or `<target|label>`
    Link { target: &'a str, label: Option<&'a str> },
}

impl<'a> Tag<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let sigil = caps.get(1).map_or("", |m| m.as_str());
        let id = caps.get(2)?.as_str();
        let label = caps.get(3).map(|m| m.as_str()).filter(|l| !l.is_empty());
        Some(match sigil {
            "@" => Self::User(id),
            "#" => Self::Channel(id),
            "!" => Self::Command { id, label },
            _ => Self::Link { target: id, label },
        })
    }

    fn render(self, out: &mut String, directory: &dyn Directory, self_id: Option<&str>) {
        match self {
            Self::User(id) => {
                out.push(if self_id == Some(id) { '!' } else { '@' });
                match directory.resolve_user(id) {
                    Some(name) => out.push_str(&name),
                    None => out.push_str(id),
                }
            }
            Self::Channel(id) => {
                out.push('#');
                match directory.resolve_channel(id) {
                    Some(name) => out.push_str(&name),
                    None => out.push_str(id),
                }
            }
            Self::Command { id, label } => {
                out.push('!');
                out.push_str(&unescape(label.unwrap_or(id)));
            }
            Self::Link { label: Some(label), .. } => out.push_str(&unescape(label)),
            Self::Link { target, label: None } => out.push_str(&unescape(target)),
        }
    }
}

/// Decode wire markup into display text.
///
/// Tags are rewritten in one left-to-right pass, so names returned by the
/// directory are never re-matched as markup or unescaped. Text that looks
/// like a tag but does not parse is passed through (and unescaped).
pub fn decode(raw: &str, directory: &dyn Directory, self_id: Option<&str>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in TAG.captures_iter(raw) {
        let (Some(whole), Some(tag)) = (caps.get(0), Tag::from_captures(&caps)) else {
            continue;
        };
        out.push_str(&unescape(&raw[last..whole.start()]));
        tag.render(&mut out, directory, self_id);
        last = whole.end();
    }
    out.push_str(&unescape(&raw[last..]));
    out
}

/// Escape display text for the wire: `&`, `<` and `>` only.
pub fn encode(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Undo entity escaping in a single pass, so `&amp;lt;` becomes `&lt;`.
pub fn unescape(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures<'_>| {
        match caps.get(1).map(|m| m.as_str()) {
            Some("lt") => "<",
            Some("gt") => ">",
            _ => "&",
        }
    })
}

/// Whether a line deserves the attention attribute: it contains a
/// standalone `!word` token (commands, self-mentions, `!error` lines).
pub fn is_attention(text: &str) -> bool {
    ATTENTION.is_match(text)
}
