//! core-keymap: keybind templates and the directive wire format.
//!
//! A keybind maps a key in caret notation (`^R`, `^[[A`) to a template:
//!
//! - `!int PAYLOAD` / `!ext PAYLOAD` produce a [`Directive`] carrying the
//!   current edit split, handled by the executor's internal commands or by an
//!   external program respectively;
//! - anything else is a literal line submitted as-is.
//!
//! Templates are parsed once when the keymap is built. A malformed template
//! is kept as [`Binding::Malformed`] so that pressing the key reports the
//! problem instead of silently doing nothing.
//!
//! Directives stay structured inside the process. The delimited string form
//! exists only at the executor boundary ([`Directive::encode`] /
//! [`Directive::decode`]).

use core_text::TextLine;
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Field separator of the wire format (ASCII unit separator).
pub const SEPARATOR: char = '\u{1F}';

/// First field of every encoded directive.
pub const MARKER: &str = "tessera-directive";

const WIRE_FIELDS: usize = 5;

// -------------------------------------------------------------------------------------------------
// Directive kinds
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Internal,
    External,
}

impl DirectiveKind {
    /// Tag used in the wire format.
    pub fn wire_tag(self) -> &'static str {
        match self {
            DirectiveKind::Internal => "int",
            DirectiveKind::External => "ext",
        }
    }

    /// Tag used in keybind templates.
    pub fn template_tag(self) -> &'static str {
        match self {
            DirectiveKind::Internal => "!int",
            DirectiveKind::External => "!ext",
        }
    }

    fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag {
            "int" => Some(DirectiveKind::Internal),
            "ext" => Some(DirectiveKind::External),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Errors
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("`{tag}` must be followed by a single space and a payload")]
    MissingSpace { tag: &'static str },
    #[error("`{tag}` has an empty payload")]
    EmptyPayload { tag: &'static str },
    #[error("payload contains the directive separator")]
    SeparatorInPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("directive {field} contains the separator U+001F")]
    SeparatorInField { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("expected 5 fields, found {found}")]
    FieldCount { found: usize },
    #[error("missing directive marker")]
    BadMarker,
    #[error("unknown directive kind `{0}`")]
    UnknownKind(String),
}

// -------------------------------------------------------------------------------------------------
// Templates
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTemplate {
    /// Submit this text as the line.
    Literal(String),
    Directive {
        kind: DirectiveKind,
        payload: String,
    },
}

impl ActionTemplate {
    /// Parse a keybind template.
    ///
    /// ```
    /// use core_keymap::{ActionTemplate, DirectiveKind};
    /// let t = ActionTemplate::parse("!ext  fzf ").unwrap();
    /// assert_eq!(t, ActionTemplate::Directive { kind: DirectiveKind::External, payload: "fzf".into() });
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        for kind in [DirectiveKind::Internal, DirectiveKind::External] {
            let tag = kind.template_tag();
            let Some(rest) = raw.strip_prefix(tag) else {
                continue;
            };
            let Some(body) = rest.strip_prefix(' ') else {
                return Err(TemplateError::MissingSpace { tag });
            };
            let payload = body.trim();
            if payload.is_empty() {
                return Err(TemplateError::EmptyPayload { tag });
            }
            if payload.contains(SEPARATOR) {
                return Err(TemplateError::SeparatorInPayload);
            }
            return Ok(ActionTemplate::Directive {
                kind,
                payload: payload.to_string(),
            });
        }
        Ok(ActionTemplate::Literal(raw.to_string()))
    }
}

// -------------------------------------------------------------------------------------------------
// Directive
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    kind: DirectiveKind,
    left: TextLine,
    right: TextLine,
    payload: String,
}

impl Directive {
    /// Build a directive; no field may contain [`SEPARATOR`].
    pub fn new(
        kind: DirectiveKind,
        left: TextLine,
        right: TextLine,
        payload: impl Into<String>,
    ) -> Result<Self, DirectiveError> {
        let payload = payload.into();
        let fields = [
            ("left", left.to_string()),
            ("right", right.to_string()),
            ("payload", payload.clone()),
        ];
        for (field, text) in fields {
            if text.contains(SEPARATOR) {
                return Err(DirectiveError::SeparatorInField { field });
            }
        }
        Ok(Self {
            kind,
            left,
            right,
            payload,
        })
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn left(&self) -> &TextLine {
        &self.left
    }

    pub fn right(&self) -> &TextLine {
        &self.right
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Delimited form handed to the executor.
    pub fn encode(&self) -> String {
        let sep = SEPARATOR.to_string();
        [
            MARKER.to_string(),
            self.kind.wire_tag().to_string(),
            self.left.to_string(),
            self.right.to_string(),
            self.payload.clone(),
        ]
        .join(&sep)
    }

    pub fn decode(wire: &str) -> Result<Self, WireError> {
        let fields: SmallVec<[&str; WIRE_FIELDS]> = wire.split(SEPARATOR).collect();
        if fields.len() != WIRE_FIELDS {
            return Err(WireError::FieldCount {
                found: fields.len(),
            });
        }
        if fields[0] != MARKER {
            return Err(WireError::BadMarker);
        }
        let kind = DirectiveKind::from_wire_tag(fields[1])
            .ok_or_else(|| WireError::UnknownKind(fields[1].to_string()))?;
        Ok(Self {
            kind,
            left: TextLine::from(fields[2]),
            right: TextLine::from(fields[3]),
            payload: fields[4].to_string(),
        })
    }
}

/// Whether `line` is an encoded directive rather than user text.
pub fn is_directive_wire(line: &str) -> bool {
    line.strip_prefix(MARKER)
        .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

// -------------------------------------------------------------------------------------------------
// Keymap
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Literal(String),
    Directive {
        kind: DirectiveKind,
        payload: String,
    },
    Malformed(TemplateError),
}

impl From<Result<ActionTemplate, TemplateError>> for Binding {
    fn from(parsed: Result<ActionTemplate, TemplateError>) -> Self {
        match parsed {
            Ok(ActionTemplate::Literal(text)) => Binding::Literal(text),
            Ok(ActionTemplate::Directive { kind, payload }) => Binding::Directive { kind, payload },
            Err(err) => Binding::Malformed(err),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<String, Binding>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, template)` pairs, keys in caret notation.
    pub fn from_bindings<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (key, template) in pairs {
            map.bind(key.as_ref(), template.as_ref());
        }
        debug!(target: "keymap", bindings = map.bindings.len(), "keymap_built");
        map
    }

    pub fn bind(&mut self, key: &str, template: &str) {
        let key = normalize_key(key);
        let binding = Binding::from(ActionTemplate::parse(template));
        if let Binding::Malformed(err) = &binding {
            warn!(target: "keymap", key = %key, error = %err, "malformed_template");
        }
        self.bindings.insert(key, binding);
    }

    /// Binding for a key in caret notation, as produced by
    /// `CharUnit::printable`.
    pub fn lookup(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// `^r` and `^R` name the same control key.
fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('^'), Some(c), None) if c.is_ascii_lowercase() => format!("^{}", c.to_ascii_uppercase()),
        _ => key.to_string(),
    }
}
