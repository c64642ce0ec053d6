use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Payload kind of a turn. Only plain text exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    #[default]
    Text,
}

/// One role-tagged unit of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: TurnKind,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind: TurnKind::Text,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A turn as received from the outside world, before validation.
///
/// History arriving over HTTP may omit fields; [`Turn::try_from`] rejects
/// such entries with [`AgentError::MalformedMessage`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTurn {
    pub role: Option<Role>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TurnKind>,
}

impl From<Turn> for RawTurn {
    fn from(turn: Turn) -> Self {
        Self {
            role: Some(turn.role),
            content: Some(turn.content),
            kind: Some(turn.kind),
        }
    }
}

impl TryFrom<RawTurn> for Turn {
    type Error = AgentError;

    fn try_from(raw: RawTurn) -> Result<Self, Self::Error> {
        let missing = |field: &str| AgentError::MalformedMessage(format!("missing '{field}'"));
        Ok(Turn {
            role: raw.role.ok_or_else(|| missing("role"))?,
            content: raw.content.ok_or_else(|| missing("content"))?,
            kind: raw.kind.ok_or_else(|| missing("type"))?,
        })
    }
}

/// Input accepted by an agent call: a bare user message or a batch of turns.
#[derive(Debug, Clone)]
pub enum Prompt {
    Text(String),
    Turns(Vec<RawTurn>),
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::Text(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::Text(text)
    }
}

impl From<Vec<Turn>> for Prompt {
    fn from(turns: Vec<Turn>) -> Self {
        Prompt::Turns(turns.into_iter().map(RawTurn::from).collect())
    }
}
