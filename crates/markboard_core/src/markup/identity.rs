//! Identity assignment for parsed entities.
//!
//! # Responsibility
//! - Mint temporary identifiers during a parse pass.
//! - Under the embedded strategy, recover identifiers from `{token}`
//!   prefixes and re-insert them on serialize.
//!
//! # Invariants
//! - No identifier is handed out twice per entity kind within one pass.
//! - A minted identifier that repeats is a fatal invariant error.
//! - Columns and groups never carry tokens.

use crate::model::board::{BoardInvariantError, EntityKind};
use crate::model::ids::{EntityId, IdentityStrategy};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{([A-Za-z0-9_-]+)\}(?:[ \t]+|$)").expect("valid identity token regex")
});

/// Per-pass identifier source.
#[derive(Debug)]
pub struct IdentityAssigner {
    strategy: IdentityStrategy,
    issued: HashMap<EntityKind, HashSet<EntityId>>,
    minted: usize,
    reused: usize,
}

/// Identifier and remaining text of one checkbox item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assigned {
    pub id: EntityId,
    pub text: String,
}

impl IdentityAssigner {
    pub fn new(strategy: IdentityStrategy) -> Self {
        Self {
            strategy,
            issued: HashMap::new(),
            minted: 0,
            reused: 0,
        }
    }

    /// Number of identifiers minted so far in this pass.
    pub fn minted(&self) -> usize {
        self.minted
    }

    /// Number of embedded identifiers reused so far in this pass.
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Mints a new temporary identifier for `kind`.
    pub fn mint(&mut self, kind: EntityKind) -> Result<EntityId, BoardInvariantError> {
        let id = EntityId::temporary();
        if !self.issued.entry(kind).or_default().insert(id) {
            return Err(BoardInvariantError::DuplicateIdentifier { kind, id });
        }
        self.minted += 1;
        Ok(id)
    }

    /// Resolves the identifier of a card or subtask from its text (marker
    /// already stripped, trimmed).
    ///
    /// Under `Fresh` the text is kept verbatim. Under `Embedded` a leading
    /// token is stripped; it is reused when it decodes and has not been
    /// issued yet in this pass, otherwise a new identifier is minted.
    pub fn assign(&mut self, kind: EntityKind, text: &str) -> Result<Assigned, BoardInvariantError> {
        if self.strategy == IdentityStrategy::Fresh {
            return Ok(Assigned {
                id: self.mint(kind)?,
                text: text.to_string(),
            });
        }

        let Some(caps) = TOKEN_RE.captures(text) else {
            return Ok(Assigned {
                id: self.mint(kind)?,
                text: text.to_string(),
            });
        };

        let token = &caps[1];
        let rest = text[caps[0].len()..].trim().to_string();
        let id = match EntityId::parse_token(token) {
            Some(id) => {
                if self.issued.entry(kind).or_default().insert(id) {
                    self.reused += 1;
                    id
                } else {
                    debug!(
                        "event=identity_assign module=markup status=duplicate kind={} token={}",
                        kind, id
                    );
                    self.mint(kind)?
                }
            }
            None => {
                debug!(
                    "event=identity_assign module=markup status=malformed kind={} token_len={}",
                    kind,
                    token.len()
                );
                self.mint(kind)?
            }
        };

        Ok(Assigned { id, text: rest })
    }
}

/// Builds the checkbox item content for a card or subtask.
pub fn render_checkbox(
    strategy: IdentityStrategy,
    id: EntityId,
    completed: bool,
    text: &str,
) -> String {
    let marker = if completed { "[x]" } else { "[ ]" };
    let mut content = String::from(marker);
    if strategy == IdentityStrategy::Embedded {
        content.push_str(" {");
        content.push_str(&id.token());
        content.push('}');
    }
    if !text.is_empty() {
        content.push(' ');
        content.push_str(text);
    }
    content
}
