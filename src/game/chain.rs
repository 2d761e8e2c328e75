//! The chain entity — one collaborative story.
//!
//! A chain is a prompt plus up to [`LINE_LIMIT`] contributed lines. It locks
//! itself when the last line lands and is immutable from then on.
//!
//! `turn` and `locked` are kept on the record so the stored JSON carries all
//! five fields, but both are always derived from `lines`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of lines that completes a chain.
pub const LINE_LIMIT: usize = 10;

/// Persisted chain record: `{id, prompt, lines, turn, locked}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    id: String,
    prompt: String,
    lines: Vec<String>,
    turn: usize,
    locked: bool,
}

/// What an accepted line did to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// More lines are wanted; carries the next turn.
    Continue { turn: usize },
    /// That was the last line. The chain is now locked.
    Locked,
}

impl Chain {
    /// A blank chain in the setup state.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: String::new(),
            lines: Vec::new(),
            turn: 1,
            locked: false,
        }
    }

    /// A fresh chain seeded with `prompt` (trimmed).
    pub fn started(id: impl Into<String>, prompt: &str) -> Result<Self, ValidationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        let mut chain = Self::empty(id);
        chain.prompt = prompt.to_string();
        Ok(chain)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 1-based index of the next line.
    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the chain has left setup, i.e. carries a prompt.
    pub fn is_started(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Append one trimmed line. Locks the chain on the last line.
    pub fn append(&mut self, line: &str) -> Result<Appended, ValidationError> {
        if self.locked {
            return Err(ValidationError::ChainLocked);
        }
        let line = line.trim();
        if line.is_empty() {
            return Err(ValidationError::EmptyLine);
        }
        self.lines.push(line.to_string());
        self.sync_derived();
        if self.locked {
            Ok(Appended::Locked)
        } else {
            Ok(Appended::Continue { turn: self.turn })
        }
    }

    /// Plain-text rendering: the prompt, then `"{n}. {line}"` per line.
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity(
            self.prompt.len() + self.lines.iter().map(|l| l.len() + 5).sum::<usize>(),
        );
        out.push_str(&self.prompt);
        for (i, line) in self.lines.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{}. {}", i + 1, line));
        }
        out
    }

    /// Check a record read back from storage and rebuild its derived fields.
    ///
    /// Returns `None` for records that cannot be a valid chain under `id`.
    pub(crate) fn normalized(mut self, id: &str) -> Option<Self> {
        if self.id != id || self.lines.len() > LINE_LIMIT {
            return None;
        }
        if self.lines.iter().any(|l| l.trim().is_empty()) {
            return None;
        }
        if self.prompt.trim().is_empty() {
            if !self.lines.is_empty() {
                return None;
            }
            self.prompt.clear();
        }
        let (turn, locked) = (self.turn, self.locked);
        self.sync_derived();
        if turn != self.turn || locked != self.locked {
            tracing::debug!(id, turn, locked, "stored turn/locked disagree with lines; rederived");
        }
        Some(self)
    }

    fn sync_derived(&mut self) {
        self.turn = self.lines.len() + 1;
        self.locked = self.lines.len() >= LINE_LIMIT;
    }
}
