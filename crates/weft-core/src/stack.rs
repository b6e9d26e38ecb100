use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event code appended when a thread is interrupted back into focus.
pub const INTERRUPT_CODE: char = 'I';
/// Event code appended when a thread is exited (finished).
pub const EXIT_CODE: char = 'E';
/// Event code appended when a thread is killed (abandoned).
pub const KILL_CODE: char = 'K';

/// Rendering of the pause sentinel in status lines.
pub const PAUSED_TOKEN: &str = "PAUSED";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("invalid thread name: {0}")]
    InvalidName(String),
    #[error("thread not found: {0}")]
    NotFound(String),
    #[error("no thread in focus")]
    NoCurrentTarget,
    #[error("nothing to resume")]
    NothingToResume,
}

fn name_pattern() -> Regex {
    Regex::new(r"^([0-9a-z-]+\.)*[0-9a-z-]+$").expect("regex")
}

/// Thread names are lowercase alphanumerics and hyphens, optionally
/// dot-separated, e.g. `build`, `fix-bug`, `proj.task`. Stack names follow
/// the same grammar.
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// One entry in the focus stack: a thread in progress, or the sentinel
/// marking the whole stack as suspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Thread(String),
    Paused,
}

/// A known thread and its append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub name: String,
    #[serde(default)]
    pub log: String,
}

/// Input for the display layer: the stack name, a status line, and one row
/// per known thread in tid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackView {
    pub name: String,
    pub status: String,
    pub threads: Vec<ThreadRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadRow {
    pub tid: usize,
    pub name: String,
    pub status: String,
}

/// The attention stack: every thread ever started, each with its event log,
/// plus the LIFO focus order. Records are never deleted; only the focus
/// stack shrinks.
///
/// Invariants: a thread appears at most once in the focus stack, and the
/// pause sentinel only ever sits on top. Every operation validates before
/// mutating, so a failed call leaves the stack exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionStack {
    name: String,
    threads: Vec<ThreadRecord>,
    /// Focus stack; the top is the last element.
    attention: Vec<Slot>,
}

impl AttentionStack {
    pub fn new(name: &str) -> Result<Self, StackError> {
        if !is_valid_name(name) {
            return Err(StackError::InvalidName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            threads: Vec::new(),
            attention: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn has_thread(&self, name: &str) -> bool {
        self.threads.iter().any(|record| record.name == name)
    }

    fn log_event(&mut self, name: &str, code: char) {
        if let Some(record) = self.threads.iter_mut().find(|record| record.name == name) {
            record.log.push(code);
        }
    }

    fn remove_from_attention(&mut self, name: &str) {
        self.attention
            .retain(|slot| !matches!(slot, Slot::Thread(thread) if thread == name));
    }

    /// Start a thread without stealing focus. The record is created on first
    /// mention; re-spawning a known name leaves its log alone. Only when
    /// nothing at all is on the stack does the new thread become the focus.
    pub fn spawn(&mut self, thread: &str) -> Result<(), StackError> {
        if !is_valid_name(thread) {
            return Err(StackError::InvalidName(thread.to_string()));
        }
        if !self.has_thread(thread) {
            self.threads.push(ThreadRecord {
                name: thread.to_string(),
                log: String::new(),
            });
        }
        if self.attention.is_empty() {
            self.attention.push(Slot::Thread(thread.to_string()));
        }
        Ok(())
    }

    /// Make the named thread the focus. Known names skip re-validation;
    /// unknown names must satisfy the grammar and get a fresh record. An
    /// interrupt always wakes a paused stack, and any earlier position the
    /// thread held is forgotten.
    pub fn interrupt(&mut self, thread: &str) -> Result<(), StackError> {
        if !self.has_thread(thread) {
            if !is_valid_name(thread) {
                return Err(StackError::InvalidName(thread.to_string()));
            }
            self.threads.push(ThreadRecord {
                name: thread.to_string(),
                log: String::new(),
            });
        }
        if self.attention.last() == Some(&Slot::Paused) {
            self.attention.pop(); // refocus
        }
        self.remove_from_attention(thread);
        self.log_event(thread, INTERRUPT_CODE);
        self.attention.push(Slot::Thread(thread.to_string()));
        Ok(())
    }

    /// Mark a thread finished and drop it from the focus stack. With no
    /// target, falls through to whatever is currently focused.
    pub fn exit(&mut self, target: Option<&str>) -> Result<String, StackError> {
        self.finish(target, EXIT_CODE)
    }

    /// Mark a thread abandoned. Same shape as [`exit`](Self::exit); only the
    /// logged code differs.
    pub fn kill(&mut self, target: Option<&str>) -> Result<String, StackError> {
        self.finish(target, KILL_CODE)
    }

    fn finish(&mut self, target: Option<&str>, code: char) -> Result<String, StackError> {
        let implicit = target.map_or(true, str::is_empty);
        let resolved = self.resolve_target(target)?;
        if !self.has_thread(&resolved) {
            return Err(StackError::NotFound(resolved));
        }
        if implicit && self.attention.last() == Some(&Slot::Paused) {
            self.attention.pop(); // an implicit target wakes the stack
        }
        self.log_event(&resolved, code);
        self.remove_from_attention(&resolved);
        Ok(resolved)
    }

    /// Fall into a target thread: an explicit name wins; otherwise the
    /// top-most thread, looking through a pause sentinel. Resolution never
    /// mutates, so callers can still fail existence checks cleanly.
    fn resolve_target(&self, target: Option<&str>) -> Result<String, StackError> {
        if let Some(name) = target {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
        let mut slots = self.attention.iter().rev();
        let top = match slots.next() {
            Some(Slot::Paused) => slots.next(),
            other => other,
        };
        match top {
            Some(Slot::Thread(name)) => Ok(name.clone()),
            _ => Err(StackError::NoCurrentTarget),
        }
    }

    /// Suspend the whole stack. Idempotent; a no-op on an empty stack.
    pub fn pause(&mut self) {
        if !self.attention.is_empty() && self.attention.last() != Some(&Slot::Paused) {
            self.attention.push(Slot::Paused);
        }
    }

    /// Wake the stack up again. A no-op when already running; an error when
    /// there is nothing underneath at all.
    pub fn resume(&mut self) -> Result<(), StackError> {
        if self.attention.is_empty() {
            return Err(StackError::NothingToResume);
        }
        if self.attention.last() == Some(&Slot::Paused) {
            self.attention.pop();
        }
        Ok(())
    }

    /// The focused thread, if the stack is running.
    pub fn current(&self) -> Option<&str> {
        match self.attention.last() {
            Some(Slot::Thread(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.attention.last() == Some(&Slot::Paused)
    }

    /// Resolve a zero-based tid in record insertion order to a thread name.
    pub fn lookup(&self, tid: usize) -> Result<&str, StackError> {
        self.threads
            .get(tid)
            .map(|record| record.name.as_str())
            .ok_or_else(|| StackError::NotFound(tid.to_string()))
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Focus stack joined top-to-bottom, `- STOP -` when empty.
    pub fn status_line(&self) -> String {
        if self.attention.is_empty() {
            return "- STOP -".to_string();
        }
        let focus = self
            .attention
            .iter()
            .rev()
            .map(|slot| match slot {
                Slot::Thread(name) => name.as_str(),
                Slot::Paused => PAUSED_TOKEN,
            })
            .collect::<Vec<_>>()
            .join(" < ");
        format!("RUN: {focus}")
    }

    /// Pure read producing everything the display layer needs.
    pub fn view(&self) -> StackView {
        let current = self.current();
        let threads = self
            .threads
            .iter()
            .enumerate()
            .map(|(tid, record)| ThreadRow {
                tid,
                name: record.name.clone(),
                status: if current == Some(record.name.as_str()) {
                    "RUNNING".to_string()
                } else {
                    record.log.clone()
                },
            })
            .collect();
        StackView {
            name: self.name.clone(),
            status: self.status_line(),
            threads,
        }
    }
}
