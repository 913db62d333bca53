//! Test-only helpers: scripted completion backends and state builders.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::io::llm::{ChatCompleter, CompletionRequest};

/// Completer that returns predetermined replies in order and records every
/// request. Exhausting the script yields an error, which doubles as a
/// collaborator-failure stand-in.
pub struct ScriptedCompleter {
    replies: RefCell<VecDeque<String>>,
    requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedCompleter {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.borrow().clone()
    }
}

impl ChatCompleter for ScriptedCompleter {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted replies exhausted"))
    }
}

/// Completer that always fails, for abort-path tests.
pub struct FailingCompleter;

impl ChatCompleter for FailingCompleter {
    fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(anyhow!("completion backend unavailable"))
    }
}
