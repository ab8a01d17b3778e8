//! Test-only doubles for the generator, LLM and search seams.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::core::types::Rejection;
use crate::io::llm::{ChatRequest, ChatResponse, LlmClient};
use crate::io::search::{SERPER_TOOL_NAME, SearchTool};
use crate::runner::{AttemptRequest, Generator};
use crate::task::TaskPrompt;

/// `n` space-separated words.
pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

/// A rendered prompt for tests that do not care about its content.
pub fn sample_prompt() -> TaskPrompt {
    TaskPrompt {
        description: "Write a super DETAILED blog post about Climate Change for 2026".to_string(),
        expected_output: "A properly structured blog post under 100 words.".to_string(),
    }
}

/// Generator that replays queued attempts and records the guidance it saw.
///
/// `Err(message)` entries simulate fatal upstream failures.
pub struct ScriptedGenerator {
    queue: RefCell<VecDeque<std::result::Result<String, String>>>,
    seen: RefCell<Vec<Vec<Rejection>>>,
}

impl ScriptedGenerator {
    pub fn new(attempts: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            queue: RefCell::new(attempts.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Guidance passed to each call, in call order.
    pub fn seen_guidance(&self) -> Vec<Vec<Rejection>> {
        self.seen.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, request: &AttemptRequest<'_>) -> Result<String> {
        self.seen.borrow_mut().push(request.guidance.to_vec());
        match self.queue.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator exhausted")),
        }
    }
}

/// LLM client that replays queued responses and records every request.
pub struct ScriptedLlm {
    queue: RefCell<VecDeque<ChatResponse>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            queue: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted llm exhausted"))
    }
}

/// Search tool returning a fixed result or a fixed failure; clones share
/// the query log.
#[derive(Clone)]
pub struct StaticSearch {
    result: std::result::Result<String, String>,
    queries: Rc<RefCell<Vec<String>>>,
}

impl StaticSearch {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: Ok(result.into()),
            queries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Every search fails with `message`, like an unreachable service.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            queries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl SearchTool for StaticSearch {
    fn name(&self) -> &str {
        SERPER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Static search results for tests."
    }

    fn search(&self, query: &str) -> Result<String> {
        self.queries.borrow_mut().push(query.to_string());
        self.result.clone().map_err(|message| anyhow!(message))
    }
}

/// Writer whose first `failures` writes fail; later writes are captured.
pub struct FlakyWriter {
    failures: usize,
    pub buf: Vec<u8>,
}

impl FlakyWriter {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            buf: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

impl Write for FlakyWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
