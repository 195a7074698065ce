//! In-memory line source for driving the extractor with canned sequences

use crate::io::line_source::{LineSource, ReadError};
use async_trait::async_trait;
use std::collections::VecDeque;

/// Plays back a fixed script. `None` entries stand for a per-line timeout.
/// Once the script is exhausted every read returns `ReadError::Closed`.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    script: VecDeque<Option<String>>,
    consumed: usize,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { script: lines.into_iter().map(|l| Some(l.into())).collect(), consumed: 0 }
    }

    /// Append a line to the end of the script
    pub fn push(&mut self, line: impl Into<String>) {
        self.script.push_back(Some(line.into()));
    }

    /// Append a simulated per-line timeout
    pub fn push_timeout(&mut self) {
        self.script.push_back(None);
    }

    /// Lines and timeouts handed out so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        let entry = self.script.pop_front().ok_or(ReadError::Closed)?;
        self.consumed += 1;
        Ok(entry.map(|line| line.trim().to_string()))
    }

    fn describe(&self) -> &str {
        "script"
    }
}
