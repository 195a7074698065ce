//! Sentinel-framed block extraction
//!
//! Wire format, per channel group:
//!
//! ```text
//! &,              <- start: the sentinel once separators are removed
//! 101,202,303,    <- data fragments, any number of lines
//! 404,505&        <- end: line ending in the sentinel, may carry data
//! ```
//!
//! Lines outside a block (including other groups' blocks and empty lines) are
//! discarded while seeking a start marker.

use crate::domain::Sentinel;
use crate::io::line_source::{LineSource, ReadError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Seeking,
    Collecting,
}

/// Line-at-a-time state machine for one block.
///
/// Feed lines until `feed` returns the tokens; the parser then resets to
/// `Seeking` and can be reused for the next block.
#[derive(Debug)]
pub struct BlockParser {
    sentinel: Sentinel,
    separator: char,
    expected_count: usize,
    state: ParserState,
    fragments: Vec<String>,
}

impl BlockParser {
    pub fn new(sentinel: Sentinel, separator: char, expected_count: usize) -> Self {
        Self {
            sentinel,
            separator,
            expected_count,
            state: ParserState::Seeking,
            fragments: Vec::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Consume one trimmed line. Returns the block's tokens (at most
    /// `expected_count`) when this line terminates the block.
    pub fn feed(&mut self, line: &str) -> Option<Vec<String>> {
        if line.is_empty() {
            return None;
        }

        match self.state {
            ParserState::Seeking => {
                if is_start_marker(line, self.sentinel.as_str(), self.separator) {
                    self.state = ParserState::Collecting;
                }
                None
            }
            ParserState::Collecting => match line.strip_suffix(self.sentinel.as_str()) {
                Some(rest) => {
                    let rest = rest.strip_suffix(self.separator).unwrap_or(rest);
                    if !rest.is_empty() {
                        self.fragments.push(rest.to_string());
                    }
                    Some(self.finish())
                }
                None => {
                    self.fragments.push(line.to_string());
                    None
                }
            },
        }
    }

    fn finish(&mut self) -> Vec<String> {
        let fragments = std::mem::take(&mut self.fragments);
        self.state = ParserState::Seeking;
        split_tokens(&fragments, self.separator, self.expected_count)
    }
}

/// A start marker is the sentinel alone once every separator is removed,
/// so `&`, `&,` and `,&,` all open an `&` block.
pub fn is_start_marker(line: &str, sentinel: &str, separator: char) -> bool {
    let mut stripped = line.chars().filter(|&c| c != separator);
    let mut expected = sentinel.chars();
    loop {
        match (stripped.next(), expected.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) if a == b => continue,
            _ => return false,
        }
    }
}

/// Join fragments on the separator, re-split, trim, drop empty fields and cap
/// the result at `expected_count` tokens.
pub fn split_tokens(fragments: &[String], separator: char, expected_count: usize) -> Vec<String> {
    fragments
        .iter()
        .flat_map(|fragment| fragment.split(separator))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .take(expected_count)
        .map(str::to_string)
        .collect()
}

/// Pulls lines from a `LineSource` until one block for a sentinel completes.
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    separator: char,
    block_timeout: Option<Duration>,
}

impl BlockExtractor {
    pub fn new(separator: char) -> Self {
        Self { separator, block_timeout: None }
    }

    /// Fail with `ReadError::BlockTimeout` when a block takes longer than `limit`.
    /// Without a deadline an unterminated block waits forever.
    pub fn with_block_timeout(mut self, limit: Option<Duration>) -> Self {
        self.block_timeout = limit;
        self
    }

    /// Read lines until a complete block for `sentinel` has been seen and
    /// return at most `expected_count` tokens from it.
    pub async fn extract_block<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        sentinel: &Sentinel,
        expected_count: usize,
    ) -> Result<Vec<String>, ReadError> {
        let mut parser = BlockParser::new(sentinel.clone(), self.separator, expected_count);
        let started = Instant::now();
        let deadline = self.block_timeout.map(|limit| started + limit);
        let mut lines_read = 0usize;
        let mut idle_reads = 0usize;

        loop {
            let next = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, source.read_line()).await {
                        Ok(next) => next?,
                        Err(_) => {
                            debug!(
                                sentinel = %sentinel,
                                state = ?parser.state(),
                                lines_read = lines_read,
                                "block_timeout"
                            );
                            return Err(ReadError::BlockTimeout {
                                sentinel: sentinel.to_string(),
                                waited: started.elapsed(),
                            });
                        }
                    }
                }
                None => source.read_line().await?,
            };

            let Some(line) = next else {
                idle_reads += 1;
                trace!(sentinel = %sentinel, idle_reads = idle_reads, "line_timeout");
                continue;
            };

            lines_read += 1;
            if let Some(tokens) = parser.feed(&line) {
                debug!(
                    sentinel = %sentinel,
                    tokens = tokens.len(),
                    expected = expected_count,
                    lines_read = lines_read,
                    elapsed_us = %started.elapsed().as_micros(),
                    "block_extracted"
                );
                return Ok(tokens);
            }
        }
    }
}
