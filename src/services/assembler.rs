//! Frame assembly: one block per channel group, converted to fixed-length
//! numeric vectors.

use crate::domain::{ChannelGroup, Frame, GroupReading, MISSING};
use crate::infra::config::Config;
use crate::io::line_source::{LineSource, ReadError};
use crate::services::extractor::BlockExtractor;
use std::borrow::Cow;
use std::time::Instant;
use tracing::debug;

/// Convert one token to a reading.
///
/// Total: anything that does not parse to a number greater than zero becomes
/// `MISSING`. The sensors never report non-positive intensity. `inf` and
/// overflowing tokens stay positive infinity; the chart clips them.
pub fn to_reading(token: &str) -> f64 {
    let Some(digits) = strip_digit_underscores(token.trim()) else {
        return MISSING;
    };
    match digits.parse::<f64>() {
        Ok(value) if value > 0.0 => value,
        _ => MISSING,
    }
}

/// Drop digit-group underscores (`1_000`). An underscore that is not
/// between two digits makes the token unparseable.
fn strip_digit_underscores(token: &str) -> Option<Cow<'_, str>> {
    if !token.contains('_') {
        return Some(Cow::Borrowed(token));
    }
    let bytes = token.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 1).copied();
        let between_digits = matches!(
            (before, after),
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit()
        );
        if !between_digits {
            return None;
        }
    }
    Some(Cow::Owned(token.replace('_', "")))
}

/// Convert tokens and right-pad with `MISSING` to exactly `channel_count` values
pub fn to_readings(tokens: &[String], channel_count: usize) -> Vec<f64> {
    let mut values: Vec<f64> =
        tokens.iter().take(channel_count).map(|token| to_reading(token)).collect();
    values.resize(channel_count, MISSING);
    values
}

/// Produces one `Frame` per call by reading a block for every group in order.
pub struct ReadingAssembler<S> {
    source: S,
    extractor: BlockExtractor,
    groups: Vec<ChannelGroup>,
    frames_assembled: u64,
}

impl<S: LineSource> ReadingAssembler<S> {
    pub fn new(source: S, extractor: BlockExtractor, groups: Vec<ChannelGroup>) -> Self {
        Self { source, extractor, groups, frames_assembled: 0 }
    }

    /// Assembler wired from configuration (separator, block deadline, groups)
    pub fn from_config(source: S, config: &Config) -> Self {
        let extractor =
            BlockExtractor::new(config.separator()).with_block_timeout(config.block_timeout());
        Self::new(source, extractor, config.groups().to_vec())
    }

    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn frames_assembled(&self) -> u64 {
        self.frames_assembled
    }

    pub fn source_name(&self) -> &str {
        self.source.describe()
    }

    /// Read the next complete frame.
    ///
    /// Blocks in configuration order; each group's vector has exactly one value
    /// per channel. Errors are stream conditions only, never data quality.
    pub async fn next_frame(&mut self) -> Result<Frame, ReadError> {
        let started = Instant::now();
        let mut frame = Frame { groups: Vec::with_capacity(self.groups.len()) };

        for group in &self.groups {
            let tokens = self
                .extractor
                .extract_block(&mut self.source, &group.sentinel, group.channel_count())
                .await?;
            let values = to_readings(&tokens, group.channel_count());
            frame.groups.push(GroupReading { name: group.name.clone(), values });
        }

        self.frames_assembled += 1;
        debug!(
            frame = self.frames_assembled,
            groups = frame.groups.len(),
            elapsed_ms = %started.elapsed().as_millis(),
            "frame_assembled"
        );
        Ok(frame)
    }
}
