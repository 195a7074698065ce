//! Capture-file line source
//!
//! Feeds a text capture of the serial stream through the same path as the
//! live port. End of file closes the source.

use crate::io::line_source::StreamLineReader;
use anyhow::Context;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::info;

pub type ReplayLineReader = StreamLineReader<BufReader<File>>;

pub async fn open_replay<P: AsRef<Path>>(path: P) -> anyhow::Result<ReplayLineReader> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open capture file {}", path.display()))?;

    info!(file = %path.display(), "replay_file_opened");
    Ok(StreamLineReader::new(path.display().to_string(), BufReader::new(file), None))
}
