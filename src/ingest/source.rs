//! Message sources the ingest worker can read from.

use super::{MessageSource, SourceError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

/// In-process source fed through a tokio channel.
///
/// Dropping every sender exhausts the source.
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    pub fn new(buffer: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Result<Vec<u8>, SourceError> {
        self.rx.recv().await.ok_or(SourceError::Exhausted)
    }
}

/// Newline-delimited JSON: one message per non-blank line.
pub struct LineSource<R> {
    lines: Lines<R>,
    line_no: u64,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl LineSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl LineSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R> MessageSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Vec<u8>, SourceError> {
        loop {
            self.line_no += 1;
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Ok(line.into_bytes()),
                Ok(None) => return Err(SourceError::Exhausted),
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(SourceError::Malformed(format!("line {}: {e}", self.line_no)));
                }
                Err(e) => return Err(SourceError::Io(e)),
            }
        }
    }
}
