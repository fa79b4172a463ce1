use crate::config::OUTPUT_BUFFER_SIZE;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Destination for output lines: one line per record, newline-terminated, in arrival order.
pub struct Sink<W: Write> {
    writer: BufWriter<W>,
}

impl Sink<Box<dyn Write + Send>> {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates (or truncates) `path`. Fails before any page is processed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self::new(Box::new(file)))
    }
}

impl<W: Write> Sink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, writer),
        }
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    /// Drains `lines` until every sender is gone, then flushes.
    ///
    /// Returns the number of lines written and the underlying writer.
    pub fn collect(mut self, lines: Receiver<String>) -> Result<(u64, W)> {
        let mut written = 0u64;
        for line in lines {
            self.write_line(&line).context("Failed to write output line")?;
            written += 1;
        }
        debug!(lines = written, "Collector drained");
        self.finish().map(|writer| (written, writer))
    }

    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush output")
    }
}
