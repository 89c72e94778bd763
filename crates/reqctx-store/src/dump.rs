//! Diagnostic dump — point-in-time snapshots of store contents.
//!
//! The store only produces [`DumpEntry`] records; where they go is decided
//! by a caller-supplied [`DumpSink`].

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

/// One `(request id, key, value)` triple from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpEntry {
    pub request_id: String,
    pub key: String,
    pub value: Value,
}

impl DumpEntry {
    pub fn new(request_id: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            request_id: request_id.into(),
            key: key.into(),
            value,
        }
    }
}

impl std::fmt::Display for DumpEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.request_id, self.key, self.value)
    }
}

/// Destination for dump entries.
pub trait DumpSink {
    fn emit(&mut self, entry: &DumpEntry) -> Result<(), StoreError>;

    /// Called once after the last entry of a dump.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Emits each entry as a `tracing` debug event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DumpSink for TracingSink {
    fn emit(&mut self, entry: &DumpEntry) -> Result<(), StoreError> {
        debug!(
            request_id = %entry.request_id,
            key = %entry.key,
            value = %entry.value,
            "Request context entry"
        );
        Ok(())
    }
}

/// Writes one `"{request_id} {key} {value}"` line per entry.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DumpSink for WriterSink<W> {
    fn emit(&mut self, entry: &DumpEntry) -> Result<(), StoreError> {
        writeln!(self.writer, "{entry}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects entries in memory.
impl DumpSink for Vec<DumpEntry> {
    fn emit(&mut self, entry: &DumpEntry) -> Result<(), StoreError> {
        self.push(entry.clone());
        Ok(())
    }
}
