use std::io::Write;

use meisai_core::TransactionList;

use crate::tsv::to_tsv_string;
use crate::ExportError;

/// Destination for the rendered TSV table.
pub trait ExportSink {
    fn send(&mut self, tsv: &str) -> Result<(), ExportError>;
}

/// Logs every row, then hands the whole table to `sink`.
pub fn export<S: ExportSink + ?Sized>(list: &TransactionList, sink: &mut S) -> Result<(), ExportError> {
    for tx in list {
        tracing::info!(date = tx.date(), title = tx.title(), amount = tx.amount(), "Exporting row");
    }
    let tsv = to_tsv_string(list)?;
    sink.send(&tsv)
}

/// Writes the table to any `io::Write`, e.g. stdout.
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

impl<W: Write> ExportSink for WriterSink<W> {
    fn send(&mut self, tsv: &str) -> Result<(), ExportError> {
        self.writer.write_all(tsv.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

// ── System clipboard (optional, gated behind `clipboard` feature) ─────────────

/// Places the table on the system clipboard as plain text.
///
/// On X11 the contents only outlive the process when a clipboard manager is running.
#[cfg(feature = "clipboard")]
pub struct ClipboardSink {
    clipboard: arboard::Clipboard,
}

#[cfg(feature = "clipboard")]
impl ClipboardSink {
    pub fn new() -> Result<Self, ExportError> {
        let clipboard = arboard::Clipboard::new().map_err(|e| ExportError::Clipboard(e.to_string()))?;
        Ok(Self { clipboard })
    }
}

#[cfg(feature = "clipboard")]
impl ExportSink for ClipboardSink {
    fn send(&mut self, tsv: &str) -> Result<(), ExportError> {
        self.clipboard
            .set_text(tsv)
            .map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}
