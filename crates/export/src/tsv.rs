use std::io::Write;

use meisai_core::TransactionList;

use crate::ExportError;

/// Write `date<TAB>title<TAB>amount` rows, no header. Fields are quoted only
/// when they contain a tab, quote or line break.
pub fn write_tsv<W: Write>(list: &TransactionList, writer: W) -> Result<(), ExportError> {
    let mut w = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for tx in list {
        let amount = tx.amount().to_string();
        w.write_record([tx.date(), tx.title(), amount.as_str()])?;
    }
    w.flush()?;
    Ok(())
}

/// Render the list as one TSV string, the form spreadsheets accept on paste.
pub fn to_tsv_string(list: &TransactionList) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_tsv(list, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
