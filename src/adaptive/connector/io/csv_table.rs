use std::io::{Read, Write};

use csv::{ReaderBuilder, WriterBuilder};

use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::model::{Cell, Table};

/// Decodes comma-separated text with a header row into a [`Table`].
///
/// Header names are kept verbatim; rows whose width differs from the header
/// are rejected.
pub fn decode(text: &str) -> Result<Table> {
    read_table(text.as_bytes())
}

/// Reads a table from any CSV source.
pub fn read_table<R: Read>(source: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(source);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        table.rows.push(record.iter().map(Cell::from_field).collect());
    }
    Ok(table)
}

/// Writes a table, header first, to any sink.
pub fn write_table<W: Write>(sink: W, table: &Table, include_header: bool) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    if include_header && !table.columns.is_empty() {
        writer.write_record(&table.columns)?;
    }
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

/// Encodes a table as comma-separated text with a header row.
pub fn encode(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_table(&mut buffer, table, true)?;
    String::from_utf8(buffer)
        .map_err(|err| ConnectorError::Parse(format!("encoded table is not UTF-8: {err}")))
}
