use crate::transform::{CanonicalRecord, Schema};

/// UTF-8 byte-order mark, so spreadsheet tools detect the encoding
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serializes records as BOM-prefixed CSV
///
/// The header row always comes from `schema`, so an empty record set still
/// yields a valid header-only file. Numbers are written with two decimals and
/// nulls as empty fields.
pub fn render_csv(schema: &Schema, records: &[CanonicalRecord]) -> std::io::Result<Vec<u8>> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(schema.columns())?;
    for record in records {
        debug_assert_eq!(record.schema().columns(), schema.columns());
        writer.write_record(record.values().iter().map(|value| value.to_string()))?;
    }

    writer.into_inner().map_err(|e| e.into_error())
}
