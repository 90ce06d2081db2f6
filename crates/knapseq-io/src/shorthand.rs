use std::fs::File;
use std::path::Path;

use knapseq_solver::{ItemSequence, SequenceRow};

use crate::{IoError, Result, record_line};

const ADDED: &str = "+";
const REMOVED: &str = "-";

/// A sequence row with item names resolved, as stored in shorthand files
#[derive(Debug, Clone, PartialEq)]
pub struct ShorthandRow {
    pub capacity: usize,
    pub value: f64,
    pub base_row: usize,
    /// Names of items added to the base row
    pub added: Vec<String>,
    /// Names of items removed from the base row
    pub removed: Vec<String>,
}

impl ShorthandRow {
    pub fn from_row(row: &SequenceRow, items: &ItemSequence) -> Self {
        let owned = |names: Vec<&str>| -> Vec<String> {
            names.into_iter().map(str::to_string).collect()
        };
        Self {
            capacity: row.capacity,
            value: row.value,
            base_row: row.base_row,
            added: owned(row.added_names(items)),
            removed: owned(row.removed_names(items)),
        }
    }

    fn fields(&self) -> Vec<String> {
        if self.capacity == 0 {
            return vec!["0".to_string(), self.value.to_string()];
        }
        let mut fields = Vec::with_capacity(5 + self.added.len() + self.removed.len());
        fields.push(self.capacity.to_string());
        fields.push(self.value.to_string());
        fields.push(self.base_row.to_string());
        fields.push(ADDED.to_string());
        fields.extend(self.added.iter().cloned());
        fields.push(REMOVED.to_string());
        fields.extend(self.removed.iter().cloned());
        fields
    }

    fn parse(record: &csv::StringRecord) -> Result<Self> {
        let line = record_line(record);
        let error = |message: String| IoError::Parse { line, message };
        let fields: Vec<&str> = record.iter().collect();

        let capacity = fields
            .first()
            .and_then(|field| field.parse::<usize>().ok())
            .ok_or_else(|| error("missing or invalid capacity".to_string()))?;
        let value = fields
            .get(1)
            .and_then(|field| field.parse::<f64>().ok())
            .ok_or_else(|| error("missing or invalid value".to_string()))?;

        if fields.len() == 2 {
            return Ok(Self {
                capacity,
                value,
                base_row: capacity,
                added: Vec::new(),
                removed: Vec::new(),
            });
        }

        let base_row = fields[2]
            .parse::<usize>()
            .map_err(|_| error(format!("invalid base row '{}'", fields[2])))?;
        if fields.get(3) != Some(&ADDED) {
            return Err(error(format!("expected '{ADDED}' after the base row")));
        }
        let rest = &fields[4..];
        let Some(split) = rest.iter().position(|&field| field == REMOVED) else {
            return Err(error(format!("missing '{REMOVED}' separator")));
        };

        let owned = |names: &[&str]| -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        };
        Ok(Self {
            capacity,
            value,
            base_row,
            added: owned(&rest[..split]),
            removed: owned(&rest[split + 1..]),
        })
    }
}

/// Write rows in shorthand form, one CSV record each
pub fn write_shorthand<W: std::io::Write>(
    writer: W,
    rows: &[SequenceRow],
    items: &ItemSequence,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_writer(writer);
    for row in rows {
        writer.write_record(ShorthandRow::from_row(row, items).fields())?;
    }
    writer.flush()?;
    Ok(())
}

/// Replace the file at `path` with the shorthand rows
pub fn save_shorthand(
    path: impl AsRef<Path>,
    rows: &[SequenceRow],
    items: &ItemSequence,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_shorthand(file, rows, items)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote shorthand rows");
    Ok(())
}

pub fn read_shorthand<R: std::io::Read>(reader: R) -> Result<Vec<ShorthandRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(ShorthandRow::parse(&record?)?);
    }
    Ok(rows)
}

pub fn load_shorthand(path: impl AsRef<Path>) -> Result<Vec<ShorthandRow>> {
    read_shorthand(File::open(path.as_ref())?)
}
