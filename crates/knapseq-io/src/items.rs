use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use knapseq_solver::{Direction, Item, ItemSequence};

use crate::{IoError, Result, record_line};

/// Read a headerless `name,weight,cost,value` list, already sorted for `direction`
pub fn read_items(path: impl AsRef<Path>, direction: Direction) -> Result<ItemSequence> {
    let file = File::open(path.as_ref())?;
    parse_items(file, direction)
}

pub fn parse_items<R: std::io::Read>(reader: R, direction: Direction) -> Result<ItemSequence> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record_line(&record);
        if record.len() != 4 {
            return Err(IoError::Parse {
                line,
                message: format!("expected 4 fields, found {}", record.len()),
            });
        }

        let weight: u64 = field(&record, 1, "weight", line)?;
        let cost: f64 = field(&record, 2, "cost", line)?;
        let value: f64 = field(&record, 3, "value", line)?;
        items.push(Item::with_cost(&record[0], weight, cost, value));
    }

    tracing::debug!(items = items.len(), ?direction, "read item list");
    Ok(ItemSequence::new(items, direction)?)
}

fn field<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<T> {
    record[index].parse().map_err(|_| IoError::Parse {
        line,
        message: format!("invalid {name} '{}'", &record[index]),
    })
}
