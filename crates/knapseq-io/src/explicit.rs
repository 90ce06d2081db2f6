use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use num_bigint::BigUint;

use crate::shorthand::ShorthandRow;
use crate::{IoError, Result};

/// Line layout for explicit terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplicitStyle {
    /// `n,value`
    #[default]
    Csv,
    /// `n value`, the OEIS b-file layout
    BFile,
}

impl ExplicitStyle {
    fn separator(self) -> char {
        match self {
            ExplicitStyle::Csv => ',',
            ExplicitStyle::BFile => ' ',
        }
    }
}

/// Expand shorthand rows into integers by reading item names as factors.
///
/// Row 0 is 1; every later row multiplies its base row by the added names and divides
/// by the removed ones. `limit` is the last capacity to expand.
pub fn to_explicit(rows: &[ShorthandRow], limit: Option<usize>) -> Result<Vec<BigUint>> {
    let last = match limit {
        Some(limit) => limit.min(rows.len().saturating_sub(1)),
        None => rows.len().saturating_sub(1),
    };
    let mut explicit = Vec::with_capacity(last + 1);
    explicit.push(BigUint::from(1u32));

    for (index, row) in rows.iter().enumerate().take(last + 1).skip(1) {
        let error = |message: String| IoError::Reconstruct {
            row: index,
            message,
        };
        if row.capacity != index {
            return Err(error(format!("stored capacity is {}", row.capacity)));
        }
        let Some(base) = explicit.get(row.base_row) else {
            return Err(error(format!("base row {} does not precede it", row.base_row)));
        };

        let mut value = base.clone();
        for name in &row.added {
            value *= factor(name).map_err(error)?;
        }
        for name in &row.removed {
            let divisor = factor(name).map_err(error)?;
            if divisor == BigUint::default() || &value % &divisor != BigUint::default() {
                return Err(error(format!("{value} is not divisible by {name}")));
            }
            value /= divisor;
        }
        explicit.push(value);
    }

    Ok(explicit)
}

fn factor(name: &str) -> std::result::Result<BigUint, String> {
    name.parse()
        .map_err(|_| format!("item name '{name}' is not a non-negative integer"))
}

pub fn write_explicit<W: Write>(
    mut writer: W,
    values: &[BigUint],
    style: ExplicitStyle,
) -> Result<()> {
    let separator = style.separator();
    for (index, value) in values.iter().enumerate() {
        writeln!(writer, "{index}{separator}{value}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_explicit(path: impl AsRef<Path>, values: &[BigUint], style: ExplicitStyle) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_explicit(BufWriter::new(file), values, style)?;
    tracing::debug!(path = %path.display(), terms = values.len(), ?style, "wrote explicit terms");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shorthand::read_shorthand;

    fn rows(text: &str) -> Vec<ShorthandRow> {
        read_shorthand(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_to_explicit() {
        let rows = rows("0,0\n1,1.58,0,+,3,-\n2,2.58,1,+,2,-\n3,3.58,2,+,5,-,2\n");
        let values = to_explicit(&rows, None).unwrap();
        let values: Vec<String> = values.iter().map(|value| value.to_string()).collect();
        assert_eq!(values, vec!["1", "3", "6", "15"]);

        let limited = to_explicit(&rows, Some(1)).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(to_explicit(&rows, Some(99)).unwrap().len(), 4);
    }

    #[test]
    fn test_to_explicit_grows_past_machine_integers() {
        let mut text = String::from("0,0\n");
        for capacity in 1..=40 {
            text.push_str(&format!("{capacity},0,{},+,65537,-\n", capacity - 1));
        }
        let values = to_explicit(&rows(&text), None).unwrap();
        assert_eq!(values[40], BigUint::from(65537u32).pow(40));
    }

    #[test]
    fn test_to_explicit_errors() {
        let err = to_explicit(&rows("0,0\n1,1,0,+,x,-\n"), None).unwrap_err();
        assert!(matches!(err, IoError::Reconstruct { row: 1, .. }), "got {err:?}");

        let err = to_explicit(&rows("0,0\n1,1,0,+,3,-,2\n"), None).unwrap_err();
        assert!(matches!(err, IoError::Reconstruct { row: 1, .. }), "got {err:?}");

        let err = to_explicit(&rows("0,0\n1,1,4,+,3,-\n"), None).unwrap_err();
        assert!(matches!(err, IoError::Reconstruct { row: 1, .. }), "got {err:?}");
    }

    #[test]
    fn test_write_explicit_styles() {
        let values = vec![BigUint::from(1u32), BigUint::from(3u32)];

        let mut csv = Vec::new();
        write_explicit(&mut csv, &values, ExplicitStyle::Csv).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "0,1\n1,3\n");

        let mut bfile = Vec::new();
        write_explicit(&mut bfile, &values, ExplicitStyle::BFile).unwrap();
        assert_eq!(String::from_utf8(bfile).unwrap(), "0 1\n1 3\n");
    }
}
