use std::collections::BTreeSet;

use thiserror::Error;

use crate::item::ItemSequence;

/// One certified term, stored as a difference against an earlier row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceRow {
    /// Knapsack capacity; equal to the row's position in the sequence
    pub capacity: usize,
    /// Optimal value at this capacity
    pub value: f64,
    /// Row whose item set this row is derived from
    pub base_row: usize,
    /// Item indices added to the base row's set
    pub added: Vec<usize>,
    /// Item indices removed from the base row's set
    pub removed: Vec<usize>,
}

impl SequenceRow {
    /// Row 0: the empty knapsack
    pub fn origin() -> Self {
        Self {
            capacity: 0,
            value: 0.0,
            base_row: 0,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn added_names<'a>(&self, items: &'a ItemSequence) -> Vec<&'a str> {
        self.added.iter().map(|&index| items[index].name.as_str()).collect()
    }

    pub fn removed_names<'a>(&self, items: &'a ItemSequence) -> Vec<&'a str> {
        self.removed.iter().map(|&index| items[index].name.as_str()).collect()
    }
}

/// The first capacity the item list cannot certify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverflowReport {
    pub capacity: usize,
    /// Weight class that ran out of listed items
    pub weight: usize,
}

/// A suffix subset the recurrence could not account for
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmbiguityReport {
    /// Item index being processed
    pub position: usize,
    /// Add-table weight being rebuilt
    pub weight: usize,
    /// Weight of the suspect item
    pub final_weight: usize,
    /// Index of the suspect item
    pub suspect: usize,
    /// Value the recurrence produced
    pub recurrence_value: f64,
    /// Value found by the exact search
    pub search_value: f64,
}

/// A pruned run whose markers found no heavier item ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PruningReport {
    /// Item index whose step moved the markers off the list
    pub position: usize,
    /// Last certified capacity
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceStatus {
    /// The item list was used up without failure
    Exhausted,
    /// A capacity could not be certified with the listed items
    Overflow(OverflowReport),
    /// The run halted on an unproven final-member ambiguity
    Ambiguous(AmbiguityReport),
    /// Entries were pruned and the markers ran off the list; later terms could rely
    /// on what was pruned
    MarkersExhausted(PruningReport),
}

/// Certified rows of a run and how the run ended
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    pub rows: Vec<SequenceRow>,
    pub status: SequenceStatus,
}

impl Sequence {
    /// Number of certified terms, row 0 included
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Largest certified capacity
    pub fn max_capacity(&self) -> Option<usize> {
        self.rows.last().map(|row| row.capacity)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Row {row} has capacity {capacity}")]
    Misplaced { row: usize, capacity: usize },
    #[error("Row {row} refers to base row {base}, which does not precede it")]
    ForwardBase { row: usize, base: usize },
    #[error("Row {row} adds item {item}, which its base already holds")]
    DuplicateItem { row: usize, item: usize },
    #[error("Row {row} removes item {item}, which its base does not hold")]
    MissingItem { row: usize, item: usize },
}

/// Expand delta-encoded rows into the full item set of every row
pub fn replay(rows: &[SequenceRow]) -> Result<Vec<BTreeSet<usize>>, ReplayError> {
    let mut sets: Vec<BTreeSet<usize>> = Vec::with_capacity(rows.len());

    for (row, entry) in rows.iter().enumerate() {
        if entry.capacity != row {
            return Err(ReplayError::Misplaced {
                row,
                capacity: entry.capacity,
            });
        }
        if row == 0 {
            sets.push(BTreeSet::new());
            continue;
        }
        let Some(base) = sets.get(entry.base_row) else {
            return Err(ReplayError::ForwardBase {
                row,
                base: entry.base_row,
            });
        };

        let mut set = base.clone();
        for &item in &entry.removed {
            if !set.remove(&item) {
                return Err(ReplayError::MissingItem { row, item });
            }
        }
        for &item in &entry.added {
            if !set.insert(item) {
                return Err(ReplayError::DuplicateItem { row, item });
            }
        }
        sets.push(set);
    }

    Ok(sets)
}
