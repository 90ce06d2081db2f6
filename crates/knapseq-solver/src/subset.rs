use std::ops::Range;

use crate::item::{Item, ItemSequence};

/// A set of items with its total value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subset {
    /// Sum of member values
    pub value: f64,
    /// Member item indices, ascending
    pub members: Vec<usize>,
}

impl Subset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Highest member index, i.e. the lowest-cost member
    pub fn last(&self) -> Option<usize> {
        self.members.last().copied()
    }

    pub fn weight(&self, items: &ItemSequence) -> u64 {
        self.members.iter().map(|&index| items[index].weight).sum()
    }

    /// Copy of this subset with `item` appended; `item` must come after every member
    pub(crate) fn with_item(&self, item: &Item) -> Self {
        let mut members = Vec::with_capacity(self.members.len() + 1);
        members.extend_from_slice(&self.members);
        members.push(item.index);
        Self {
            value: self.value + item.value,
            members,
        }
    }
}

/// Best subset of `items[range]` weighing exactly `capacity`, by plain 0/1 knapsack
pub(crate) fn best_exact_subset(
    items: &ItemSequence,
    range: Range<usize>,
    capacity: usize,
) -> Option<Subset> {
    let direction = items.direction();
    let mut table: Vec<Option<Subset>> = vec![None; capacity + 1];
    table[0] = Some(Subset::empty());

    for index in range {
        let item = &items[index];
        let width = item.width();
        if width > capacity {
            continue;
        }
        for slot in (width..=capacity).rev() {
            let value = match &table[slot - width] {
                Some(base) => base.value + item.value,
                None => continue,
            };
            let replace = table[slot]
                .as_ref()
                .is_none_or(|current| direction.better(value, current.value));
            if replace {
                table[slot] = table[slot - width].as_ref().map(|base| base.with_item(item));
            }
        }
    }

    table.pop().flatten()
}
