use crate::item::{Direction, Item};
use crate::markers::PruneBounds;
use crate::subset::Subset;

/// Worst prefix subset at one exact weight
#[derive(Debug, Clone, PartialEq)]
pub enum SubtractEntry {
    /// No subset of the processed prefix has this weight
    Unattained,
    Attained(Subset),
}

impl SubtractEntry {
    pub fn subset(&self) -> Option<&Subset> {
        match self {
            SubtractEntry::Attained(subset) => Some(subset),
            SubtractEntry::Unattained => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.subset().map(|subset| subset.value)
    }
}

/// Least favourable subset of the processed items for every weight in the window
#[derive(Debug)]
pub struct SubtractTable {
    entries: Vec<SubtractEntry>,
}

impl Default for SubtractTable {
    fn default() -> Self {
        Self {
            entries: vec![SubtractEntry::Attained(Subset::empty())],
        }
    }
}

impl SubtractTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, weight: usize) -> &SubtractEntry {
        &self.entries[weight]
    }

    pub fn entries(&self) -> &[SubtractEntry] {
        &self.entries
    }

    fn value(&self, weight: usize) -> Option<f64> {
        self.entries[weight].value()
    }

    /// Grow the window by the item's weight and let every subset take the item
    pub(crate) fn absorb(&mut self, item: &Item, direction: Direction) {
        let width = item.width();
        let top = self.entries.len();
        self.entries.resize(top + width, SubtractEntry::Unattained);

        // high to low, so no subset takes the item twice
        for weight in (0..top).rev() {
            let SubtractEntry::Attained(subset) = &self.entries[weight] else {
                continue;
            };
            let candidate = subset.value + item.value;
            let replace = match &self.entries[weight + width] {
                SubtractEntry::Unattained => true,
                SubtractEntry::Attained(current) => direction.better(current.value, candidate),
            };
            if replace {
                self.entries[weight + width] = SubtractEntry::Attained(subset.with_item(item));
            }
        }
    }

    /// Drop tail weights that no future term can subtract.
    ///
    /// Returns how many attained entries were dropped. Unattained tail slots hold no
    /// subset, so they go without a test and are not counted.
    pub(crate) fn prune(&mut self, bounds: &PruneBounds, direction: Direction) -> usize {
        let floor = bounds.lead_weight + bounds.tail_weight;
        if self.entries.len() <= floor {
            return 0;
        }

        // best rate-adjusted value in the protected window; a gap in it means no
        // tail entry can be shown dominated
        let mut reference: Option<f64> = None;
        for weight in bounds.lead_weight..floor {
            let Some(value) = self.value(weight) else {
                return 0;
            };
            let adjusted = value - bounds.rate * weight as f64;
            if reference.is_none_or(|best| direction.better(adjusted, best)) {
                reference = Some(adjusted);
            }
        }
        let Some(reference) = reference else {
            return 0;
        };

        let mut removed = 0;
        while self.entries.len() > floor {
            let weight = self.entries.len() - 1;
            let Some(value) = self.value(weight) else {
                self.entries.pop();
                continue;
            };

            // I: no crossing point in the window beats it at the current rate
            // II, III: extending a smaller entry by the lead, or by the item before
            // the lead, would already replace it
            let dominated = !direction.better(reference, value - bounds.rate * weight as f64);
            let beats = |offset: usize, extra: f64| {
                weight
                    .checked_sub(offset)
                    .and_then(|base| self.value(base))
                    .is_some_and(|base| direction.better(value, base + extra))
            };
            if dominated
                && beats(bounds.lead_weight, bounds.lead_value)
                && beats(bounds.before_lead_weight, bounds.before_lead_value)
            {
                self.entries.pop();
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemSequence;

    fn values(table: &SubtractTable) -> Vec<Option<f64>> {
        table.entries().iter().map(SubtractEntry::value).collect()
    }

    #[test]
    fn test_absorb_keeps_least_favourable() {
        let items = ItemSequence::new(
            vec![
                Item::new("a", 2, 6.0),
                Item::new("b", 1, 2.0),
                Item::new("c", 1, 1.0),
            ],
            Direction::Maximize,
        )
        .unwrap();
        let mut table = SubtractTable::new();

        table.absorb(&items[0], Direction::Maximize);
        assert_eq!(values(&table), vec![Some(0.0), None, Some(6.0)]);

        table.absorb(&items[1], Direction::Maximize);
        assert_eq!(values(&table), vec![Some(0.0), Some(2.0), Some(6.0), Some(8.0)]);

        table.absorb(&items[2], Direction::Maximize);
        assert_eq!(
            values(&table),
            vec![Some(0.0), Some(1.0), Some(3.0), Some(7.0), Some(9.0)]
        );
        assert_eq!(table.entry(2).subset().unwrap().members, vec![1, 2]);
        assert_eq!(table.entry(3).subset().unwrap().members, vec![0, 2]);
    }

    #[test]
    fn test_absorb_minimize_keeps_largest() {
        let items = ItemSequence::new(
            vec![Item::new("a", 1, 1.0), Item::new("b", 1, 2.0)],
            Direction::Minimize,
        )
        .unwrap();
        let mut table = SubtractTable::new();
        table.absorb(&items[0], Direction::Minimize);
        table.absorb(&items[1], Direction::Minimize);

        assert_eq!(values(&table), vec![Some(0.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_prune_drops_dominated_tail() {
        let items = ItemSequence::new(
            vec![
                Item::new("a", 1, 5.0),
                Item::new("b", 1, 4.0),
                Item::new("c", 1, 3.0),
            ],
            Direction::Maximize,
        )
        .unwrap();
        let mut table = SubtractTable::new();
        for item in &items {
            table.absorb(item, Direction::Maximize);
        }
        assert_eq!(table.len(), 4);

        let bounds = PruneBounds {
            rate: 1.0,
            lead_weight: 1,
            lead_value: 0.5,
            tail_weight: 1,
            before_lead_weight: 1,
            before_lead_value: 0.5,
        };
        let removed = table.prune(&bounds, Direction::Maximize);
        assert_eq!(removed, 2);
        assert_eq!(values(&table), vec![Some(0.0), Some(3.0)]);
    }

    #[test]
    fn test_prune_stops_at_unattained_window() {
        let items = ItemSequence::new(
            vec![Item::new("a", 2, 6.0), Item::new("b", 2, 4.0)],
            Direction::Maximize,
        )
        .unwrap();
        let mut table = SubtractTable::new();
        table.absorb(&items[0], Direction::Maximize);
        table.absorb(&items[1], Direction::Maximize);

        let bounds = PruneBounds {
            rate: 0.0,
            lead_weight: 1,
            lead_value: 0.0,
            tail_weight: 1,
            before_lead_weight: 1,
            before_lead_value: 0.0,
        };
        assert_eq!(table.prune(&bounds, Direction::Maximize), 0);
        assert_eq!(table.len(), 5);
    }
}
