use thiserror::Error;

use crate::add_table::{AddEntry, AddTable, AmbiguityPolicy};
use crate::item::ItemSequence;
use crate::markers::Markers;
use crate::sequence::{
    AmbiguityReport, OverflowReport, PruningReport, Sequence, SequenceRow, SequenceStatus,
};
use crate::subtract_table::SubtractTable;

/// Why a step could not certify all of its terms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Capacity {} needs more items of weight {}", .report.capacity, .report.weight)]
    Overflow {
        report: OverflowReport,
        /// Rows certified by the failing step before it stopped
        certified: Vec<SequenceRow>,
    },
    #[error(
        "Unproven optimum for weight {} at item {}: item {} gives {} against {}",
        .0.weight, .0.position, .0.suspect, .0.search_value, .0.recurrence_value
    )]
    UnprovenAmbiguity(AmbiguityReport),
    #[error(
        "Pruning markers ran off the item list at item {}; stopping at capacity {}",
        .report.position, .report.capacity
    )]
    MarkersExhausted {
        report: PruningReport,
        /// Rows certified by the step that moved the markers
        certified: Vec<SequenceRow>,
    },
}

/// Infinite-knapsack term solver
#[derive(Debug, Clone)]
pub struct Solver {
    /// Trim dominated subtract-table entries
    pruning: bool,
    /// Reaction to an unproven final-member ambiguity
    ambiguity: AmbiguityPolicy,
    /// Items between progress reports, 0 for none
    progress_interval: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            pruning: true,
            ambiguity: AmbiguityPolicy::Halt,
            progress_interval: 1000,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pruning(mut self, pruning: bool) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Start an incremental run over `items`
    pub fn optimizer<'a>(&self, items: &'a ItemSequence) -> Optimizer<'a> {
        Optimizer::new(items, self.pruning, self.ambiguity)
    }

    /// Certify as many terms as the item list allows
    pub fn solve(&self, items: &ItemSequence) -> Sequence {
        self.solve_with(items, |_| {})
    }

    /// Like [`Solver::solve`], calling `checkpoint` with the rows so far every
    /// `progress_interval` items
    pub fn solve_with<F>(&self, items: &ItemSequence, mut checkpoint: F) -> Sequence
    where
        F: FnMut(&[SequenceRow]),
    {
        let mut optimizer = self.optimizer(items);
        let mut rows = vec![SequenceRow::origin()];

        let status = loop {
            if optimizer.is_finished() {
                break SequenceStatus::Exhausted;
            }
            match optimizer.step() {
                Ok(new_rows) => rows.extend(new_rows),
                Err(StepError::Overflow { report, certified }) => {
                    rows.extend(certified);
                    break SequenceStatus::Overflow(report);
                }
                Err(StepError::UnprovenAmbiguity(report)) => {
                    break SequenceStatus::Ambiguous(report);
                }
                Err(StepError::MarkersExhausted { report, certified }) => {
                    rows.extend(certified);
                    break SequenceStatus::MarkersExhausted(report);
                }
            }

            let position = optimizer.position();
            if self.progress_interval > 0 && position % self.progress_interval == 0 {
                tracing::info!(
                    position,
                    subtract = optimizer.subtract_table().len(),
                    rows = rows.len(),
                    "progress"
                );
                checkpoint(&rows);
            }
        };

        Sequence { rows, status }
    }
}

/// Terms of the infinite knapsack over `items` with default settings
pub fn infinite_knapsack_terms(items: &ItemSequence) -> Sequence {
    Solver::new().solve(items)
}

/// Table state of a run in progress; each step absorbs one item
#[derive(Debug)]
pub struct Optimizer<'a> {
    items: &'a ItemSequence,
    pruning: bool,
    ambiguity: AmbiguityPolicy,
    /// Next item to absorb
    position: usize,
    /// Total weight of the absorbed items, i.e. the last certified capacity
    capacity: usize,
    /// Value at `capacity`
    base_value: f64,
    add: AddTable,
    subtract: SubtractTable,
    markers: Markers,
    /// Some attained subtract entry has been pruned
    pruned: bool,
    halted: bool,
}

impl<'a> Optimizer<'a> {
    fn new(items: &'a ItemSequence, pruning: bool, ambiguity: AmbiguityPolicy) -> Self {
        Self {
            items,
            pruning,
            ambiguity,
            position: 0,
            capacity: 0,
            base_value: 0.0,
            add: AddTable::new(),
            subtract: SubtractTable::new(),
            markers: Markers::new(items),
            pruned: false,
            halted: false,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add_table(&self) -> &AddTable {
        &self.add
    }

    pub fn subtract_table(&self) -> &SubtractTable {
        &self.subtract
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// The last item is lookahead only, so a run ends one item early
    pub fn is_finished(&self) -> bool {
        self.halted || self.position + 1 >= self.items.len()
    }

    /// Absorb the next item and return the rows it certifies
    pub fn step(&mut self) -> Result<Vec<SequenceRow>, StepError> {
        if self.is_finished() {
            return Ok(Vec::new());
        }
        let items = self.items;
        let direction = items.direction();
        let position = self.position;
        let item = &items[position];
        let width = self.subtract.len() + item.width().max(items[position + 1].width());

        if let Err(report) = self.add.advance(items, position, width, self.ambiguity) {
            self.halted = true;
            tracing::warn!(
                position,
                weight = report.weight,
                suspect = report.suspect,
                "halting on unproven final-member ambiguity"
            );
            return Err(StepError::UnprovenAmbiguity(report));
        }

        // capacities strictly inside the item's weight: best exchange of a suffix
        // subset against a prefix subset, on top of the prefix
        let mut rows = Vec::with_capacity(item.width());
        for delta in 1..item.width() {
            let mut best = self.add.entry(delta).value();
            let mut best_offset = 0;
            for (offset, entry) in self.subtract.entries().iter().enumerate().skip(1) {
                let Some(worst) = entry.value() else {
                    continue;
                };
                let candidate = self.add.entry(delta + offset).value() - worst;
                if direction.better(candidate, best) {
                    best = candidate;
                    best_offset = offset;
                }
            }

            let capacity = self.capacity + delta;
            let added = match self.add.entry(delta + best_offset) {
                AddEntry::Exact(subset) => subset.members.clone(),
                AddEntry::Overflowed { weight, .. } => {
                    let weight = *weight;
                    self.halted = true;
                    let report = OverflowReport { capacity, weight };
                    tracing::warn!(capacity, weight, "item list too short to certify capacity");
                    return Err(StepError::Overflow {
                        report,
                        certified: rows,
                    });
                }
            };
            let removed = self
                .subtract
                .entry(best_offset)
                .subset()
                .map(|subset| subset.members.clone())
                .unwrap_or_default();

            rows.push(SequenceRow {
                capacity,
                value: self.base_value + best,
                base_row: self.capacity,
                added,
                removed,
            });
        }

        // the extended prefix is optimal at its own weight and is the base of the next step
        let base_row = self.capacity;
        self.capacity += item.width();
        self.base_value += item.value;
        rows.push(SequenceRow {
            capacity: self.capacity,
            value: self.base_value,
            base_row,
            added: vec![position],
            removed: Vec::new(),
        });

        self.subtract.absorb(item, direction);
        if self.markers.advance(position, items) {
            tracing::debug!(
                position,
                lead = ?self.markers.lead(),
                follow = ?self.markers.follow(),
                "markers advanced"
            );
        }

        // entries pruned so far were only dominated while a heavier item lay ahead
        if self.pruned && self.markers.is_suspended() && position + 2 < items.len() {
            self.halted = true;
            self.position += 1;
            let report = PruningReport {
                position,
                capacity: self.capacity,
            };
            tracing::warn!(
                position,
                capacity = self.capacity,
                "pruning markers ran off the item list"
            );
            return Err(StepError::MarkersExhausted {
                report,
                certified: rows,
            });
        }

        if self.pruning {
            if let Some(bounds) = self.markers.bounds(items, position) {
                let removed = self.subtract.prune(&bounds, direction);
                if removed > 0 {
                    self.pruned = true;
                    tracing::debug!(position, removed, "pruned subtract table");
                }
            }
        }

        self.position += 1;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Direction, Item};
    use proptest::prelude::*;

    /// Best (or worst, when `best` is false) value per exact weight over `items[range]`
    fn exhaustive(
        items: &ItemSequence,
        range: std::ops::Range<usize>,
        capacity: usize,
        best: bool,
    ) -> Vec<Option<f64>> {
        let direction = items.direction();
        let mut table = vec![None; capacity + 1];
        table[0] = Some(0.0);
        for index in range {
            let item = &items[index];
            let width = item.weight as usize;
            if width > capacity {
                continue;
            }
            for slot in (width..=capacity).rev() {
                let Some(base) = table[slot - width] else {
                    continue;
                };
                let candidate: f64 = base + item.value;
                let replace = match table[slot] {
                    None => true,
                    Some(current) if best => direction.better(candidate, current),
                    Some(current) => direction.better(current, candidate),
                };
                if replace {
                    table[slot] = Some(candidate);
                }
            }
        }
        table
    }

    fn prime_factor_items() -> ItemSequence {
        ItemSequence::new(
            vec![
                Item::new("3", 1, 3f64.log2()),
                Item::new("2", 1, 1.0),
                Item::with_cost("7", 2, 0.9, 1.8),
            ],
            Direction::Maximize,
        )
        .unwrap()
    }

    #[test]
    fn test_first_terms() {
        let items = prime_factor_items();
        let sequence = infinite_knapsack_terms(&items);

        assert_eq!(sequence.status, SequenceStatus::Exhausted);
        assert_eq!(sequence.len(), 3);

        let first = &sequence.rows[1];
        assert_eq!(first.capacity, 1);
        assert_eq!(first.base_row, 0);
        assert_eq!(first.added_names(&items), vec!["3"]);
        assert!((first.value - 3f64.log2()).abs() < 1e-12);

        let second = &sequence.rows[2];
        assert_eq!(second.base_row, 1);
        assert_eq!(second.added_names(&items), vec!["2"]);
        assert!(second.removed.is_empty());
        assert!((second.value - (3f64.log2() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_overflow_when_weight_class_missing() {
        let items = ItemSequence::new(
            vec![
                Item::new("a", 2, 6.0),
                Item::new("b", 2, 4.0),
                Item::new("c", 2, 2.0),
            ],
            Direction::Maximize,
        )
        .unwrap();
        let mut optimizer = Solver::new().optimizer(&items);

        match optimizer.step() {
            Err(StepError::Overflow { report, certified }) => {
                assert_eq!(report, OverflowReport { capacity: 1, weight: 1 });
                assert!(certified.is_empty());
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert!(optimizer.is_finished());
        assert_eq!(optimizer.step(), Ok(Vec::new()));

        let sequence = Solver::new().solve(&items);
        assert_eq!(sequence.len(), 1);
        assert!(matches!(sequence.status, SequenceStatus::Overflow(_)));
    }

    #[test]
    fn test_checkpoints_follow_interval() {
        let items = ItemSequence::new(
            (0..6)
                .map(|index| Item::with_cost(format!("x{index}"), 1, 6.0 - index as f64, 6.0 - index as f64))
                .collect(),
            Direction::Maximize,
        )
        .unwrap();

        let mut seen = Vec::new();
        let sequence = Solver::new()
            .with_pruning(false)
            .with_progress_interval(2)
            .solve_with(&items, |rows| seen.push(rows.len()));

        assert_eq!(sequence.status, SequenceStatus::Exhausted);
        assert_eq!(sequence.len(), 6);
        assert_eq!(seen, vec![3, 5]);
    }

    fn descending_units(count: usize) -> ItemSequence {
        ItemSequence::new(
            (0..count)
                .map(|index| {
                    let cost = (count - index) as f64;
                    Item::with_cost(format!("x{index}"), 1, cost, cost)
                })
                .collect(),
            Direction::Maximize,
        )
        .unwrap()
    }

    #[test]
    fn test_pruned_run_stops_when_markers_run_off() {
        let items = descending_units(6);

        let sequence = Solver::new().solve(&items);
        assert_eq!(
            sequence.status,
            SequenceStatus::MarkersExhausted(PruningReport {
                position: 3,
                capacity: 4
            })
        );
        assert_eq!(sequence.len(), 5);
        assert_eq!(sequence.rows[4].value, 18.0);

        let unpruned = Solver::new().with_pruning(false).solve(&items);
        assert_eq!(unpruned.status, SequenceStatus::Exhausted);
        assert_eq!(unpruned.len(), 6);
        assert_eq!(unpruned.rows[..5], sequence.rows[..]);
    }

    #[test]
    fn test_heavy_item_behind_light_prefix() {
        let mut raw: Vec<Item> = (0..5)
            .map(|index| {
                let cost = 4.5 - index as f64 * 1e-7;
                Item::with_cost(format!("l{index}"), 1, cost, cost)
            })
            .collect();
        raw.push(Item::with_cost("heavy", 6, 4.375, 26.25));
        raw.push(Item::with_cost("small", 1, 0.125, 0.125));
        raw.push(Item::with_cost("pair", 2, 0.125, 0.25));
        let items = ItemSequence::new(raw, Direction::Maximize).unwrap();

        let pruned = Solver::new().solve(&items);
        let unpruned = Solver::new().with_pruning(false).solve(&items);
        assert_eq!(pruned.status, SequenceStatus::Exhausted);
        assert_eq!(pruned.len(), unpruned.len());

        // capacity 6 swaps the whole light prefix for the heavy item
        let row = &pruned.rows[6];
        assert_eq!(row.base_row, 5);
        assert_eq!(row.added_names(&items), vec!["heavy"]);
        assert_eq!(row.removed, vec![0, 1, 2, 3, 4]);
        assert!((row.value - 26.25).abs() < 1e-9, "capacity 6 gave {}", row.value);

        for (left, right) in pruned.rows.iter().zip(&unpruned.rows) {
            assert!(
                (left.value - right.value).abs() < 1e-9,
                "capacity {}: {} vs {}",
                left.capacity,
                left.value,
                right.value
            );
        }
    }

    #[test]
    fn test_tied_costs_keep_rows_decodable() {
        let mut raw = vec![Item::new("a", 2, 2.0)];
        raw.extend(["b", "c", "d", "e", "f"].map(|name| Item::new(name, 1, 1.0)));
        let items = ItemSequence::new(raw, Direction::Maximize).unwrap();

        let sequence = Solver::new().solve(&items);
        assert_eq!(sequence.status, SequenceStatus::Exhausted);
        assert_eq!(sequence.len(), 7);
        assert_eq!(sequence.rows[2].added_names(&items), vec!["a"]);
        assert_eq!(sequence.rows[3].base_row, 2);

        let sets = crate::sequence::replay(&sequence.rows).unwrap();
        for (row, set) in sequence.rows.iter().zip(&sets) {
            let weight: u64 = set.iter().map(|&index| items[index].weight).sum();
            assert_eq!(weight, row.capacity as u64);
            assert_eq!(row.value, row.capacity as f64);
        }
    }

    fn item_lists() -> impl Strategy<Value = ItemSequence> {
        // quantized costs produce ties
        let cost = prop_oneof![0.1f64..3.0, prop::sample::select(vec![0.5, 1.0, 1.5, 2.0])];
        let item = (prop::sample::select(vec![1u64, 1, 2, 2, 3, 4, 5, 6]), cost);
        (prop::collection::vec(item, 3..14), any::<bool>()).prop_map(|(raw, maximize)| {
            let direction = if maximize {
                Direction::Maximize
            } else {
                Direction::Minimize
            };
            let items = raw
                .into_iter()
                .enumerate()
                .map(|(index, (weight, cost))| {
                    Item::with_cost(index.to_string(), weight, cost, cost * weight as f64)
                })
                .collect();
            ItemSequence::sorted(items, direction).unwrap()
        })
    }

    proptest! {
        #[test]
        fn test_tables_match_exhaustive_search(items in item_lists(), pruning in any::<bool>()) {
            let direction = items.direction();
            let sign = match direction {
                Direction::Maximize => 1.0,
                Direction::Minimize => -1.0,
            };
            let mut optimizer = Solver::new()
                .with_pruning(pruning)
                .with_ambiguity_policy(AmbiguityPolicy::Resolve)
                .optimizer(&items);

            while !optimizer.is_finished() {
                let position = optimizer.position();
                if optimizer.step().is_err() {
                    break;
                }

                let add = optimizer.add_table();
                let suffix = exhaustive(&items, position..items.len(), add.len(), true);
                for (weight, entry) in add.entries().iter().enumerate() {
                    match entry {
                        AddEntry::Exact(subset) => {
                            let expected = suffix[weight];
                            prop_assert!(expected.is_some(), "weight {} is unreachable", weight);
                            prop_assert!((expected.unwrap() - subset.value).abs() < 1e-9);
                            prop_assert_eq!(subset.weight(&items), weight as u64);
                        }
                        AddEntry::Overflowed { bound, .. } => {
                            if let Some(expected) = suffix[weight] {
                                prop_assert!((expected - bound) * sign <= 1e-9,
                                    "bound {} does not cover {}", bound, expected);
                            }
                        }
                    }
                }

                // pruning lets a slot miss a combination through a dropped weight,
                // but every entry is still a real subset
                let subtract = optimizer.subtract_table();
                let prefix = exhaustive(&items, 0..position + 1, subtract.len(), false);
                for (weight, entry) in subtract.entries().iter().enumerate() {
                    let Some(subset) = entry.subset() else {
                        if !pruning {
                            prop_assert!(prefix[weight].is_none(), "weight {} is reachable", weight);
                        }
                        continue;
                    };
                    let total: f64 = subset.members.iter().map(|&index| items[index].value).sum();
                    prop_assert!((total - subset.value).abs() < 1e-9);
                    prop_assert_eq!(subset.weight(&items), weight as u64);

                    let expected = prefix[weight].unwrap();
                    if pruning {
                        prop_assert!((subset.value - expected) * sign >= -1e-9);
                    } else {
                        prop_assert!((subset.value - expected).abs() < 1e-9,
                            "weight {}: {} vs {}", weight, subset.value, expected);
                    }
                }
            }
        }
    }
}
