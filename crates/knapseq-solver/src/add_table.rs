use std::collections::VecDeque;

use crate::item::ItemSequence;
use crate::sequence::AmbiguityReport;
use crate::subset::{Subset, best_exact_subset};

/// What to do when the final-member check finds a subset the recurrence missed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AmbiguityPolicy {
    /// Stop the run and report the ambiguity
    #[default]
    Halt,
    /// Adopt the subset found by the exact search and continue
    Resolve,
}

/// Best subset of the unprocessed suffix at one exact weight
#[derive(Debug, Clone, PartialEq)]
pub enum AddEntry {
    /// Certified optimum
    Exact(Subset),
    /// The item list ends before this weight can be certified
    Overflowed {
        /// Value no real subset can beat
        bound: f64,
        /// Weight class that ran out of items
        weight: usize,
    },
}

impl AddEntry {
    /// Certified value, or the bound for overflowed entries
    pub fn value(&self) -> f64 {
        match self {
            AddEntry::Exact(subset) => subset.value,
            AddEntry::Overflowed { bound, .. } => *bound,
        }
    }

    pub fn exact(&self) -> Option<&Subset> {
        match self {
            AddEntry::Exact(subset) => Some(subset),
            AddEntry::Overflowed { .. } => None,
        }
    }
}

/// Known positions of one weight class
#[derive(Debug)]
struct CursorClass {
    /// Indices of items of this weight that are not yet behind the position, ascending
    found: VecDeque<usize>,
    /// Next index to scan for more items of this weight
    scan: usize,
}

/// Forward-only cursors into the item sequence, one per weight class
#[derive(Debug, Default)]
pub(crate) struct WeightCursors {
    classes: Vec<CursorClass>,
}

impl WeightCursors {
    /// First item of `weight` at index `start` or later
    fn find(
        &mut self,
        items: &ItemSequence,
        weight: usize,
        start: usize,
        position: usize,
    ) -> Option<usize> {
        if self.classes.len() <= weight {
            self.classes.resize_with(weight + 1, || CursorClass {
                found: VecDeque::new(),
                scan: position,
            });
        }
        let class = &mut self.classes[weight];

        let known = class.found.partition_point(|&index| index < start);
        if let Some(&index) = class.found.get(known) {
            return Some(index);
        }

        while class.scan < items.len() {
            let index = class.scan;
            class.scan += 1;
            if items[index].width() == weight {
                class.found.push_back(index);
                if index >= start {
                    return Some(index);
                }
            }
        }
        None
    }

    /// Most favourable value any remaining item of `weight` can have
    fn ceiling(&mut self, items: &ItemSequence, weight: usize, position: usize) -> f64 {
        match self.find(items, weight, position, position) {
            Some(index) => items[index].value,
            None => items.overflow_bound(weight),
        }
    }

    /// Forget everything before `position`
    fn trim(&mut self, position: usize) {
        for class in &mut self.classes {
            while class.found.front().is_some_and(|&index| index < position) {
                class.found.pop_front();
            }
            class.scan = class.scan.max(position);
        }
    }
}

/// A subset from the exact search that beats what the recurrence would produce
#[derive(Debug)]
struct Suspect {
    final_weight: usize,
    member: usize,
    subset: Subset,
}

/// Best suffix subset for every weight up to the working width
#[derive(Debug)]
pub struct AddTable {
    entries: Vec<AddEntry>,
    cursors: WeightCursors,
}

impl Default for AddTable {
    fn default() -> Self {
        Self {
            entries: vec![AddEntry::Exact(Subset::empty())],
            cursors: WeightCursors::default(),
        }
    }
}

impl AddTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, weight: usize) -> &AddEntry {
        &self.entries[weight]
    }

    pub fn entries(&self) -> &[AddEntry] {
        &self.entries
    }

    /// Drop item `position - 1` from eligibility and size the table to `width`
    pub(crate) fn advance(
        &mut self,
        items: &ItemSequence,
        position: usize,
        width: usize,
        policy: AmbiguityPolicy,
    ) -> Result<(), AmbiguityReport> {
        self.cursors.trim(position);
        self.entries.truncate(width.max(1));
        let dropped = position.checked_sub(1);

        // entries that held the dropped item, or lie past the old width, are rebuilt
        // bottom-up; everything else is still optimal for the shorter suffix
        for weight in 1..width {
            // the dropped item has the highest cost, so it can only be the first member
            let stale = match self.entries.get(weight) {
                None => true,
                Some(AddEntry::Exact(subset)) => {
                    dropped.is_some() && subset.members.first().copied() == dropped
                }
                Some(AddEntry::Overflowed { .. }) => false,
            };
            if !stale {
                continue;
            }

            let entry = self.recompute(items, position, weight, policy)?;
            if weight < self.entries.len() {
                self.entries[weight] = entry;
            } else {
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Rebuild the entry for `target` from the entries below it
    fn recompute(
        &mut self,
        items: &ItemSequence,
        position: usize,
        target: usize,
        policy: AmbiguityPolicy,
    ) -> Result<AddEntry, AmbiguityReport> {
        let direction = items.direction();
        let Self { entries, cursors } = self;

        // recurrence: a smaller entry extended by the next item of the final weight
        let mut best = extend(entries, cursors, items, position, target, 1);
        let mut suspect: Option<Suspect> = None;

        for final_weight in 1..=target {
            if final_weight > 1 {
                let candidate = extend(entries, cursors, items, position, target, final_weight);
                if direction.better(candidate.value(), best.value()) {
                    best = candidate;
                }
            }

            // a search hit has to beat both the recurrence and every earlier hit, so the
            // threshold tracks whichever is ahead
            if let AddEntry::Exact(base) = &entries[target - final_weight] {
                let threshold = match &suspect {
                    Some(found) if direction.better(found.subset.value, best.value()) => {
                        found.subset.value
                    }
                    _ => best.value(),
                };
                if let Some(found) =
                    search_final_member(items, base, position, target, final_weight, threshold)
                {
                    suspect = Some(found);
                }
            }
        }

        // the recurrence stands unless a search found something strictly better
        let Some(suspect) = suspect else {
            return Ok(best);
        };
        if !direction.better(suspect.subset.value, best.value()) {
            return Ok(best);
        }

        match policy {
            AmbiguityPolicy::Halt => Err(AmbiguityReport {
                position,
                weight: target,
                final_weight: suspect.final_weight,
                suspect: suspect.member,
                recurrence_value: best.value(),
                search_value: suspect.subset.value,
            }),
            AmbiguityPolicy::Resolve => {
                tracing::debug!(
                    position,
                    weight = target,
                    suspect = suspect.member,
                    "resolved final-member ambiguity with exact search"
                );
                Ok(AddEntry::Exact(suspect.subset))
            }
        }
    }
}

/// Candidate for `target` whose lowest-cost member weighs `final_weight`
fn extend(
    entries: &[AddEntry],
    cursors: &mut WeightCursors,
    items: &ItemSequence,
    position: usize,
    target: usize,
    final_weight: usize,
) -> AddEntry {
    match &entries[target - final_weight] {
        AddEntry::Overflowed { bound, weight } => AddEntry::Overflowed {
            bound: bound + cursors.ceiling(items, final_weight, position),
            weight: (*weight).max(final_weight),
        },
        AddEntry::Exact(base) => {
            let start = base.last().map_or(position, |last| last + 1);
            match cursors.find(items, final_weight, start, position) {
                Some(index) => AddEntry::Exact(base.with_item(&items[index])),
                None => AddEntry::Overflowed {
                    bound: base.value + items.overflow_bound(final_weight),
                    weight: final_weight,
                },
            }
        }
    }
}

/// Look for a subset of weight `target` whose lowest-cost member is already in `base`.
///
/// The recurrence only ever appends an item found after `base`, so it misses such a
/// subset. A member `z` of `base` can play that role only when some item in
/// `position..z` is missing from `base` and those items weigh enough to fill the rest.
/// Candidates whose optimistic value cannot beat `threshold` are skipped; the others
/// are settled by an exact knapsack over `position..z`.
fn search_final_member(
    items: &ItemSequence,
    base: &Subset,
    position: usize,
    target: usize,
    final_weight: usize,
    threshold: f64,
) -> Option<Suspect> {
    let direction = items.direction();
    let remainder = target - final_weight;
    let mut threshold = threshold;
    let mut found = None;

    for (preceding, &member) in base.members.iter().enumerate() {
        if items[member].width() != final_weight {
            continue;
        }
        if preceding >= member - position {
            continue;
        }
        if items.weight_between(position, member) < remainder as u64 {
            continue;
        }
        let optimistic = base.value + items[member].value;
        if !direction.better(optimistic, threshold) {
            continue;
        }

        let Some(prefix) = best_exact_subset(items, position..member, remainder) else {
            continue;
        };
        let subset = prefix.with_item(&items[member]);
        if direction.better(subset.value, threshold) {
            threshold = subset.value;
            found = Some(Suspect {
                final_weight,
                member,
                subset,
            });
        }
    }
    found
}
