use std::ops::Index;

use thiserror::Error;

/// Whether sequence terms are the largest or the smallest value per capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Items sorted by descending cost, terms maximize value
    #[default]
    Maximize,
    /// Items sorted by ascending cost, terms minimize value
    Minimize,
}

impl Direction {
    /// Whether `a` is strictly preferable to `b`
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a > b,
            Direction::Minimize => a < b,
        }
    }

    /// Whether an item of cost `later` may follow one of cost `earlier`
    pub fn allows(self, earlier: f64, later: f64) -> bool {
        !self.better(later, earlier)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Item list needs at least 2 items, found {0}")]
    TooFewItems(usize),
    #[error("Item {index} ({name}) has zero weight")]
    ZeroWeight { index: usize, name: String },
    #[error("Item {index} ({name}) has a non-finite value or cost")]
    NonFinite { index: usize, name: String },
    #[error("Item {index} ({name}) is out of {direction:?} cost order: {cost} follows {previous}")]
    Unsorted {
        index: usize,
        name: String,
        cost: f64,
        previous: f64,
        direction: Direction,
    },
}

/// A single item that can be placed in the knapsack
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Opaque label, read back as a multiplicative factor when rows are expanded
    pub name: String,
    /// Capacity consumed by the item
    pub weight: u64,
    /// Value per unit weight, used for ordering
    pub cost: f64,
    /// Benefit of including the item
    pub value: f64,
    /// Position in the sorted sequence
    pub index: usize,
}

impl Item {
    /// Create an item whose cost is derived from its value
    pub fn new(name: impl Into<String>, weight: u64, value: f64) -> Self {
        Self::with_cost(name, weight, value / weight as f64, value)
    }

    /// Create an item from a record that already carries its cost
    pub fn with_cost(name: impl Into<String>, weight: u64, cost: f64, value: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            cost,
            value,
            index: 0,
        }
    }

    /// Weight as a table offset
    pub(crate) fn width(&self) -> usize {
        self.weight as usize
    }
}

/// Validated, cost-ordered list of items
#[derive(Debug, Clone)]
pub struct ItemSequence {
    items: Vec<Item>,
    direction: Direction,
    /// `prefix_weights[k]` is the total weight of `items[..k]`
    prefix_weights: Vec<u64>,
    /// `suffix_max_weights[k]` is the heaviest weight in `items[k..]`, 0 past the end
    suffix_max_weights: Vec<u64>,
}

impl ItemSequence {
    /// Validate items that are already sorted for `direction`
    pub fn new(mut items: Vec<Item>, direction: Direction) -> Result<Self, InputError> {
        if items.len() < 2 {
            return Err(InputError::TooFewItems(items.len()));
        }

        let mut prefix_weights = Vec::with_capacity(items.len() + 1);
        prefix_weights.push(0);

        for (index, item) in items.iter_mut().enumerate() {
            item.index = index;
            if item.weight == 0 {
                return Err(InputError::ZeroWeight {
                    index,
                    name: item.name.clone(),
                });
            }
            if !item.value.is_finite() || !item.cost.is_finite() {
                return Err(InputError::NonFinite {
                    index,
                    name: item.name.clone(),
                });
            }
            let total = prefix_weights[index];
            prefix_weights.push(total + item.weight);
        }

        for index in 1..items.len() {
            let (previous, item) = (&items[index - 1], &items[index]);
            if !direction.allows(previous.cost, item.cost) {
                return Err(InputError::Unsorted {
                    index,
                    name: item.name.clone(),
                    cost: item.cost,
                    previous: previous.cost,
                    direction,
                });
            }
        }

        let mut suffix_max_weights = vec![0; items.len() + 1];
        for index in (0..items.len()).rev() {
            suffix_max_weights[index] = suffix_max_weights[index + 1].max(items[index].weight);
        }

        Ok(Self {
            items,
            direction,
            prefix_weights,
            suffix_max_weights,
        })
    }

    /// Sort items by cost for `direction` (stable on ties), then validate
    pub fn sorted(mut items: Vec<Item>, direction: Direction) -> Result<Self, InputError> {
        match direction {
            Direction::Maximize => items.sort_by(|a, b| b.cost.total_cmp(&a.cost)),
            Direction::Minimize => items.sort_by(|a, b| a.cost.total_cmp(&b.cost)),
        }
        Self::new(items, direction)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Total weight of the items before `index`
    pub fn weight_before(&self, index: usize) -> u64 {
        self.prefix_weights[index]
    }

    /// Total weight of the items in `start..end`
    pub fn weight_between(&self, start: usize, end: usize) -> u64 {
        self.prefix_weights[end] - self.prefix_weights[start]
    }

    /// Cost of the last listed item: every unlisted item is at most this good
    pub fn last_cost(&self) -> f64 {
        self.items[self.items.len() - 1].cost
    }

    /// Most favourable value an unlisted item of `weight` could have
    pub(crate) fn overflow_bound(&self, weight: usize) -> f64 {
        weight as f64 * self.last_cost()
    }

    /// Heaviest weight among the items from `index` on, 0 if there are none
    pub(crate) fn max_weight_from(&self, index: usize) -> u64 {
        self.suffix_max_weights
            .get(index)
            .copied()
            .unwrap_or_default()
    }

    /// First index after `after` whose item weighs at least `weight`
    pub(crate) fn next_at_least(&self, after: usize, weight: u64) -> Option<usize> {
        (after + 1..self.items.len()).find(|&index| self.items[index].weight >= weight)
    }
}

impl Index<usize> for ItemSequence {
    type Output = Item;

    fn index(&self, index: usize) -> &Item {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a ItemSequence {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
