mod add_table;
mod item;
mod markers;
mod optimizer;
mod sequence;
mod subset;
mod subtract_table;

pub use add_table::{AddEntry, AddTable, AmbiguityPolicy};
pub use item::{Direction, InputError, Item, ItemSequence};
pub use markers::{Markers, PruneBounds};
pub use optimizer::{Optimizer, Solver, StepError, infinite_knapsack_terms};
pub use sequence::{
    AmbiguityReport, OverflowReport, PruningReport, ReplayError, Sequence, SequenceRow,
    SequenceStatus, replay,
};
pub use subset::Subset;
pub use subtract_table::{SubtractEntry, SubtractTable};
