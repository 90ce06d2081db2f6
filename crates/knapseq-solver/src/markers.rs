use crate::item::ItemSequence;

/// Parameters for one pruning pass over the subtract table
#[derive(Debug, Clone, PartialEq)]
pub struct PruneBounds {
    /// Cost of the next unprocessed item
    pub rate: f64,
    pub lead_weight: usize,
    pub lead_value: f64,
    /// Heaviest item after the lead; the kept window spans `lead_weight + tail_weight`
    pub tail_weight: usize,
    /// Weight of the item just before the lead marker
    pub before_lead_weight: usize,
    pub before_lead_value: f64,
}

/// Lead and follow positions that drive subtract-table pruning.
///
/// The follow marker is always the first item after the lead that weighs at least as
/// much as it. Once either marker runs off the end of the list no further pruning is
/// possible; a run that already pruned has to stop there.
#[derive(Debug, Clone, PartialEq)]
pub struct Markers {
    lead: Option<usize>,
    follow: Option<usize>,
    /// The lead has moved at least once, so the bounds are meaningful
    armed: bool,
}

impl Markers {
    pub fn new(items: &ItemSequence) -> Self {
        let threshold = items[0].weight.max(items[1].weight);
        Self {
            lead: Some(1),
            follow: items.next_at_least(1, threshold),
            armed: false,
        }
    }

    pub fn lead(&self) -> Option<usize> {
        self.lead
    }

    pub fn follow(&self) -> Option<usize> {
        self.follow
    }

    pub fn is_suspended(&self) -> bool {
        self.lead.is_none() || self.follow.is_none()
    }

    /// Move the markers after item `position` was absorbed; returns true if they moved
    pub(crate) fn advance(&mut self, position: usize, items: &ItemSequence) -> bool {
        if self.lead != Some(position + 1) {
            return false;
        }
        self.lead = self.follow;
        self.follow = self
            .lead
            .and_then(|lead| items.next_at_least(lead, items[lead].weight));
        self.armed = true;

        if self.is_suspended() {
            tracing::debug!(position, "pruning markers ran off the item list");
            self.lead = None;
            self.follow = None;
        }
        true
    }

    /// Pruning parameters for the step at `position`, if pruning is possible
    pub(crate) fn bounds(&self, items: &ItemSequence, position: usize) -> Option<PruneBounds> {
        if !self.armed || self.is_suspended() {
            return None;
        }
        let lead = self.lead?;
        let next = items.get(position + 1)?;
        let before_lead = &items[lead - 1];
        Some(PruneBounds {
            rate: next.cost,
            lead_weight: items[lead].width(),
            lead_value: items[lead].value,
            tail_weight: items.max_weight_from(lead + 1) as usize,
            before_lead_weight: before_lead.width(),
            before_lead_value: before_lead.value,
        })
    }
}
