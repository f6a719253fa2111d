//! Per-item results of the sequential destination save loops.
//!
//! Calls are issued one after another in list order. Nothing is rolled back,
//! so a failure under [`BatchPolicy::StopOnError`] leaves a prefix of the list
//! applied and the rest reported as [`ItemOutcome::NotAttempted`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    #[default]
    StopOnError,
    ContinueOnError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Created(String),
    Updated(String),
    SkippedUnnamed,
    Failed(String),
    NotAttempted,
}

impl ItemOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ItemOutcome::Created(_) | ItemOutcome::Updated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    outcomes: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    /// Outcome for the draft at `index` in the list that was saved.
    pub fn outcome(&self, index: usize) -> Option<&ItemOutcome> {
        self.outcomes.get(index)
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| match outcome {
                ItemOutcome::Failed(message) => Some((index, message.as_str())),
                _ => None,
            })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| !matches!(o, ItemOutcome::Failed(_) | ItemOutcome::NotAttempted))
    }
}
