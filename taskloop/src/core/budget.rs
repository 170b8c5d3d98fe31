//! Iteration budget for a run.

/// Maximum number of attempts in a run. `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterationBudget {
    max_iterations: u32,
}

impl IterationBudget {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_iterations == 0
    }

    /// True when the 1-indexed `iteration` lies past the budget.
    pub fn exceeded_by(&self, iteration: u32) -> bool {
        !self.is_unlimited() && iteration > self.max_iterations
    }
}
