use crate::item::{ItemKey, ItemList};

/// Errors raised while resolving or committing a crafting tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CraftError {
    /// A subtree cannot currently supply this much of this item.
    /// Recoverable wherever a sibling recipe can still be tried.
    #[error("cannot supply {shortfall} of {item:?}")]
    BranchFailure { item: ItemKey, shortfall: u64 },

    /// Committing a plan found less stock than the plan recorded.
    /// The job must be recalculated before it can be submitted.
    #[error("stale plan: expected {expected} of {item:?}, extracted {extracted}")]
    StalePlan {
        item: ItemKey,
        expected: u64,
        extracted: u64,
    },

    #[error("resolution cancelled")]
    Cancelled,
}

impl CraftError {
    pub fn branch(item: ItemKey, shortfall: u64) -> Self {
        CraftError::BranchFailure { item, shortfall }
    }

    pub fn is_branch_failure(&self) -> bool {
        matches!(self, CraftError::BranchFailure { .. })
    }
}

/// Errors raised by [`crate::job::CraftingJob`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("job has not been calculated")]
    NotCalculated,

    #[error("job is missing {} item kind(s)", .missing.kinds())]
    Incomplete { missing: ItemList },

    #[error(transparent)]
    Craft(#[from] CraftError),
}
