//! A crafting job: one top-level request, calculated against a stock snapshot
//! and later submitted against the real stock.
//!
//! Calculation first runs a real pass on a scratch copy of the stock. If that
//! pass cannot be satisfied the tree is switched into simulation mode and run
//! again, so the summary always carries a complete plan plus whatever is
//! missing.

use crate::catalog::{RecipeCatalog, RecipeDetails};
use crate::config::JobOptions;
use crate::context::{JobHandle, ResolutionContext};
use crate::error::{CraftError, JobError};
use crate::id::RecipeId;
use crate::inventory::{ActionSource, Actionable, InventoryView, MemoryInventory, NestedView};
use crate::item::{ItemList, ItemStack};
use crate::plan::{Plan, Reservation, ReservationSink};
use crate::tree::CraftingTree;

/// A recipe the job must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftingTask {
    pub recipe: RecipeId,
    pub name: String,
    pub runs: u64,
    pub depth: usize,
}

/// Result of [`CraftingJob::calculate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// `true` when the real pass failed and the plan is a projection.
    pub simulated: bool,
    pub missing: ItemList,
    pub cost: u64,
    pub tasks: Vec<CraftingTask>,
    pub plan: Plan,
}

impl JobSummary {
    pub fn is_complete(&self) -> bool {
        !self.simulated && self.missing.is_empty()
    }
}

/// Context state owned by a job for the duration of one pass.
#[derive(Debug, Default)]
struct JobState {
    handle: JobHandle,
    /// Stock that may still be logged as used.
    claims: MemoryInventory,
    missing: ItemList,
    cost: u64,
    tasks: Vec<CraftingTask>,
}

impl JobState {
    fn reset(&mut self, stock: &ItemList) {
        self.claims = MemoryInventory::from_list(stock.clone());
        self.missing.clear();
        self.cost = 0;
        self.tasks.clear();
    }
}

impl ResolutionContext for JobState {
    fn check_pause_or_cancel(&mut self) -> Result<(), CraftError> {
        self.handle.checkpoint()
    }

    fn record_missing(&mut self, stack: ItemStack) {
        self.missing.add(stack);
    }

    fn record_cost(&mut self, units: u64) {
        self.cost = self.cost.saturating_add(units);
    }

    fn refund(&mut self, stack: ItemStack) {
        self.claims.inject(&stack, &ActionSource::Planner);
    }

    fn check_use(&mut self, stack: ItemStack) -> Option<ItemStack> {
        self.claims
            .extract(&stack, Actionable::Modulate, &ActionSource::Planner)
    }

    fn record_task(&mut self, recipe: &RecipeDetails, runs: u64, depth: usize) {
        self.tasks.push(CraftingTask {
            recipe: recipe.id,
            name: recipe.name.clone(),
            runs,
            depth,
        });
    }
}

pub struct CraftingJob {
    target: ItemStack,
    options: JobOptions,
    tree: CraftingTree,
    state: JobState,
    summary: Option<JobSummary>,
    src: ActionSource,
}

impl CraftingJob {
    /// Build the tree for `target`. Nothing is resolved until
    /// [`CraftingJob::calculate`].
    pub fn new(catalog: &dyn RecipeCatalog, target: ItemStack, options: JobOptions) -> Self {
        Self {
            target,
            options,
            tree: CraftingTree::build(catalog, target, options.resolver),
            state: JobState::default(),
            summary: None,
            src: ActionSource::Planner,
        }
    }

    /// Act on inventories as `src` instead of the planner.
    pub fn with_source(mut self, src: ActionSource) -> Self {
        self.src = src;
        self
    }

    /// Shared pause/resume/cancel switch for this job.
    pub fn handle(&self) -> JobHandle {
        self.state.handle.clone()
    }

    pub fn target(&self) -> ItemStack {
        self.target
    }

    pub fn tree(&self) -> &CraftingTree {
        &self.tree
    }

    pub fn summary(&self) -> Option<&JobSummary> {
        self.summary.as_ref()
    }

    /// Resolve the target against a snapshot of `stock`. `stock` itself is
    /// never modified.
    pub fn calculate(&mut self, stock: &dyn InventoryView) -> Result<&JobSummary, CraftError> {
        self.summary = None;

        let mut snapshot = stock.contents();
        if self.options.exclude_target_from_stock {
            let held = snapshot.quantity(self.target.key);
            let _ = snapshot.remove(self.target.with_quantity(held));
        }

        self.tree.reset();
        self.state.reset(&snapshot);
        let mut scratch = MemoryInventory::from_list(snapshot.clone());
        let quantity = self.target.quantity;

        match self.tree.request(&mut scratch, &mut self.state, quantity, &self.src) {
            Ok(_) => {}
            Err(CraftError::BranchFailure { item, shortfall }) => {
                tracing::debug!(?item, shortfall, "real pass failed, re-running as simulation");
                self.tree.set_simulate();
                self.state.reset(&snapshot);
                let mut scratch = MemoryInventory::from_list(snapshot);
                self.tree
                    .request(&mut scratch, &mut self.state, quantity, &self.src)?;
            }
            Err(e) => return Err(e),
        }

        self.tree.collect_totals(&mut self.state);
        let mut plan = Plan::new();
        self.tree.extract_plan(&mut plan);

        let summary = JobSummary {
            simulated: self.tree.is_simulating(),
            missing: std::mem::take(&mut self.state.missing),
            cost: self.state.cost,
            tasks: std::mem::take(&mut self.state.tasks),
            plan,
        };
        tracing::info!(
            target = ?self.target.key,
            quantity,
            simulated = summary.simulated,
            cost = summary.cost,
            missing_kinds = summary.missing.kinds(),
            tasks = summary.tasks.len(),
            "crafting job calculated"
        );
        Ok(self.summary.insert(summary))
    }

    /// Move the calculated reservations out of `stock` and into `sink`.
    ///
    /// All-or-nothing: on a stale plan neither `stock` nor `sink` is touched
    /// and the job must be recalculated.
    pub fn submit(
        &mut self,
        stock: &mut dyn InventoryView,
        sink: &mut dyn ReservationSink,
    ) -> Result<(), JobError> {
        let summary = self.summary.as_ref().ok_or(JobError::NotCalculated)?;
        if summary.simulated {
            return Err(JobError::Incomplete {
                missing: summary.missing.clone(),
            });
        }

        let mut staged = Reservation::new();
        let mut nested = NestedView::new(stock);
        self.tree
            .commit_reservations(&mut nested, &mut staged, &mut self.state, &self.src)?;
        if !nested.commit(&self.src) {
            return Err(CraftError::branch(self.target.key, self.target.quantity).into());
        }

        for stack in staged.storage.iter() {
            sink.add_storage(stack);
        }
        for stack in staged.emitted.iter() {
            sink.add_emitted(stack);
        }
        for &(recipe, runs) in &staged.crafting {
            sink.add_crafting(recipe, runs);
        }
        tracing::info!(
            target = ?self.target.key,
            stored = staged.storage.total(),
            emitted = staged.emitted.total(),
            recipes = staged.crafting.len(),
            "crafting job submitted"
        );
        Ok(())
    }
}
