//! The crafting tree: demands for items and the recipe applications that can
//! satisfy them, built once per top-level request.
//!
//! Nodes live in two arenas keyed by [`DemandId`] and [`RecipeNodeId`]. A
//! demand owns its recipe children and a recipe node owns its input demands;
//! parent links are plain keys used only for the cycle test and substitute
//! lookups.
//!
//! Resolution itself (`request`) lives in [`crate::resolve`]. This module
//! holds construction and the whole-tree passes run around it:
//!
//! - [`CraftingTree::set_simulate`] -- reset per-pass state for a dry run.
//! - [`CraftingTree::collect_totals`] -- report missing items, tasks and cost.
//! - [`CraftingTree::commit_reservations`] -- re-extract logged stock into a sink.
//! - [`CraftingTree::extract_plan`] -- flatten the tree into a [`Plan`].

use crate::catalog::{RecipeCatalog, RecipeDetails};
use crate::config::ResolverConfig;
use crate::context::ResolutionContext;
use crate::error::CraftError;
use crate::id::{DemandId, RecipeNodeId};
use crate::inventory::{ActionSource, Actionable, InventoryView};
use crate::item::{ItemKey, ItemStack};
use crate::ledger::UsageLedger;
use crate::plan::{Plan, ReservationSink};
use slotmap::SlotMap;
use std::sync::Arc;

/// Wanting a quantity of one item at one position in the tree.
#[derive(Debug, Clone)]
pub struct DemandNode {
    pub(crate) item: ItemKey,
    /// Input slot in the parent recipe, if the recipe is slot-addressed.
    pub(crate) slot: Option<usize>,
    pub(crate) parent: Option<RecipeNodeId>,
    pub(crate) children: Vec<RecipeNodeId>,
    pub(crate) can_emit: bool,
    pub(crate) used: UsageLedger,
    pub(crate) emitted: u64,
    pub(crate) missing: u64,
    pub(crate) cost: u64,
    pub(crate) exhausted: bool,
    pub(crate) simulate: bool,
    pub(crate) depth: usize,
}

impl DemandNode {
    fn new(item: ItemKey, slot: Option<usize>, parent: Option<RecipeNodeId>, depth: usize) -> Self {
        Self {
            item,
            slot,
            parent,
            children: Vec::new(),
            can_emit: false,
            used: UsageLedger::new(),
            emitted: 0,
            missing: 0,
            cost: 0,
            exhausted: false,
            simulate: false,
            depth,
        }
    }

    pub fn item(&self) -> ItemKey {
        self.item
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn parent(&self) -> Option<RecipeNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[RecipeNodeId] {
        &self.children
    }

    pub fn can_emit(&self) -> bool {
        self.can_emit
    }

    pub fn used(&self) -> &UsageLedger {
        &self.used
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn reset(&mut self, simulate: bool) {
        self.used.reset();
        self.emitted = 0;
        self.missing = 0;
        self.cost = 0;
        self.exhausted = false;
        self.simulate = simulate;
    }
}

/// One input of a recipe node: the demand and its per-run quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeInput {
    pub demand: DemandId,
    pub per_run: u64,
}

/// One application of a recipe.
#[derive(Debug, Clone)]
pub struct RecipeNode {
    pub(crate) details: Arc<RecipeDetails>,
    pub(crate) parent: DemandId,
    pub(crate) inputs: Vec<RecipeInput>,
    pub(crate) viable: bool,
    pub(crate) crafts: u64,
    pub(crate) depth: usize,
}

impl RecipeNode {
    pub fn details(&self) -> &RecipeDetails {
        &self.details
    }

    pub fn parent(&self) -> DemandId {
        self.parent
    }

    pub fn inputs(&self) -> &[RecipeInput] {
        &self.inputs
    }

    pub fn is_viable(&self) -> bool {
        self.viable
    }

    /// Runs planned during the current pass.
    pub fn crafts(&self) -> u64 {
        self.crafts
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs needed to cover `remaining` units at `per_run` units per run.
    pub fn runs_for(remaining: u64, per_run: u64) -> u64 {
        if per_run == 0 {
            0
        } else {
            remaining.div_ceil(per_run)
        }
    }
}

/// Everything a pass did that a failed probe must be able to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JournalEntry {
    Used { demand: DemandId, stack: ItemStack },
    Refunded { demand: DemandId, stack: ItemStack },
    Emitted { demand: DemandId, quantity: u64 },
    Exhausted { demand: DemandId },
    Crafted { node: RecipeNodeId, runs: u64 },
}

#[derive(Debug, Clone)]
pub struct CraftingTree {
    pub(crate) demands: SlotMap<DemandId, DemandNode>,
    pub(crate) recipes: SlotMap<RecipeNodeId, RecipeNode>,
    pub(crate) root: DemandId,
    pub(crate) target: ItemStack,
    pub(crate) config: ResolverConfig,
    pub(crate) journal: Vec<JournalEntry>,
}

impl CraftingTree {
    /// Build the full tree for `target`, eagerly, down to every leaf the
    /// cycle test allows.
    pub fn build(catalog: &dyn RecipeCatalog, target: ItemStack, config: ResolverConfig) -> Self {
        let mut tree = Self {
            demands: SlotMap::with_key(),
            recipes: SlotMap::with_key(),
            root: DemandId::default(),
            target,
            config,
            journal: Vec::new(),
        };
        tree.root = tree.build_demand(catalog, target.key, None, None, 0);
        tracing::debug!(
            target = ?target.key,
            demands = tree.demands.len(),
            recipes = tree.recipes.len(),
            "built crafting tree"
        );
        tree
    }

    fn build_demand(
        &mut self,
        catalog: &dyn RecipeCatalog,
        item: ItemKey,
        parent: Option<RecipeNodeId>,
        slot: Option<usize>,
        depth: usize,
    ) -> DemandId {
        let id = self.demands.insert(DemandNode::new(item, slot, parent, depth));

        // An emittable item is never crafted.
        if catalog.can_emit(item) {
            self.demands[id].can_emit = true;
            return id;
        }

        let parent_details = parent.map(|p| Arc::clone(&self.recipes[p].details));
        for details in catalog.recipes_for(item, parent_details.as_deref(), slot) {
            let acyclic = parent.is_none_or(|p| self.not_recursive(self.recipes[p].parent, &details));
            if acyclic {
                let child = self.build_recipe_node(catalog, details, id, depth + 1);
                self.demands[id].children.push(child);
            }
        }
        id
    }

    fn build_recipe_node(
        &mut self,
        catalog: &dyn RecipeCatalog,
        details: Arc<RecipeDetails>,
        parent: DemandId,
        depth: usize,
    ) -> RecipeNodeId {
        let layout: Vec<(ItemStack, Option<usize>)> = if details.craftable && details.can_substitute {
            details
                .inputs
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.stack.quantity > 0)
                .map(|(i, slot)| (slot.stack, Some(i)))
                .collect()
        } else if details.craftable {
            details
                .condensed_inputs()
                .into_iter()
                .map(|stack| (stack, details.first_slot_of(stack.key)))
                .collect()
        } else {
            details
                .condensed_inputs()
                .into_iter()
                .map(|stack| (stack, None))
                .collect()
        };

        let id = self.recipes.insert(RecipeNode {
            details,
            parent,
            inputs: Vec::with_capacity(layout.len()),
            viable: true,
            crafts: 0,
            depth,
        });

        for (stack, slot) in layout {
            let demand = self.build_demand(catalog, stack.key, Some(id), slot, depth + 1);
            self.recipes[id].inputs.push(RecipeInput {
                demand,
                per_run: stack.quantity,
            });
        }
        id
    }

    /// Whether `details` avoids every item demanded from `start` up to the root.
    pub(crate) fn not_recursive(&self, start: DemandId, details: &RecipeDetails) -> bool {
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let node = &self.demands[id];
            if details.mentions(node.item) {
                return false;
            }
            cursor = node.parent.map(|p| self.recipes[p].parent);
        }
        true
    }

    // -- Accessors --

    pub fn root(&self) -> DemandId {
        self.root
    }

    pub fn target(&self) -> ItemStack {
        self.target
    }

    pub fn demand(&self, id: DemandId) -> Option<&DemandNode> {
        self.demands.get(id)
    }

    pub fn recipe_node(&self, id: RecipeNodeId) -> Option<&RecipeNode> {
        self.recipes.get(id)
    }

    pub fn demand_count(&self) -> usize {
        self.demands.len()
    }

    pub fn recipe_node_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_simulating(&self) -> bool {
        self.demands[self.root].simulate
    }

    /// Net units taken from stock across the whole tree.
    pub fn total_used(&self) -> i128 {
        self.demands.values().map(|d| d.used.net_quantity()).sum()
    }

    /// Units emitted across the whole tree.
    pub fn total_emitted(&self) -> u64 {
        self.demands.values().fold(0u64, |acc, d| acc.saturating_add(d.emitted))
    }

    /// Units reported missing across the whole tree.
    pub fn total_missing(&self) -> u64 {
        self.demands.values().fold(0u64, |acc, d| acc.saturating_add(d.missing))
    }

    // -- Pass management --

    /// Reset every per-pass field and switch the tree into simulation mode.
    pub fn set_simulate(&mut self) {
        self.reset_pass(true);
    }

    /// Reset every per-pass field for a real (reserving) pass.
    pub fn reset(&mut self) {
        self.reset_pass(false);
    }

    fn reset_pass(&mut self, simulate: bool) {
        for node in self.demands.values_mut() {
            node.reset(simulate);
        }
        for node in self.recipes.values_mut() {
            node.crafts = 0;
            node.viable = true;
        }
        self.journal.clear();
    }

    /// Undo everything journaled since `mark`: logged stock goes back to the
    /// context's pool, emission and craft counts are reverted.
    pub(crate) fn rollback_to(&mut self, mark: usize, ctx: &mut dyn ResolutionContext) {
        if mark >= self.journal.len() {
            return;
        }
        let undone: Vec<JournalEntry> = self.journal.drain(mark..).collect();

        let mut net: Vec<(DemandId, ItemKey, i128)> = Vec::new();
        let mut bump = |demand: DemandId, key: ItemKey, delta: i128| {
            match net.iter_mut().find(|(d, k, _)| *d == demand && *k == key) {
                Some(entry) => entry.2 += delta,
                None => net.push((demand, key, delta)),
            }
        };

        for entry in undone.iter().rev() {
            match *entry {
                JournalEntry::Used { demand, stack } => {
                    bump(demand, stack.key, i128::from(stack.quantity));
                }
                JournalEntry::Refunded { demand, stack } => {
                    bump(demand, stack.key, -i128::from(stack.quantity));
                }
                JournalEntry::Emitted { demand, quantity } => {
                    let node = &mut self.demands[demand];
                    node.emitted = node.emitted.saturating_sub(quantity);
                }
                JournalEntry::Exhausted { demand } => {
                    self.demands[demand].exhausted = false;
                }
                JournalEntry::Crafted { node, runs } => {
                    let node = &mut self.recipes[node];
                    node.crafts = node.crafts.saturating_sub(runs);
                }
            }
        }

        for (demand, key, quantity) in net {
            if quantity > 0 {
                let stack = ItemStack::new(key, u64::try_from(quantity).unwrap_or(u64::MAX));
                self.demands[demand].used.refund(stack);
                ctx.refund(stack);
            }
        }
    }

    // -- Whole-tree passes --

    /// Report missing items, crafting tasks and cost units to `ctx`.
    pub fn collect_totals(&self, ctx: &mut dyn ResolutionContext) {
        self.collect_demand_totals(self.root, ctx);
    }

    fn collect_demand_totals(&self, id: DemandId, ctx: &mut dyn ResolutionContext) {
        let node = &self.demands[id];
        if node.missing > 0 {
            ctx.record_missing(ItemStack::new(node.item, node.missing));
        }
        ctx.record_cost(self.config.node_overhead.saturating_add(node.cost));
        for &child in &node.children {
            self.collect_recipe_totals(child, ctx);
        }
    }

    fn collect_recipe_totals(&self, id: RecipeNodeId, ctx: &mut dyn ResolutionContext) {
        let node = &self.recipes[id];
        if node.crafts > 0 {
            ctx.record_task(&node.details, node.crafts, node.depth);
        }
        for input in &node.inputs {
            self.collect_demand_totals(input.demand, ctx);
        }
        ctx.record_cost(self.config.task_overhead.saturating_add(node.crafts));
    }

    /// Re-extract every logged stock unit from `inv` into `sink`.
    ///
    /// Fails with [`CraftError::StalePlan`] as soon as `inv` cannot supply
    /// exactly what was logged. Callers wanting all-or-nothing semantics pass
    /// a [`crate::inventory::NestedView`] and commit it only on success.
    pub fn commit_reservations(
        &self,
        inv: &mut dyn InventoryView,
        sink: &mut dyn ReservationSink,
        ctx: &mut dyn ResolutionContext,
        src: &ActionSource,
    ) -> Result<(), CraftError> {
        self.commit_demand(self.root, inv, sink, ctx, src)
    }

    fn commit_demand(
        &self,
        id: DemandId,
        inv: &mut dyn InventoryView,
        sink: &mut dyn ReservationSink,
        ctx: &mut dyn ResolutionContext,
        src: &ActionSource,
    ) -> Result<(), CraftError> {
        ctx.check_pause_or_cancel()?;
        let node = &self.demands[id];

        for stack in node.used.net_stacks() {
            let extracted = inv
                .extract(&stack, Actionable::Modulate, src)
                .map_or(0, |s| s.quantity);
            if extracted != stack.quantity {
                tracing::warn!(
                    item = ?stack.key,
                    expected = stack.quantity,
                    extracted,
                    "stock changed since the plan was made"
                );
                return Err(CraftError::StalePlan {
                    item: stack.key,
                    expected: stack.quantity,
                    extracted,
                });
            }
            sink.add_storage(stack);
        }

        if node.emitted > 0 {
            sink.add_emitted(ItemStack::new(node.item, node.emitted));
        }

        for &child in &node.children {
            let recipe = &self.recipes[child];
            if recipe.crafts > 0 {
                sink.add_crafting(recipe.details.id, recipe.crafts);
            }
            for input in &recipe.inputs {
                self.commit_demand(input.demand, inv, sink, ctx, src)?;
            }
        }
        Ok(())
    }

    /// Append this tree's plan to `plan` without changing any state.
    pub fn extract_plan(&self, plan: &mut Plan) {
        self.plan_demand(self.root, plan);
    }

    fn plan_demand(&self, id: DemandId, plan: &mut Plan) {
        let node = &self.demands[id];
        if node.missing > 0 {
            plan.add_missing(ItemStack::new(node.item, node.missing));
        }
        if node.emitted > 0 {
            plan.add_to_emit(ItemStack::new(node.item, node.emitted));
        }
        for stack in node.used.net_stacks() {
            plan.add_from_stock(stack);
        }
        for &child in &node.children {
            let recipe = &self.recipes[child];
            if recipe.crafts > 0 {
                for output in recipe.details.condensed_outputs() {
                    plan.add_to_craft(output.with_quantity(output.quantity.saturating_mul(recipe.crafts)));
                }
            }
            for input in &recipe.inputs {
                self.plan_demand(input.demand, plan);
            }
        }
    }
}
