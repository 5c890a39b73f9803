//! Depth-first resolution of a crafting tree against an inventory view.
//!
//! A demand is satisfied, in order, from stock (with per-slot substitutes for
//! craftable recipes), from emission, from its only recipe, or by probing its
//! recipes one run at a time inside nested views. Whatever is still short is
//! projected as missing in simulation mode and is a
//! [`CraftError::BranchFailure`] otherwise.

use crate::context::ResolutionContext;
use crate::error::CraftError;
use crate::id::{DemandId, RecipeNodeId};
use crate::inventory::{ActionSource, Actionable, InventoryView, NestedView};
use crate::item::{ItemKey, ItemStack};
use crate::tree::{CraftingTree, JournalEntry, RecipeNode};

impl CraftingTree {
    /// Resolve `quantity` units of the tree's target against `inv`.
    pub fn request(
        &mut self,
        inv: &mut dyn InventoryView,
        ctx: &mut dyn ResolutionContext,
        quantity: u64,
        src: &ActionSource,
    ) -> Result<ItemStack, CraftError> {
        self.request_demand(self.root, inv, ctx, quantity, src)
    }

    pub(crate) fn request_demand(
        &mut self,
        id: DemandId,
        inv: &mut dyn InventoryView,
        ctx: &mut dyn ResolutionContext,
        requested: u64,
        src: &ActionSource,
    ) -> Result<ItemStack, CraftError> {
        ctx.check_pause_or_cancel()?;

        let item = self.demands[id].item;
        let satisfied = ItemStack::new(item, requested);
        if requested == 0 {
            return Ok(satisfied);
        }
        let mut remaining = requested;
        let mut things_used: Vec<ItemStack> = Vec::new();

        for candidate in self.extraction_candidates(id, &*inv) {
            let request = ItemStack::new(candidate, remaining);
            let Some(available) = inv.extract(&request, Actionable::Modulate, src) else {
                continue;
            };

            let node = &mut self.demands[id];
            if !node.exhausted
                && let Some(claimed) = ctx.check_use(available)
            {
                node.used.take(claimed);
                things_used.push(claimed);
                self.journal.push(JournalEntry::Used {
                    demand: id,
                    stack: claimed,
                });
            }
            node.cost = node.cost.saturating_add(available.quantity);
            remaining -= available.quantity;

            if remaining == 0 {
                return Ok(satisfied);
            }
        }

        let node = &mut self.demands[id];
        if node.can_emit {
            node.emitted = node.emitted.saturating_add(remaining);
            node.cost = node.cost.saturating_add(remaining);
            self.journal.push(JournalEntry::Emitted {
                demand: id,
                quantity: remaining,
            });
            return Ok(satisfied);
        }

        if !node.exhausted {
            node.exhausted = true;
            self.journal.push(JournalEntry::Exhausted { demand: id });
        }

        let children = node.children.clone();
        match children.as_slice() {
            [] => {}
            [only] => self.expand_single(id, *only, inv, ctx, &mut remaining, src)?,
            _ => self.expand_alternatives(id, &children, inv, ctx, &mut remaining, src)?,
        }

        if remaining == 0 {
            return Ok(satisfied);
        }

        let node = &mut self.demands[id];
        if node.simulate {
            node.missing = node.missing.saturating_add(remaining);
            node.cost = node.cost.saturating_add(remaining);
            return Ok(satisfied);
        }

        for stack in things_used {
            ctx.refund(stack);
            node.used.refund(stack);
            self.journal.push(JournalEntry::Refunded { demand: id, stack });
        }
        Err(CraftError::branch(item, remaining))
    }

    /// Items this demand may pull from stock, in the order to try them.
    fn extraction_candidates(&self, id: DemandId, inv: &dyn InventoryView) -> Vec<ItemKey> {
        let node = &self.demands[id];
        let (Some(slot), Some(parent)) = (node.slot, node.parent) else {
            return vec![node.item];
        };
        let details = &self.recipes[parent].details;
        if !details.craftable {
            return vec![node.item];
        }

        let contents = inv.contents();
        let found: Vec<ItemStack> = if details.can_substitute {
            details
                .substitute_inputs(slot)
                .into_iter()
                .flat_map(|key| contents.find_fuzzy(key))
                .collect()
        } else {
            contents.find_precise(node.item).into_iter().collect()
        };

        let mut keys: Vec<ItemKey> = Vec::with_capacity(found.len());
        for stack in found {
            if !keys.contains(&stack.key) && details.is_valid_item_for_slot(slot, stack.key) {
                keys.push(stack.key);
            }
        }
        keys
    }

    /// Only one recipe can make this item: run it as often as needed.
    /// A failure here has no alternative and propagates unchanged.
    fn expand_single(
        &mut self,
        id: DemandId,
        child: RecipeNodeId,
        inv: &mut dyn InventoryView,
        ctx: &mut dyn ResolutionContext,
        remaining: &mut u64,
        src: &ActionSource,
    ) -> Result<(), CraftError> {
        let item = self.demands[id].item;

        while self.recipes[child].viable && *remaining > 0 {
            let per_run = self.recipes[child].details.amount_crafted(item);
            let runs = RecipeNode::runs_for(*remaining, per_run);
            if runs == 0 {
                self.recipes[child].viable = false;
                break;
            }

            self.request_recipe(child, inv, ctx, runs, src)?;

            match inv.extract(&ItemStack::new(item, *remaining), Actionable::Modulate, src) {
                Some(got) => {
                    self.demands[id].cost = self.demands[id].cost.saturating_add(got.quantity);
                    *remaining -= got.quantity;
                }
                None => self.recipes[child].viable = false,
            }
        }
        Ok(())
    }

    /// Several recipes can make this item: probe them in catalog order, one
    /// run at a time, each run inside a nested view that is committed only
    /// when the run produced something usable.
    fn expand_alternatives(
        &mut self,
        id: DemandId,
        children: &[RecipeNodeId],
        inv: &mut dyn InventoryView,
        ctx: &mut dyn ResolutionContext,
        remaining: &mut u64,
        src: &ActionSource,
    ) -> Result<(), CraftError> {
        let item = self.demands[id].item;

        for &child in children {
            while self.recipes[child].viable && *remaining > 0 {
                let mark = self.journal.len();
                let mut nested = NestedView::new(&mut *inv);

                match self.request_recipe(child, &mut nested, ctx, 1, src) {
                    Ok(()) => {}
                    Err(CraftError::BranchFailure { item: failed, shortfall }) => {
                        drop(nested);
                        self.rollback_to(mark, ctx);
                        // Stock may change before a later pass; keep it eligible.
                        self.recipes[child].viable = true;
                        tracing::debug!(
                            recipe = %self.recipes[child].details.name,
                            ?failed,
                            shortfall,
                            "recipe alternative failed"
                        );
                        break;
                    }
                    Err(e) => return Err(e),
                }

                match nested.extract(&ItemStack::new(item, *remaining), Actionable::Modulate, src) {
                    Some(got) => {
                        if !nested.commit(src) {
                            return Err(CraftError::branch(item, *remaining));
                        }
                        self.demands[id].cost = self.demands[id].cost.saturating_add(got.quantity);
                        *remaining -= got.quantity;
                    }
                    None => {
                        drop(nested);
                        self.rollback_to(mark, ctx);
                        self.recipes[child].viable = false;
                    }
                }
            }

            if *remaining == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Request every input of `id` for `runs` runs, in slot order, then make
    /// the outputs available in `inv`. The first failing input aborts.
    pub(crate) fn request_recipe(
        &mut self,
        id: RecipeNodeId,
        inv: &mut dyn InventoryView,
        ctx: &mut dyn ResolutionContext,
        runs: u64,
        src: &ActionSource,
    ) -> Result<(), CraftError> {
        ctx.check_pause_or_cancel()?;

        let inputs = self.recipes[id].inputs.clone();
        for input in inputs {
            self.request_demand(input.demand, inv, ctx, input.per_run.saturating_mul(runs), src)?;
        }

        let node = &mut self.recipes[id];
        for output in node.details.condensed_outputs() {
            inv.inject(&output.with_quantity(output.quantity.saturating_mul(runs)), src);
        }
        node.crafts = node.crafts.saturating_add(runs);
        self.journal.push(JournalEntry::Crafted { node: id, runs });
        Ok(())
    }
}
