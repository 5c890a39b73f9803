//! Procura Core -- a recursive crafting and procurement resolver.
//!
//! Given a request for some quantity of an item and a catalog of recipes,
//! the resolver decides whether the request can be met from stock plus
//! recursively crafted intermediates, reserves exactly what is needed, and
//! records a plan of what is taken, crafted, emitted and missing.
//!
//! # Resolution Lifecycle
//!
//! A [`job::CraftingJob`] drives one top-level request:
//!
//! 1. **Build** -- the whole [`tree::CraftingTree`] is built eagerly, down to
//!    every leaf the cycle test allows.
//! 2. **Real pass** -- the tree is resolved against a scratch copy of stock.
//! 3. **Simulation pass** -- if the real pass fails, the tree is reset with
//!    [`tree::CraftingTree::set_simulate`] and resolved again, projecting
//!    every shortfall as missing.
//! 4. **Totals and plan** -- missing items, crafting tasks and cost are
//!    collected and the tree is flattened into a [`plan::Plan`].
//! 5. **Submit** -- logged stock is re-extracted from the real inventory into
//!    a [`plan::ReservationSink`], all-or-nothing.
//!
//! ```rust,ignore
//! let mut job = CraftingJob::new(&catalog, ItemStack::new(gear, 3), JobOptions::default());
//! let summary = job.calculate(&stock)?;
//! if summary.is_complete() {
//!     job.submit(&mut stock, &mut reservation)?;
//! }
//! ```
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable recipe catalog (frozen after build).
//! - [`catalog::RecipeCatalog`] -- The lookup seam the tree is built from.
//! - [`inventory::InventoryView`] -- Extraction interface, with
//!   [`inventory::NestedView`] for provisional, committable overlays.
//! - [`tree::CraftingTree`] -- Arena of demand and recipe nodes.
//! - [`context::ResolutionContext`] -- Orchestrator services used during a pass.
//! - [`ledger::UsageLedger`] -- Append-only record of stock taken and refunded.
//! - [`error::CraftError`] -- Branch failures, stale plans and cancellation.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod id;
pub mod inventory;
pub mod item;
pub mod job;
pub mod ledger;
pub mod plan;
pub mod resolve;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
