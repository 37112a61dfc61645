//! Memory budgeting and accounting for Lingua's swappable model resources and caches.
//!
//! The [`BudgetLedger`] is pure bookkeeping: it never allocates or frees anything itself.
//! - Resource loads are admitted through [`BudgetLedger::reserve_resource`], which holds the
//!   footprint as *pending* until the load commits.
//! - Cache usage is charged and released by the cache as entries come and go.
//! - Components holding reclaimable memory register a [`MemoryReclaimer`] so a load that does
//!   not fit can ask them to shed memory before being rejected.

mod budget;
mod ledger;
mod pressure;
mod reclaim;
mod report;

pub use budget::{parse_byte_size, MemoryBudget, MemoryBudgetOverrides, ParseByteSizeError, GB, KB, MB};
pub use ledger::{BudgetLedger, LedgerError, ReclaimerRegistration, ResourceReservation};
pub use pressure::{MemoryPressure, MemoryPressureThresholds};
pub use reclaim::{MemoryReclaimer, ReclaimRequest, ReclaimResult};
pub use report::MemoryReport;
