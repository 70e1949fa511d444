//! The shared store: path rules, symlink primitives, the usage ledger and
//! the resources built on them.

pub mod ledger;
pub mod paths;
pub mod slot;
pub mod symlink;

pub use ledger::{
    JsonUsageLedger, LastReference, LedgerDocument, StoreLedgers, UsageLedger, UsageRecord,
    last_reference,
};
pub use paths::{LinkTarget, PathResolver};
pub use slot::{SourceSlot, VendorLink};
pub use symlink::SymlinkStore;
