//! Installers for shared packages and the router in front of them.

mod router;
mod shared;

pub use router::InstallRouter;
#[cfg(test)]
pub use shared::MockSharedOperations;
pub use shared::{
    ConfirmPolicy, SharedInstaller, SharedOperations, UninstallOutcome, UpdateOutcome,
};
