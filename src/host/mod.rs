//! Host-side install primitives: the project's local record, executable
//! links and the default (non-shared) installer.

mod binaries;
mod installer;
mod repository;

pub use binaries::BinaryInstaller;
#[cfg(test)]
pub use installer::MockInstaller;
pub use installer::{Installer, LibraryInstaller};
pub use repository::{InstalledRepository, RECORD_DIR, RECORD_FILE};
