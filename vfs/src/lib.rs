//! Virtual package filesystem.
//!
//! [`SearchPath`] is the append-only list of directories the embedded
//! interpreter's module loader consults; [`Installer`] materializes
//! delivered bundles beneath the virtual root and keeps that root
//! registered on the search path.

mod install;
mod search_path;

pub use install::{DEFAULT_VIRTUAL_ROOT, InstallError, Installer};
pub use search_path::SearchPath;
