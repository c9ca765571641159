//! Patch orchestration: the run-once sequence that turns a host-issued
//! token into an importable package tree.

mod patcher;

pub use patcher::{PatchError, PatchOutcome, Patcher};
