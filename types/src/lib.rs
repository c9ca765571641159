//! Shared types for the sideload subsystem.
//!
//! The envelope types define the wire interface between the sandboxed
//! interpreter and its host process; [`CodeBundle`] models the document the
//! bundle endpoint serves.

pub mod bundle;
pub mod envelope;

pub use bundle::{BundleDocument, CodeBundle};
pub use envelope::{InboundMessage, OutboundEnvelope, RequestId, RequestKind};
