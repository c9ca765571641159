//! Sandbox-side host channel: request correlation, inbound routing, and the
//! token exchange.
//!
//! The sandboxed interpreter cannot reach the network or host services
//! directly; everything it needs from outside arrives over a single message
//! channel. [`MessageGateway`] owns the outbound half of that channel and the
//! pending-request bookkeeping that matches host replies back to their
//! originating requests.

mod correlator;
mod gateway;
mod token;

pub use gateway::{GatewayConfig, GatewayError, MessageGateway};
pub use token::acquire_token;
