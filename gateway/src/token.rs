//! One-shot bearer-token exchange with the host.

use sideload_types::RequestKind;

use crate::{GatewayError, MessageGateway};

/// Ask the host for a bearer token.
///
/// Sends one `auth_token_request` and awaits its single reply. `Ok(None)`
/// means the host declined (the reply's `value` was absent, non-string, or
/// empty), which callers treat as "stop quietly" rather than an error. The
/// pending slot is released on every exit path, success or failure.
///
/// The returned token is trusted opaquely; signature and expiry validation
/// are the host's responsibility.
pub async fn acquire_token(gateway: &MessageGateway) -> Result<Option<String>, GatewayError> {
    let reply = gateway.request(RequestKind::AuthTokenRequest).await?;
    let token = reply
        .value_str()
        .filter(|value| !value.is_empty())
        .map(str::to_owned);
    if token.is_none() {
        tracing::debug!("host declined to issue a token");
    }
    Ok(token)
}
