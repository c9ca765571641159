//! The patch applier.

use std::sync::Arc;

use sideload_delivery::{BundleFetcher, FetchError};
use sideload_gateway::{GatewayError, MessageGateway, acquire_token};
use sideload_vfs::{DEFAULT_VIRTUAL_ROOT, InstallError, Installer, SearchPath};

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Install(#[from] InstallError),
}

/// What a patch run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The bundle was fetched and `files` were installed.
    Applied { files: usize },
    /// The virtual root was already on the search path; no token was
    /// requested and nothing was fetched.
    AlreadyApplied,
    /// The host declined to issue a token; nothing was fetched or
    /// installed and the virtual root was left untouched.
    Declined,
}

/// Composes the gateway, fetcher, and installer into the patch sequence.
///
/// The run-once guard is the search path itself: once the virtual root is
/// registered, later runs short-circuit without touching the host or the
/// network. There is no explicit status flag and no transition back.
pub struct Patcher {
    gateway: Arc<MessageGateway>,
    fetcher: BundleFetcher,
    installer: Installer,
}

impl Patcher {
    pub fn new(
        gateway: Arc<MessageGateway>,
        fetcher: BundleFetcher,
        installer: Installer,
    ) -> Self {
        Self {
            gateway,
            fetcher,
            installer,
        }
    }

    /// Patcher wired to the canonical endpoint and virtual root, sharing
    /// `search_path` with the interpreter binding.
    #[must_use]
    pub fn with_defaults(gateway: Arc<MessageGateway>, search_path: SearchPath) -> Self {
        Self::new(
            gateway,
            BundleFetcher::new(),
            Installer::new(DEFAULT_VIRTUAL_ROOT, search_path),
        )
    }

    /// Run the patch sequence: token, fetch, ensure root, install.
    ///
    /// An empty or missing token stops the run before any network access.
    /// Fetch and install failures propagate; nothing is retried.
    pub async fn apply(&self) -> Result<PatchOutcome, PatchError> {
        if self
            .installer
            .search_path()
            .contains(self.installer.root())
        {
            tracing::debug!("virtual root already registered; skipping patch");
            return Ok(PatchOutcome::AlreadyApplied);
        }

        let Some(token) = acquire_token(&self.gateway).await? else {
            return Ok(PatchOutcome::Declined);
        };

        let bundle = self.fetcher.fetch(&token).await?;
        self.installer.ensure_root()?;
        let files = self.installer.install(&bundle)?;
        tracing::info!("patch applied: {files} files installed");
        Ok(PatchOutcome::Applied { files })
    }
}
