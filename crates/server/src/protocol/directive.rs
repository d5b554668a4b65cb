//! Rollback and no-update directives.

use crate::error::{ApiError, ApiResult};
use updraft_core::{Directive, ProtocolVersion};
use updraft_storage::{BundleStore, ResolvedBundle, StorageError};

/// Fail with [`ApiError::UnsupportedOperation`] when `protocol` has no directive vocabulary.
pub fn require_directives(protocol: ProtocolVersion, what: &str) -> ApiResult<()> {
    if protocol.supports_directives() {
        Ok(())
    } else {
        Err(ApiError::UnsupportedOperation(format!(
            "{what} not supported on protocol version {protocol}"
        )))
    }
}

/// Build the directive telling the client it already runs the newest content.
pub fn no_update_available(protocol: ProtocolVersion) -> ApiResult<Directive> {
    require_directives(protocol, "NoUpdateAvailable directive")?;
    Ok(Directive::NoUpdateAvailable)
}

/// Build the rollback directive for a bundle carrying the rollback marker.
pub async fn roll_back_to_embedded(
    store: &BundleStore,
    bundle: &ResolvedBundle,
    protocol: ProtocolVersion,
) -> ApiResult<Directive> {
    require_directives(protocol, "Rollbacks")?;

    let commit_time = store
        .rollback_committed_at(bundle)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::NotFound(format!(
                "no rollback marker in {}",
                bundle.directory()
            )),
            other => other.into(),
        })?;
    Ok(Directive::roll_back_to_embedded(commit_time))
}
