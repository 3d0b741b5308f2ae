//! Retention policy for guest carts nobody came back for.

use jiff::Timestamp;
use tracing::info;

use crate::{
    domain::stores::{CartStore, SessionStore, StoreError},
    infra::RetentionSettings,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub carts: u64,
    pub sessions: u64,
}

/// Deletes session carts untouched for longer than the configured TTL, along with expired
/// session bindings. User carts are never purged.
#[tracing::instrument(skip_all)]
pub async fn purge_abandoned_carts(
    carts: &dyn CartStore,
    sessions: &dyn SessionStore,
    retention: &RetentionSettings,
) -> Result<PurgeReport, StoreError> {
    let idle_since = Timestamp::now() - retention.session_cart_ttl();
    let report = PurgeReport {
        carts: carts.purge_abandoned_session_carts(idle_since).await?,
        sessions: sessions.purge_expired().await?,
    };
    info!(
        "Purged {} abandoned cart(s) and {} expired session(s) idle since {idle_since}.",
        report.carts, report.sessions
    );
    Ok(report)
}
