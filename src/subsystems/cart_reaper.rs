use std::time::Duration;

use async_trait::async_trait;
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{error, info};

use crate::{AppState, domain::cart::purge_abandoned_carts};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically sweeps session carts that have been idle past the retention TTL.
pub struct CartReaper {
    state: AppState,
}

impl CartReaper {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn start(&self) {
        let period = self.state.settings.retention.sweep_interval().max(MIN_SWEEP_INTERVAL);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(err) = purge_abandoned_carts(
                self.state.services.carts.as_ref(),
                self.state.sessions.as_ref(),
                &self.state.settings.retention,
            )
            .await
            {
                error!("CartReaper: purging abandoned carts failed with {err}");
            }
        }
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for CartReaper {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        info!(
            "Cart reaper starting. Sweeping every {:?}.",
            self.state.settings.retention.sweep_interval()
        );
        select!(
            _ = self.start() => {
                error!("Cart reaper stopped.");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Cart reaper shutdown.");
            }
        );
        Ok(())
    }
}
