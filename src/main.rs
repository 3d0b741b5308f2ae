use anyhow::Context;
use clap::Parser;
use storefront_cart::{
    configure_tracing, construct_app_state,
    infra::{Cli, get_config_settings},
    purge_abandoned, start_server,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = get_config_settings().context("Could not read application configuration.")?;

    // _worker_guard is pulled back into the scope of main() to ensure all tracing events get
    // written to the log file when the program terminates, which is done when _worker_guard is
    // dropped.
    let _worker_guard = configure_tracing(&settings);

    let app_state = construct_app_state(settings).await?;

    if cli.purge_abandoned_carts {
        let report = purge_abandoned(&app_state).await?;
        info!("Startup purge removed {} cart(s) and {} session(s).", report.carts, report.sessions);
    }

    start_server(app_state).await
}
