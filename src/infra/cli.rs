use clap::Parser;

/// Storefront cart server.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Purge abandoned guest carts and expired sessions before the server starts.
    #[arg(long)]
    pub purge_abandoned_carts: bool,
}
