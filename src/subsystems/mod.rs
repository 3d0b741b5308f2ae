mod cart_reaper;
mod web_server;

pub use cart_reaper::CartReaper;
pub use web_server::{WebServer, build_router};
