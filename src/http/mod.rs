//! Connection acceptor
//!
//! Serves the single transport-upgrade endpoint:
//! - GET /realtime - WebSocket upgrade, one relay session per connection
//! - GET /health - Health check
//!
//! Any other path is rejected by the router; no request bodies are parsed
//! and no client authentication is performed here.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
