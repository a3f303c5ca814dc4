mod auth;
mod middleware;
mod routes;
mod server;
mod state;

pub use routes::TransferRequest;
pub use server::{router, GatewayServer};
pub use state::AppState;
