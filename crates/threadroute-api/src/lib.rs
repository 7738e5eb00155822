// threadroute-api: Async client for the UniFi router static-route endpoints.
//
// Wraps the controller's legacy `rest/routing` surface: session login,
// CSRF handling, and CRUD over static routes. Everything above the wire
// (route semantics, grace periods, discovery) lives in `threadroute-core`.

pub mod client;
pub mod error;
pub mod models;
pub mod platform;
pub mod routes;
pub mod session;
pub mod transport;

pub use client::RouterClient;
pub use error::Error;
pub use models::StaticRoute;
pub use platform::ControllerPlatform;
pub use transport::{TlsMode, TransportConfig};
