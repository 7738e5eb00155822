//! Route reconciliation engine for Thread/Matter networks.
//!
//! Discovers Matter devices and Thread border routers over mDNS, derives
//! the /64 routes a home router needs to reach devices behind border
//! routers, and keeps the router's static-route table in line:
//!
//! - **[`classify`]** decides which prefixes and next hops are routable.
//! - **[`generate_routes`]** turns a discovery snapshot into [`DesiredRoute`]s.
//! - **[`Reconciler`]** diffs desired against current routes with a grace
//!   period before removing managed routes that went away.
//! - **[`RouteSync`]** applies a diff through a [`RouterGateway`],
//!   recovering the router session and avoiding duplicate submissions.
//! - **[`Daemon`]** runs discovery and reconciliation as background tasks.

pub mod classify;
pub mod config;
pub mod daemon;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod generate;
pub mod model;
pub mod reconcile;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DaemonConfig, RouterConfig, TlsVerification};
pub use daemon::{Daemon, Snapshot};
pub use discovery::{Announcement, DiscoverySource, MdnsDiscovery, Registry, ServiceKind};
pub use error::CoreError;
pub use gateway::{GatewayError, RouterGateway, UnifiGateway};
pub use generate::generate_routes;
pub use model::{BorderRouter, DesiredRoute, Device, RouteKey, RouterRoute};
pub use reconcile::{GraceTracker, HeldRoute, Reconciler, RouteDiff};
pub use sync::{FailedRoute, RouteSync, SyncReport};

pub use threadroute_api::ControllerPlatform;
