//! Server module assembling the HTTP surface of the gateway
//!
//! `GatewayBuilder` wires configuration, store and credential source into a
//! `GatewayHost`, and the routes module exposes that host as:
//! - an ungated login route issuing tokens
//! - gated collection/single routes for every registered model

pub mod auth_gate;
pub mod builder;
pub mod handlers;
pub mod host;
pub mod routes;

pub use builder::GatewayBuilder;
pub use host::GatewayHost;
pub use routes::build_router;
