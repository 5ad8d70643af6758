//! Client-side domain model and protocol adapter for a Hue lighting hub.
//!
//! - Blocking client using `ureq` (no async); every operation is a small
//!   fixed number of round trips against `http://{host}:{port}/api/{key}`.
//! - In-memory registries of lights, groups and schedules mirror the hub's
//!   last known state and are rebuilt by [`HueClient::load`].
//! - Mutations are validated locally before anything is sent; see
//!   [`validate`] for the attribute schema and [`error::HueError`] for the
//!   failure taxonomy.
//!
//! The raw transport is a trait seam ([`transport::HubTransport`]), so the
//! client can be exercised without a hub on the network.

pub mod models {
    pub mod hue;
}

pub mod client;
pub mod error;
pub mod events;
pub mod repeat;
pub mod transport;
pub mod validate;

pub use client::HueClient;
pub use error::HueError;
