//! Rummage marketplace server: HTTP/WebSocket surface over an in-process
//! storage collaborator. Exposed as a library so integration tests can
//! boot the router without spawning the binary.

pub mod api;
pub mod auth;
pub mod error;
pub mod realtime;
pub mod store;

pub use api::{router, AppState};
