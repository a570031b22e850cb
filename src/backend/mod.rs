//! Clients for the remote backend: auth boundary, table API, blob storage,
//! and the snapshot-backed wrapper the rest of the app talks to.

pub mod api_types;
pub mod auth;
pub mod cached_client;
pub mod client;
pub mod storage;
pub mod types;
