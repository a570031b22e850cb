use std::sync::Arc;

use crate::backend::auth::AuthClient;
use crate::backend::cached_client::CachedStoreClient;
use crate::config::Config;

/// Shared handles for the lifetime of a session: constructed at startup,
/// handed to views behind an `Arc`, dropped at exit.
pub struct AppContext {
  pub config: Config,
  pub auth: AuthClient,
  pub store: CachedStoreClient,
}

pub type SharedContext = Arc<AppContext>;
