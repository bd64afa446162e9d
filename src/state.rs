//! Process-wide services installed once at startup: the ANN registry (a
//! single process-wide object per kind, guarded by a reader-writer lock)
//! and the Host/Embedder clients. A direct dependency-injection value
//! into `AppContext` isn't available in loco's `app::AppContext`, so
//! these live behind a `OnceLock` set exactly once during `App::boot`,
//! after `create_app` hands back a context to build the clients and
//! indexes from.

use std::sync::OnceLock;

use crate::ann::AnnRegistry;
use crate::embedder::EmbedderClient;
use crate::host::HostClient;

pub struct Services {
    pub ann: AnnRegistry,
    pub host: HostClient,
    pub embedder: EmbedderClient,
}

static SERVICES: OnceLock<Services> = OnceLock::new();

/// Installs the process-wide services. Called exactly once, from
/// `App::boot`.
///
/// # Panics
/// If called more than once.
pub fn install(services: Services) {
    SERVICES
        .set(services)
        .unwrap_or_else(|_| panic!("services already installed"));
}

/// # Panics
/// If `install` hasn't run yet (i.e. called before app boot completes).
#[must_use]
pub fn services() -> &'static Services {
    SERVICES.get().expect("services not installed; App::boot must run first")
}
