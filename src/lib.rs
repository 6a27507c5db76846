//! groupsync — mirrors directory security groups into local storage.
//!
//! Data flow: sync endpoint → [`sync::Reconciler`] → [`directory::DirectoryClient`]
//! → ([`middleware::auth_gate::AuthGate`] → [`identity::TokenProvider`]) → storage.

use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod errors;
pub mod identity;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod store;
pub mod sync;

use directory::DirectoryClient;
use identity::TokenProvider;
use middleware::auth_gate::AuthGate;
use store::GroupStore;
use sync::Reconciler;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: config::Config,
    pub gate: Arc<AuthGate>,
    pub store: Arc<dyn GroupStore>,
    pub reconciler: Reconciler,
}

impl AppState {
    /// Wires token provider, gate, directory client and reconciler around `store`.
    pub fn new(config: config::Config, store: Arc<dyn GroupStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let provider = Arc::new(TokenProvider::from_config(http.clone(), &config));
        let gate = Arc::new(AuthGate::new(provider));
        let directory = Arc::new(DirectoryClient::new(
            http,
            config.graph_base_url.clone(),
            gate.clone(),
        ));
        let reconciler = Reconciler::new(directory, store.clone());

        Ok(Self {
            config,
            gate,
            store,
            reconciler,
        })
    }
}

pub use api::router as app;
