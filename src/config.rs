
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Directory tenant the client-credentials grant is issued against.
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Host of the identity provider. Overridable so tests and sovereign
    /// clouds can point elsewhere.
    pub authority_host: String,
    pub graph_base_url: String,
    pub graph_scope: String,
    /// Upper bound on every outbound HTTP call, in seconds.
    pub http_timeout_secs: u64,
    /// Periodic reconciliation interval. `None` disables the background job.
    pub sync_interval_secs: Option<u64>,
}

impl Config {
    /// Token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "postgres://localhost/groupsync".into(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.into(),
            graph_scope: DEFAULT_GRAPH_SCOPE.into(),
            http_timeout_secs: 30,
            sync_interval_secs: None,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let defaults = Config::default();

    let tenant_id = std::env::var("TENANT_ID").unwrap_or_default();
    let client_id = std::env::var("CLIENT_ID").unwrap_or_default();
    let client_secret = std::env::var("CLIENT_SECRET").unwrap_or_default();

    // Missing credentials are not fatal: the grant will fail and every
    // authenticated request answers 500 until they are provided.
    if tenant_id.is_empty() || client_id.is_empty() || client_secret.is_empty() {
        tracing::warn!("TENANT_ID, CLIENT_ID or CLIENT_SECRET is not set; token acquisition will fail");
    }

    Ok(Config {
        port: std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port),
        database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
        tenant_id,
        client_id,
        client_secret,
        authority_host: std::env::var("AUTHORITY_HOST").unwrap_or(defaults.authority_host),
        graph_base_url: std::env::var("GRAPH_BASE_URL").unwrap_or(defaults.graph_base_url),
        graph_scope: std::env::var("GRAPH_SCOPE").unwrap_or(defaults.graph_scope),
        http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.http_timeout_secs),
        sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0),
    })
}
