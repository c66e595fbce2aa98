use action_flow::FlowConfig;
use anyhow::Context as _;

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `BIND_ADDR`, defaults to `0.0.0.0:3000`.
    pub bind_addr: String,
    /// `DATABASE_URL`; sessions stay in memory when unset.
    pub database_url: Option<String>,
    /// Loaded from the YAML file named by `FLOW_CONFIG`.
    pub flow: FlowConfig,
    /// `LOG_FORMAT`, `pretty` or `json`.
    pub log_format: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let flow = match std::env::var("FLOW_CONFIG") {
            Ok(path) => FlowConfig::from_yaml_file(&path)
                .with_context(|| format!("loading flow config from {path}"))?,
            Err(_) => FlowConfig::default(),
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            flow,
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        })
    }
}
