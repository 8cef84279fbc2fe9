use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Elasticsearch endpoint URL
    #[serde(default = "default_elasticsearch_endpoint")]
    pub elasticsearch_endpoint: String,

    /// Elasticsearch API key; omit for unauthenticated local clusters
    #[serde(default)]
    pub elasticsearch_api_key: Option<String>,

    /// Index holding the board game catalog
    #[serde(default = "default_boardgame_index")]
    pub boardgame_index: String,

    /// Index holding recorded user actions
    #[serde(default = "default_user_action_index")]
    pub user_action_index: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_elasticsearch_endpoint() -> String {
    "http://localhost:9200".to_string()
}

fn default_boardgame_index() -> String {
    "boardgame".to_string()
}

fn default_user_action_index() -> String {
    "user_action".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
