use envlog::{EngineConfig, SourceConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub connection: Connection,
    pub source: SourceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let json = r#"{
            "name": "envlog-viewer",
            "version": "0.1.0",
            "connection": {"ip": "127.0.0.1", "port": 0},
            "source": {"base_url": "http://192.168.1.10:8080", "username": "env", "password": "secret"},
            "engine": {"cache_capacity": 10, "aggregate": {"skip_leading_climate": 1}}
        }"#;
        let config: ViewerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.engine.cache_capacity, 10);
        assert_eq!(config.engine.fetch_batch_limit, 9);
        assert_eq!(config.engine.aggregate.skip_leading_climate, 1);
        assert!(config.engine.aggregate.fix_top_generation);

        // credentials never leave through /info
        let out = serde_json::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }
}
