// Network side of the engine: known-days list, day archives and live diffs

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants::{ARC_PATH, DIF_PATH, LIST_PATH};
use crate::core::error::{EnvLogError, Result};
use crate::core::format::Sample;
use crate::core::reader::{decode_body, parse_archive, parse_day_list, parse_records};

/// Opaque fetch+decompress+parse calls the engine depends on.
#[allow(async_fn_in_trait)]
pub trait ArchiveSource {
    async fn fetch_known_days(&self) -> Result<Vec<String>>;
    async fn fetch_day_archive(&self, day_key: &str) -> Result<Vec<Sample>>;
    /// Samples strictly newer than `since` (seconds); empty means no new data.
    async fn fetch_diff(&self, since: i64) -> Result<Vec<Sample>>;
}

impl<S: ArchiveSource> ArchiveSource for &S {
    async fn fetch_known_days(&self) -> Result<Vec<String>> {
        (**self).fetch_known_days().await
    }

    async fn fetch_day_archive(&self, day_key: &str) -> Result<Vec<Sample>> {
        (**self).fetch_day_archive(day_key).await
    }

    async fn fetch_diff(&self, since: i64) -> Result<Vec<Sample>> {
        (**self).fetch_diff(since).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// HTTP client for the logging server.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_body(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let mut request = self.client.get(&url);
        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() || status == StatusCode::NO_CONTENT {
            return Err(EnvLogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = resp.bytes().await?;
        let text = decode_body(&bytes)?;
        debug!("GET {}: {} => {} bytes", url, bytes.len(), text.len());
        Ok(text)
    }
}

impl ArchiveSource for HttpSource {
    async fn fetch_known_days(&self) -> Result<Vec<String>> {
        parse_day_list(&self.get_body(LIST_PATH).await?)
    }

    async fn fetch_day_archive(&self, day_key: &str) -> Result<Vec<Sample>> {
        parse_archive(&self.get_body(&format!("{}/{}", ARC_PATH, day_key)).await?)
    }

    async fn fetch_diff(&self, since: i64) -> Result<Vec<Sample>> {
        parse_records(&self.get_body(&format!("{}/{}", DIF_PATH, since)).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let source = HttpSource::new(SourceConfig {
            base_url: "http://envlog.local:8080/".to_string(),
            ..Default::default()
        });
        assert_eq!(source.url("arc/20240101"), "http://envlog.local:8080/arc/20240101");
        assert_eq!(source.url(LIST_PATH), "http://envlog.local:8080/list/0");
    }
}
