// src/fetch/mod.rs
//! Payload retrieval: URL building, the on-disk cache and the HTTP client.

pub mod cache;
pub mod urls;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::{app_id_from_env, Config, PipelineOptions};
use crate::error::{EstatError, Result};
use crate::process::StatsTable;

pub use cache::PayloadCache;
pub use urls::{base_url, generate_url, Query, API_ROOT};

/// Descriptive metadata for the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
}

impl Metadata {
    fn for_version(api_version: &str) -> Self {
        Self {
            id: format!("estat-api-{}", api_version),
            name: format!("e-Stat API {}", api_version),
            url: base_url(api_version),
            description: format!("e-Stat API {}", api_version),
        }
    }
}

/// e-Stat client: resolves the credential up front and serves payloads
/// from the cache when it can. Never retries.
#[derive(Debug, Clone)]
pub struct EstatClient {
    http: Client,
    app_id: String,
    api_root: String,
    cache: PayloadCache,
    metadata: Metadata,
}

impl EstatClient {
    /// Fails with [`EstatError::MissingCredential`] when neither `config.app_id`
    /// nor `ESTATJP_APPID` is set.
    pub fn new(config: &Config) -> Result<Self> {
        let app_id = app_id_from_env(config.app_id.as_deref())?;
        Self::with_app_id(
            app_id,
            API_ROOT,
            PayloadCache::new(&config.cache_dir)?,
            &config.api_version,
        )
    }

    /// Construct against an explicit API root and cache. `api_version` only
    /// labels the metadata; each [`Query`] carries the version it asks for.
    pub fn with_app_id(
        app_id: impl Into<String>,
        api_root: impl Into<String>,
        cache: PayloadCache,
        api_version: &str,
    ) -> Result<Self> {
        let app_id = app_id.into();
        if app_id.trim().is_empty() {
            return Err(EstatError::MissingCredential);
        }
        Ok(Self {
            http: Client::new(),
            app_id,
            api_root: api_root.into(),
            cache,
            metadata: Metadata::for_version(api_version),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn cache(&self) -> &PayloadCache {
        &self.cache
    }

    pub fn url_for(&self, query: &Query) -> Result<Url> {
        generate_url(&self.api_root, &self.app_id, query)
    }

    /// Raw payload bytes for `query`, from cache or over HTTP.
    #[instrument(level = "info", skip(self), fields(id = %query.stats_data_id))]
    pub async fn fetch_raw_payload(&self, query: &Query) -> Result<Vec<u8>> {
        let url = self.url_for(query)?;
        if let Some(bytes) = self.cache.load(&url)? {
            info!(bytes = bytes.len(), "using cached payload");
            return Ok(bytes);
        }

        info!("downloading payload");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EstatError::transport(url.as_str(), e))?
            .error_for_status()
            .map_err(|e| EstatError::transport(url.as_str(), e))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| EstatError::transport(url.as_str(), e))?;

        self.cache.store(&url, &bytes)?;
        info!(bytes = bytes.len(), "downloaded payload");
        Ok(bytes.to_vec())
    }

    /// Fetch and reshape in one go. A payload carrying an API-level error, or
    /// one that does not decode, is evicted from the cache so the next attempt
    /// goes back to the server.
    pub async fn fetch_table(&self, query: &Query, opts: &PipelineOptions) -> Result<StatsTable> {
        let bytes = self.fetch_raw_payload(query).await?;
        match StatsTable::from_slice(&bytes, opts) {
            Ok(table) => Ok(table),
            Err(EstatError::TransportFailure { reason, .. }) => {
                let url = self.url_for(query)?;
                if self.cache.invalidate(&url)? {
                    warn!(%reason, "evicted cached error payload");
                }
                Err(EstatError::transport(url.as_str(), reason))
            }
            Err(EstatError::MalformedPayload(msg)) => {
                let url = self.url_for(query)?;
                if self.cache.invalidate(&url)? {
                    warn!(%msg, "evicted undecodable cached payload");
                }
                Err(EstatError::MalformedPayload(msg))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::test_support::payload;
    use tempfile::tempdir;

    fn client(dir: &std::path::Path) -> EstatClient {
        EstatClient::with_app_id(
            "test_appid",
            // nothing listens here; every test must be served from cache
            "http://127.0.0.1:9/rest",
            PayloadCache::new(dir).unwrap(),
            "2.1",
        )
        .unwrap()
    }

    #[test]
    fn empty_app_id_is_missing_credential() {
        let tmp = tempdir().unwrap();
        let res = EstatClient::with_app_id(
            "",
            API_ROOT,
            PayloadCache::new(tmp.path()).unwrap(),
            "2.1",
        );
        assert!(matches!(res, Err(EstatError::MissingCredential)));
    }

    #[test]
    fn metadata_follows_api_version() {
        let tmp = tempdir().unwrap();
        let c = client(tmp.path());
        assert_eq!(c.metadata().id, "estat-api-2.1");
        assert_eq!(c.metadata().name, "e-Stat API 2.1");
        assert_eq!(
            c.metadata().url,
            "http://api.e-stat.go.jp/rest/2.1/app/json/getStatsData"
        );
    }

    #[tokio::test]
    async fn cached_payload_skips_network() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let c = client(tmp.path());
        let query = Query::new("0000020201");
        let bytes = payload(
            &["T1"],
            &["C1"],
            &[("A1", "A1", 2, None)],
            &[("T1", "A1", "C1", "42")],
        );
        c.cache().store(&c.url_for(&query)?, &bytes)?;

        assert_eq!(c.fetch_raw_payload(&query).await?, bytes);
        let table = c.fetch_table(&query, &PipelineOptions::default()).await?;
        let rows: Vec<_> = table.records().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values, vec![42.0]);
        Ok(())
    }

    #[tokio::test]
    async fn api_error_payload_is_evicted() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let c = client(tmp.path());
        let query = Query::new("bad");
        let url = c.url_for(&query)?;
        let body = serde_json::json!({
            "GET_STATS_DATA": { "RESULT": { "STATUS": 100, "ERROR_MSG": "認証に失敗しました。" } }
        })
        .to_string();
        c.cache().store(&url, body.as_bytes())?;

        let res = c.fetch_table(&query, &PipelineOptions::default()).await;
        assert!(matches!(res, Err(EstatError::TransportFailure { .. })));
        assert_eq!(c.cache().load(&url)?, None);
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_payload_is_evicted() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let c = client(tmp.path());
        let query = Query::new("maintenance");
        let url = c.url_for(&query)?;
        c.cache().store(&url, b"<html>maintenance</html>")?;

        let res = c.fetch_table(&query, &PipelineOptions::default()).await;
        assert!(matches!(res, Err(EstatError::MalformedPayload(_))));
        assert_eq!(c.cache().load(&url)?, None);
        Ok(())
    }

    #[test]
    fn url_follows_query_api_version() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let c = client(tmp.path());
        let url = c.url_for(&Query::new("0000020201").api_version("3.0"))?;
        assert!(url
            .as_str()
            .starts_with("http://127.0.0.1:9/rest/3.0/app/json/getStatsData?"));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_failure() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let c = client(tmp.path());
        let res = c.fetch_raw_payload(&Query::new("uncached")).await;
        assert!(matches!(res, Err(EstatError::TransportFailure { .. })));
        Ok(())
    }
}
