// src/fetch/urls.rs
use url::Url;

use crate::config::DEFAULT_API_VERSION;
use crate::error::{EstatError, Result};

/// Versionless root of the REST API.
pub const API_ROOT: &str = "http://api.e-stat.go.jp/rest";

/// What to ask e-Stat for. Restriction lists are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub stats_data_id: String,
    pub area: Option<Vec<String>>,
    pub cat: Option<Vec<String>>,
    pub time: Option<Vec<String>>,
    pub api_version: String,
}

impl Query {
    pub fn new(stats_data_id: impl Into<String>) -> Self {
        Self {
            stats_data_id: stats_data_id.into(),
            area: None,
            cat: None,
            time: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn areas<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.area = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn categories<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cat = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn times<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

/// `getStatsData` JSON endpoint for an API version.
pub fn base_url(api_version: &str) -> String {
    endpoint(API_ROOT, api_version)
}

fn endpoint(api_root: &str, api_version: &str) -> String {
    format!(
        "{}/{}/app/json/getStatsData",
        api_root.trim_end_matches('/'),
        api_version
    )
}

/// Full request URL for `query` under `api_root`, at the query's API version.
pub fn generate_url(api_root: &str, app_id: &str, query: &Query) -> Result<Url> {
    let base = endpoint(api_root, &query.api_version);
    let mut params: Vec<(&str, String)> = vec![
        ("appId", app_id.to_string()),
        ("lang", "J".to_string()),
        ("statsDataId", query.stats_data_id.clone()),
        ("metaGetFlg", "Y".to_string()),
        ("cntGetFlg", "N".to_string()),
        ("sectionHeaderFlg", "1".to_string()),
    ];
    if let Some(area) = &query.area {
        params.push(("cdArea", area.join(",")));
    }
    if let Some(cat) = &query.cat {
        params.push(("cdCat01", cat.join(",")));
    }
    if let Some(time) = &query.time {
        params.push(("cdTime", time.join(",")));
    }

    Url::parse_with_params(&base, &params)
        .map_err(|e| EstatError::Config(format!("bad base url {}: {}", base, e)))
}
