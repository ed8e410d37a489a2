//! Google Search Console plugin (Webmasters API v3)

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};

use crate::application::errors::PluginError;
use crate::plugins::google::client::{api_base, GoogleClient};
use crate::plugins::params;
use crate::plugins::trait_def::{McpPlugin, MethodSpec, PluginContext, PluginResult, RefreshedCredentials};

pub const PLUGIN_CLASS: &str = "google.search_console";

const WEBMASTERS_API: &str = "https://www.googleapis.com/webmasters/v3";
const DEFAULT_ROW_LIMIT: u64 = 1000;
const DEFAULT_TOP_LIMIT: u64 = 10;

pub struct GoogleSearchConsole {
    user_id: String,
    client: GoogleClient,
    api_base: String,
    default_site: Option<String>,
}

impl GoogleSearchConsole {
    pub fn new(ctx: PluginContext) -> PluginResult<Self> {
        Ok(Self {
            client: GoogleClient::from_context(PLUGIN_CLASS, &ctx)?,
            api_base: api_base(&ctx, WEBMASTERS_API),
            default_site: ctx.config_str("site_url").map(str::to_string),
            user_id: ctx.user_id,
        })
    }

    fn site<'a>(&'a self, params: &'a Value) -> PluginResult<&'a str> {
        params::optional_str(params, "site_url")?
            .or(self.default_site.as_deref())
            .ok_or_else(|| PluginError::InvalidParams("missing required parameter 'site_url'".to_string()))
    }

    async fn query(
        &self,
        site_url: &str,
        start_date: &str,
        end_date: &str,
        dimensions: Vec<String>,
        row_limit: u64,
    ) -> PluginResult<Value> {
        let url = query_url(&self.api_base, site_url)?;
        let body = json!({
            "startDate": start_date,
            "endDate": end_date,
            "dimensions": dimensions,
            "rowLimit": row_limit,
        });

        let response = self.client.post_json(&url, &body, &[]).await?;
        Ok(flatten_rows(&response, &dimensions))
    }

    async fn get_search_analytics(&self, params: &Value) -> PluginResult<Value> {
        let site = self.site(params)?;
        let start = params::required_date(params, "start_date")?;
        let end = params::required_date(params, "end_date")?;
        let dimensions = params::optional_str_list(params, "dimensions")?
            .unwrap_or_else(|| vec!["page".to_string()]);
        let row_limit = params::optional_u64(params, "row_limit")?.unwrap_or(DEFAULT_ROW_LIMIT);

        self.query(site, start, end, dimensions, row_limit).await
    }

    async fn get_top(&self, params: &Value, dimension: &str) -> PluginResult<Value> {
        let site = self.site(params)?;
        let start = params::required_date(params, "start_date")?;
        let end = params::required_date(params, "end_date")?;
        let limit = params::optional_u64(params, "limit")?.unwrap_or(DEFAULT_TOP_LIMIT);

        self.query(site, start, end, vec![dimension.to_string()], limit).await
    }
}

/// `{base}/sites/{site_url}/searchAnalytics/query` with the site URL as one encoded segment
pub fn query_url(base: &str, site_url: &str) -> PluginResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| PluginError::InvalidParams(format!("invalid api base '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| PluginError::InvalidParams(format!("invalid api base '{}'", base)))?
        .pop_if_empty()
        .push("sites")
        .push(site_url)
        .push("searchAnalytics")
        .push("query");
    Ok(url.to_string())
}

/// Replace each row's `keys` array with named dimension fields
pub fn flatten_rows(response: &Value, dimensions: &[String]) -> Value {
    let rows: Vec<Value> = response
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    let mut flat = serde_json::Map::new();
                    if let Some(keys) = row.get("keys").and_then(Value::as_array) {
                        for (name, key) in dimensions.iter().zip(keys) {
                            flat.insert(name.clone(), key.clone());
                        }
                    }
                    for metric in ["clicks", "impressions", "ctr", "position"] {
                        if let Some(value) = row.get(metric) {
                            flat.insert(metric.to_string(), value.clone());
                        }
                    }
                    Value::Object(flat)
                })
                .collect()
        })
        .unwrap_or_default();

    json!({ "row_count": rows.len(), "rows": rows })
}

#[async_trait]
impl McpPlugin for GoogleSearchConsole {
    fn name(&self) -> &str {
        PLUGIN_CLASS
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn authenticate(&self) -> bool {
        self.client.probe(&format!("{}/sites", self.api_base)).await
    }

    async fn list_methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::new("get_search_analytics", "Search performance data from Google Search Console")
                .param("site_url", "Website URL")
                .param("start_date", "Start date (YYYY-MM-DD)")
                .param("end_date", "End date (YYYY-MM-DD)")
                .param("dimensions", "Dimensions to include, e.g. [\"query\", \"page\"]")
                .param("row_limit", "Rows to return (optional, default 1000)"),
            MethodSpec::new("get_top_pages", "Best performing pages of the website")
                .param("site_url", "Website URL")
                .param("start_date", "Start date (YYYY-MM-DD)")
                .param("end_date", "End date (YYYY-MM-DD)")
                .param("limit", "Number of pages to return (optional, default 10)"),
            MethodSpec::new("get_top_queries", "Most relevant search queries")
                .param("site_url", "Website URL")
                .param("start_date", "Start date (YYYY-MM-DD)")
                .param("end_date", "End date (YYYY-MM-DD)")
                .param("limit", "Number of queries to return (optional, default 10)"),
        ]
    }

    async fn execute(&self, method: &str, params: &Value) -> PluginResult<Value> {
        match method {
            "get_search_analytics" => self.get_search_analytics(params).await,
            "get_top_pages" => self.get_top(params, "page").await,
            "get_top_queries" => self.get_top(params, "query").await,
            other => Err(PluginError::unsupported(PLUGIN_CLASS, other)),
        }
    }

    async fn refresh_token(&self) -> bool {
        self.client.refresh().await
    }

    async fn refreshed_credentials(&self) -> Option<RefreshedCredentials> {
        self.client.refreshed().await
    }
}
