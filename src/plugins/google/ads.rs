//! Google Ads plugin (REST search with GAQL)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::application::errors::PluginError;
use crate::plugins::google::client::{api_base, GoogleClient};
use crate::plugins::params;
use crate::plugins::trait_def::{AdvertisingPlugin, McpPlugin, MethodSpec, PluginContext, PluginResult, RefreshedCredentials};

pub const PLUGIN_CLASS: &str = "google.ads";

const ADS_API: &str = "https://googleads.googleapis.com/v17";

pub struct GoogleAds {
    user_id: String,
    client: GoogleClient,
    api_base: String,
    developer_token: String,
    customer_id: String,
    login_customer_id: Option<String>,
}

impl GoogleAds {
    pub fn new(ctx: PluginContext) -> PluginResult<Self> {
        let developer_token = ctx
            .config_str("developer_token")
            .ok_or_else(|| PluginError::Credentials(format!("{}: missing developer_token", PLUGIN_CLASS)))?
            .to_string();
        let customer_id = ctx
            .config_str("customer_id")
            .map(normalize_customer_id)
            .ok_or_else(|| PluginError::Credentials(format!("{}: missing customer_id", PLUGIN_CLASS)))?;

        Ok(Self {
            client: GoogleClient::from_context(PLUGIN_CLASS, &ctx)?,
            api_base: api_base(&ctx, ADS_API),
            login_customer_id: ctx.config_str("login_customer_id").map(normalize_customer_id),
            developer_token,
            customer_id,
            user_id: ctx.user_id,
        })
    }

    async fn search(&self, query: &str) -> PluginResult<Value> {
        let url = format!("{}/customers/{}/googleAds:search", self.api_base, self.customer_id);
        let mut headers = vec![("developer-token", self.developer_token.as_str())];
        if let Some(login) = self.login_customer_id.as_deref() {
            headers.push(("login-customer-id", login));
        }

        tracing::debug!("{}: {}", PLUGIN_CLASS, query);
        let response = self.client.post_json(&url, &json!({ "query": query }), &headers).await?;
        let rows = response.get("results").cloned().unwrap_or_else(|| json!([]));
        let count = rows.as_array().map_or(0, Vec::len);
        Ok(json!({ "row_count": count, "rows": rows }))
    }
}

/// `123-456-7890` and `1234567890` name the same account
fn normalize_customer_id(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect()
}

/// GAQL filter for a user-facing campaign status; `all` disables filtering
pub fn status_filter(status: &str) -> PluginResult<Option<&'static str>> {
    match status.to_ascii_lowercase().as_str() {
        "active" | "enabled" => Ok(Some("ENABLED")),
        "paused" => Ok(Some("PAUSED")),
        "removed" => Ok(Some("REMOVED")),
        "all" => Ok(None),
        other => Err(PluginError::InvalidParams(format!(
            "unknown campaign status '{}', expected active, paused, removed or all",
            other
        ))),
    }
}

pub fn campaigns_query(status: Option<&str>) -> String {
    let mut query = String::from(
        "SELECT campaign.id, campaign.name, campaign.status, \
         campaign.advertising_channel_type FROM campaign",
    );
    if let Some(status) = status {
        query.push_str(&format!(" WHERE campaign.status = '{}'", status));
    }
    query.push_str(" ORDER BY campaign.id");
    query
}

pub fn campaigns_performance_query(campaign_ids: &[String]) -> PluginResult<String> {
    if campaign_ids.is_empty() {
        return Err(PluginError::InvalidParams("at least one campaign id is required".to_string()));
    }
    if let Some(bad) = campaign_ids.iter().find(|id| id.is_empty() || !id.chars().all(|c| c.is_ascii_digit())) {
        return Err(PluginError::InvalidParams(format!("campaign id '{}' must be numeric", bad)));
    }

    Ok(format!(
        "SELECT campaign.id, campaign.name, metrics.impressions, metrics.clicks, \
         metrics.ctr, metrics.cost_micros, metrics.conversions FROM campaign \
         WHERE campaign.id IN ({}) AND segments.date DURING LAST_30_DAYS",
        campaign_ids.join(", ")
    ))
}

const ACCOUNT_PERFORMANCE_QUERY: &str = "SELECT customer.id, customer.descriptive_name, \
     metrics.impressions, metrics.clicks, metrics.ctr, metrics.cost_micros, \
     metrics.conversions FROM customer WHERE segments.date DURING LAST_30_DAYS";

#[async_trait]
impl McpPlugin for GoogleAds {
    fn name(&self) -> &str {
        PLUGIN_CLASS
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn authenticate(&self) -> bool {
        match self.search("SELECT customer.id FROM customer LIMIT 1").await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("{} authentication failed: {}", PLUGIN_CLASS, e);
                false
            }
        }
    }

    async fn list_methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::new("get_campaigns", "Campaigns of the advertising account")
                .param("status", "active, paused, removed or all (optional, default active)"),
            MethodSpec::new("get_campaigns_performance", "Last 30 days performance of specific campaigns")
                .param("campaign_ids", "List of numeric campaign IDs"),
            MethodSpec::new("get_account_performance", "Last 30 days performance of the whole account"),
        ]
    }

    async fn execute(&self, method: &str, params: &Value) -> PluginResult<Value> {
        match method {
            "get_campaigns" => {
                let status = params::optional_str(params, "status")?.unwrap_or("active");
                self.get_campaigns(status).await
            }
            "get_campaigns_performance" => {
                let ids = params::optional_str_list(params, "campaign_ids")?.unwrap_or_default();
                self.get_campaigns_performance(&ids).await
            }
            "get_account_performance" => self.get_account_performance().await,
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

#[async_trait]
impl AdvertisingPlugin for GoogleAds {
    async fn get_campaigns(&self, status: &str) -> PluginResult<Value> {
        let filter = status_filter(status)?;
        self.search(&campaigns_query(filter)).await
    }

    async fn get_campaigns_performance(&self, campaign_ids: &[String]) -> PluginResult<Value> {
        let query = campaigns_performance_query(campaign_ids)?;
        self.search(&query).await
    }

    async fn get_account_performance(&self) -> PluginResult<Value> {
        self.search(ACCOUNT_PERFORMANCE_QUERY).await
    }
}
