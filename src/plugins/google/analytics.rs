//! Google Analytics 4 plugin (Analytics Data API v1beta)

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::application::errors::PluginError;
use crate::plugins::google::client::{api_base, flatten_report, GoogleClient};
use crate::plugins::params;
use crate::plugins::trait_def::{AnalyticsPlugin, McpPlugin, MethodSpec, PluginContext, PluginResult, RefreshedCredentials};

pub const PLUGIN_CLASS: &str = "google.analytics4";

const DATA_API: &str = "https://analyticsdata.googleapis.com/v1beta";
const ADMIN_API: &str = "https://analyticsadmin.googleapis.com/v1beta";

const PAGE_VIEW_METRICS: &[&str] = &["screenPageViews"];
const USER_METRICS: &[&str] = &["activeUsers", "newUsers", "sessions", "averageSessionDuration"];
const REALTIME_METRICS: &[&str] = &["activeUsers"];

pub struct GoogleAnalytics4 {
    user_id: String,
    client: GoogleClient,
    data_api: String,
    admin_api: String,
    default_property: Option<String>,
}

impl GoogleAnalytics4 {
    pub fn new(ctx: PluginContext) -> PluginResult<Self> {
        Ok(Self {
            client: GoogleClient::from_context(PLUGIN_CLASS, &ctx)?,
            data_api: api_base(&ctx, DATA_API),
            admin_api: ctx.config_str("admin_api_base").unwrap_or(ADMIN_API).trim_end_matches('/').to_string(),
            default_property: ctx.config_str("property_id").map(str::to_string),
            user_id: ctx.user_id,
        })
    }

    /// `property_id` from params, falling back to the connection config
    fn property<'a>(&'a self, params: &'a Value) -> PluginResult<&'a str> {
        params::optional_str(params, "property_id")?
            .or(self.default_property.as_deref())
            .map(|p| p.trim_start_matches("properties/"))
            .ok_or_else(|| PluginError::InvalidParams("missing required parameter 'property_id'".to_string()))
    }

    async fn get_page_views(&self, params: &Value) -> PluginResult<Value> {
        let property = self.property(params)?;
        let start = params::required_date(params, "start_date")?;
        let end = params::required_date(params, "end_date")?;
        let dimensions = params::optional_str_list(params, "dimensions")?
            .unwrap_or_else(|| vec!["pagePath".to_string()]);
        let limit = params::optional_u64(params, "limit")?;

        self.get_metrics(property, start, end, &to_owned(PAGE_VIEW_METRICS), &dimensions, limit)
            .await
    }

    async fn get_user_metrics(&self, params: &Value) -> PluginResult<Value> {
        let property = self.property(params)?;
        let start = params::required_date(params, "start_date")?;
        let end = params::required_date(params, "end_date")?;

        self.get_metrics(property, start, end, &to_owned(USER_METRICS), &[], None)
            .await
    }
}

fn to_owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn named(names: &[String]) -> Vec<Value> {
    names.iter().map(|n| json!({ "name": n })).collect()
}

/// Body of a `runReport` request
pub fn report_request(
    start_date: &str,
    end_date: &str,
    metrics: &[String],
    dimensions: &[String],
    limit: Option<u64>,
) -> Value {
    let mut body = json!({
        "dateRanges": [{ "startDate": start_date, "endDate": end_date }],
        "metrics": named(metrics),
    });
    if !dimensions.is_empty() {
        body["dimensions"] = Value::Array(named(dimensions));
    }
    if let Some(limit) = limit {
        body["limit"] = Value::from(limit);
    }
    body
}

#[async_trait]
impl McpPlugin for GoogleAnalytics4 {
    fn name(&self) -> &str {
        PLUGIN_CLASS
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn authenticate(&self) -> bool {
        self.client
            .probe(&format!("{}/accountSummaries?pageSize=1", self.admin_api))
            .await
    }

    async fn list_methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::new("get_page_views", "Page views of the website")
                .param("property_id", "GA4 property ID")
                .param("start_date", "Start date, YYYY-MM-DD")
                .param("end_date", "End date, YYYY-MM-DD")
                .param("dimensions", "Dimensions to group by (optional, default pagePath)")
                .param("limit", "Maximum number of rows (optional)"),
            MethodSpec::new("get_user_metrics", "User metrics of the website: active and new users, sessions")
                .param("property_id", "GA4 property ID")
                .param("start_date", "Start date, YYYY-MM-DD")
                .param("end_date", "End date, YYYY-MM-DD"),
            MethodSpec::new("get_real_time_data", "Active users right now, by country")
                .param("property_id", "GA4 property ID (optional)"),
        ]
    }

    async fn execute(&self, method: &str, params: &Value) -> PluginResult<Value> {
        match method {
            "get_page_views" => self.get_page_views(params).await,
            "get_user_metrics" => self.get_user_metrics(params).await,
            "get_real_time_data" => {
                let property = self.property(params)?;
                self.get_real_time_data(property).await
            }
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
impl AnalyticsPlugin for GoogleAnalytics4 {
    async fn get_metrics(
        &self,
        property_id: &str,
        start_date: &str,
        end_date: &str,
        metrics: &[String],
        dimensions: &[String],
        limit: Option<u64>,
    ) -> PluginResult<Value> {
        if metrics.is_empty() {
            return Err(PluginError::InvalidParams("at least one metric is required".to_string()));
        }

        let url = format!("{}/properties/{}:runReport", self.data_api, property_id);
        let body = report_request(start_date, end_date, metrics, dimensions, limit);
        let report = self.client.post_json(&url, &body, &[]).await?;
        Ok(flatten_report(&report))
    }

    async fn get_real_time_data(&self, property_id: &str) -> PluginResult<Value> {
        let url = format!("{}/properties/{}:runRealtimeReport", self.data_api, property_id);
        let body = json!({
            "metrics": named(&to_owned(REALTIME_METRICS)),
            "dimensions": [{ "name": "country" }],
        });
        let report = self.client.post_json(&url, &body, &[]).await?;
        Ok(flatten_report(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plugin(config: Value) -> GoogleAnalytics4 {
        GoogleAnalytics4::new(PluginContext::new(json!({"token": "t"}), config, "user-1")).unwrap()
    }

    #[test]
    fn test_report_request_shape() {
        let body = report_request(
            "2024-01-01",
            "2024-01-31",
            &["screenPageViews".to_string()],
            &["pagePath".to_string()],
            Some(5),
        );
        assert_eq!(body["dateRanges"][0]["startDate"], "2024-01-01");
        assert_eq!(body["metrics"][0]["name"], "screenPageViews");
        assert_eq!(body["dimensions"][0]["name"], "pagePath");
        assert_eq!(body["limit"], 5);

        let body = report_request("today", "today", &["activeUsers".to_string()], &[], None);
        assert!(body.get("dimensions").is_none());
        assert!(body.get("limit").is_none());
    }

    #[tokio::test]
    async fn test_catalog_lists_three_methods() {
        let methods = plugin(json!({})).list_methods().await;
        let names: Vec<_> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["get_page_views", "get_user_metrics", "get_real_time_data"]);
    }

    #[tokio::test]
    async fn test_unknown_method_fails() {
        let err = plugin(json!({})).execute("delete_property", &json!({})).await.unwrap_err();
        assert!(matches!(err, PluginError::UnsupportedMethod { .. }));
    }

    #[tokio::test]
    async fn test_missing_property_is_invalid_params() {
        let err = plugin(json!({}))
            .execute("get_user_metrics", &json!({"start_date": "2024-01-01", "end_date": "2024-01-31"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_page_views_uses_config_property() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/properties/123:runReport"))
            .and(body_partial_json(json!({
                "metrics": [{"name": "screenPageViews"}],
                "dimensions": [{"name": "pagePath"}],
                "limit": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dimensionHeaders": [{"name": "pagePath"}],
                "metricHeaders": [{"name": "screenPageViews"}],
                "rows": [{"dimensionValues": [{"value": "/"}], "metricValues": [{"value": "9"}]}],
                "rowCount": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ga = plugin(json!({"property_id": "properties/123", "api_base": server.uri()}));
        let result = ga
            .execute(
                "get_page_views",
                &json!({"start_date": "7daysAgo", "end_date": "today", "limit": 3}),
            )
            .await
            .unwrap();

        assert_eq!(result["rows"][0]["pagePath"], "/");
        assert_eq!(result["rows"][0]["screenPageViews"], "9");
    }
}
