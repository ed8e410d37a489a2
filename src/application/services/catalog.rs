//! Provider catalog: categories and providers maintained by administrators

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::{AppError, ConfigError};
use crate::domain::entities::{Category, IntegrationType, Provider};
use crate::infrastructure::database::{NewCategory, NewProvider};
use crate::infrastructure::storage::{lock, SharedDatabase};

/// Seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<NewCategory>,
    #[serde(default)]
    pub providers: Vec<NewProvider>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The providers this crate ships plugins for
    pub fn builtin() -> Self {
        let category = |name: &str, slug: &str, icon: &str, order: i32, description: &str| NewCategory {
            name: name.to_string(),
            slug: slug.to_string(),
            icon: icon.to_string(),
            description: Some(description.to_string()),
            order,
        };

        let google_scope = |scope: &str| format!("https://www.googleapis.com/auth/{}", scope);

        Self {
            categories: vec![
                category("Analytics", "analytics", "chart-line", 1, "Website and app traffic"),
                category("SEO", "seo", "magnifying-glass", 2, "Organic search performance"),
                category("Advertising", "advertising", "bullhorn", 3, "Paid campaigns"),
            ],
            providers: vec![
                NewProvider {
                    name: "Google Analytics 4".to_string(),
                    slug: "google-analytics".to_string(),
                    category: "analytics".to_string(),
                    description: Some("Traffic, users and real-time activity from GA4 properties".to_string()),
                    icon_url: "https://www.gstatic.com/analytics-suite/header/suite/v2/ic_analytics.svg".to_string(),
                    documentation_url: "https://developers.google.com/analytics/devguides/reporting/data/v1".to_string(),
                    integration_type: IntegrationType::Oauth2,
                    plugin_class: "google.analytics4".to_string(),
                    required_scopes: vec![google_scope("analytics.readonly")],
                    webhook_events: vec![],
                },
                NewProvider {
                    name: "Google Search Console".to_string(),
                    slug: "google-search-console".to_string(),
                    category: "seo".to_string(),
                    description: Some("Search queries, impressions and rankings".to_string()),
                    icon_url: "https://www.gstatic.com/images/branding/product/2x/search_console_48dp.png".to_string(),
                    documentation_url: "https://developers.google.com/webmaster-tools/v1/api_reference_index".to_string(),
                    integration_type: IntegrationType::Oauth2,
                    plugin_class: "google.search_console".to_string(),
                    required_scopes: vec![google_scope("webmasters.readonly")],
                    webhook_events: vec![],
                },
                NewProvider {
                    name: "Google Ads".to_string(),
                    slug: "google-ads".to_string(),
                    category: "advertising".to_string(),
                    description: Some("Campaigns and account performance".to_string()),
                    icon_url: "https://www.gstatic.com/images/branding/product/2x/ads_48dp.png".to_string(),
                    documentation_url: "https://developers.google.com/google-ads/api/rest/overview".to_string(),
                    integration_type: IntegrationType::Oauth2,
                    plugin_class: "google.ads".to_string(),
                    required_scopes: vec![google_scope("adwords")],
                    webhook_events: vec![],
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub categories: usize,
    pub providers: usize,
}

/// Read access to the catalog plus seeding
#[derive(Clone)]
pub struct CatalogService {
    db: SharedDatabase,
}

impl CatalogService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(lock(&self.db)?.list_categories()?)
    }

    /// Providers ordered by category then name, optionally for one category slug
    pub fn list_providers(&self, category: Option<&str>) -> Result<Vec<Provider>, AppError> {
        Ok(lock(&self.db)?.list_providers(category)?)
    }

    pub fn get_provider(&self, slug: &str) -> Result<Provider, AppError> {
        lock(&self.db)?
            .get_provider_by_slug(slug)?
            .ok_or_else(|| AppError::NotFound(format!("provider '{}'", slug)))
    }

    /// Insert or update every entry; categories first so providers can reference them
    pub fn seed(&self, catalog: &Catalog) -> Result<SeedSummary, AppError> {
        let db = lock(&self.db)?;
        for category in &catalog.categories {
            db.upsert_category(category)?;
        }
        for provider in &catalog.providers {
            db.upsert_provider(provider)?;
        }

        tracing::info!(
            "Seeded {} categories and {} providers",
            catalog.categories.len(),
            catalog.providers.len()
        );
        Ok(SeedSummary {
            categories: catalog.categories.len(),
            providers: catalog.providers.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::Database;
    use crate::infrastructure::storage::share;
    use crate::plugins::PluginRegistry;

    fn service() -> CatalogService {
        CatalogService::new(share(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_builtin_catalog_matches_registry() {
        let registry = PluginRegistry::with_builtin();
        for provider in Catalog::builtin().providers {
            assert!(registry.contains(&provider.plugin_class), "{}", provider.plugin_class);
        }
    }

    #[test]
    fn test_seed_is_idempotent() {
        let service = service();
        let summary = service.seed(&Catalog::builtin()).unwrap();
        assert_eq!(summary, SeedSummary { categories: 3, providers: 3 });
        service.seed(&Catalog::builtin()).unwrap();

        assert_eq!(service.list_categories().unwrap().len(), 3);
        assert_eq!(service.list_providers(None).unwrap().len(), 3);
        assert_eq!(service.list_providers(Some("seo")).unwrap()[0].slug, "google-search-console");
    }

    #[test]
    fn test_get_provider_not_found() {
        let service = service();
        service.seed(&Catalog::builtin()).unwrap();
        assert_eq!(service.get_provider("google-ads").unwrap().category.slug, "advertising");
        assert!(matches!(service.get_provider("meta-ads"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_catalog_yaml() {
        let yaml = r#"
categories:
  - name: Analytics
    slug: analytics
providers:
  - name: Matomo
    slug: matomo
    category: analytics
    integration-type: api_key
    plugin-class: matomo.reporting
"#;
        let catalog: Catalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.providers[0].integration_type, IntegrationType::ApiKey);

        let service = service();
        service.seed(&catalog).unwrap();
        assert_eq!(service.get_provider("matomo").unwrap().plugin_class, "matomo.reporting");
    }

    #[test]
    fn test_provider_with_unknown_category_fails() {
        let mut catalog = Catalog::builtin();
        catalog.categories.clear();
        assert!(matches!(service().seed(&catalog), Err(AppError::Storage(_))));
    }
}
