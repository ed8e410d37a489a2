//! Decide which active plugins a free-text message is about

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Words that point at a provider category
static CATEGORY_KEYWORDS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    map.insert(
        "analytics",
        &[
            "analytics", "traffic", "visits", "visitors", "users", "sessions", "pageviews",
            "views", "pages", "page", "realtime", "audience", "bounce", "ga4",
        ],
    );
    map.insert(
        "seo",
        &[
            "seo", "search", "queries", "query", "keywords", "keyword", "ranking", "rankings",
            "impressions", "clicks", "ctr", "position", "console",
        ],
    );
    map.insert(
        "advertising",
        &[
            "ads", "advertising", "campaign", "campaigns", "spend", "cost", "cpc", "budget",
            "conversions", "roas",
        ],
    );
    map
});

const STOPWORDS: &[&str] = &["get", "the", "and", "for", "data", "top", "google"];

/// What the relevance check knows about one active plugin
#[derive(Debug, Clone)]
pub struct PluginProfile<'a> {
    pub slug: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub methods: Vec<&'a str>,
}

/// Lowercased alphanumeric words, short and filler words dropped
pub fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

impl PluginProfile<'_> {
    fn keywords(&self) -> HashSet<String> {
        let mut keywords = words(self.slug);
        keywords.extend(words(self.name));
        keywords.extend(words(self.category));
        for method in &self.methods {
            keywords.extend(words(method));
        }
        if let Some(extra) = CATEGORY_KEYWORDS.get(self.category) {
            keywords.extend(extra.iter().map(|w| w.to_string()));
        }
        keywords
    }
}

/// Slugs of the plugins the message mentions; every plugin when none match
pub fn relevant_slugs(message: &str, profiles: &[PluginProfile<'_>]) -> Vec<String> {
    let message_words = words(message);

    let matched: Vec<String> = profiles
        .iter()
        .filter(|profile| !profile.keywords().is_disjoint(&message_words))
        .map(|profile| profile.slug.to_string())
        .collect();

    if matched.is_empty() {
        tracing::debug!("No plugin matched the message, using all {} active plugins", profiles.len());
        return profiles.iter().map(|p| p.slug.to_string()).collect();
    }
    matched
}
