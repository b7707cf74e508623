/// Which aggregation policy [`crate::BookAggregator::search`] uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPolicy {
    /// One paginated catalog search, junk-filtered, scored and enriched.
    #[default]
    SingleSource,
    /// Concurrent curated + catalog search, merged and deduplicated.
    MultiSource,
}

/// Deployment configuration, passed to the aggregator at construction.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    pub catalog_api_key: Option<String>,
    pub curated_api_key: Option<String>,

    /// Gates the catalog leg of merged searches and the catalog capability
    /// handle. Off unless explicitly enabled.
    pub catalog_search_enabled: bool,

    pub search_policy: SearchPolicy,
}

impl DiscoveryConfig {
    /// Read configuration from the environment. Missing keys are simply
    /// absent; the upstream services then fail or return empty responses,
    /// which the pipeline already absorbs.
    pub fn from_env() -> Self {
        let catalog_api_key = env_first(["BOOKSCOUT_CATALOG_API_KEY", "GOOGLE_BOOKS_API_KEY"]);
        let curated_api_key = env_first(["BOOKSCOUT_CURATED_API_KEY", "NYT_BOOKS_API_KEY"]);

        let catalog_search_enabled = env_first(["BOOKSCOUT_CATALOG_SEARCH"])
            .map(|value| value == "true")
            .unwrap_or(false);

        let search_policy = match env_first(["BOOKSCOUT_SEARCH_POLICY"]).as_deref() {
            Some("multi") => SearchPolicy::MultiSource,
            _ => SearchPolicy::SingleSource,
        };

        Self {
            catalog_api_key,
            curated_api_key,
            catalog_search_enabled,
            search_policy,
        }
    }
}

fn env_first<const N: usize>(keys: [&str; N]) -> Option<String> {
    keys.into_iter()
        .find_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// ─── Tests ──────────────────────────────────────────────────
