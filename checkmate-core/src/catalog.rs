//! Model catalogs: the live Hugging Face listing and the bundled fallback.
//!
//! Consumers only see [`ModelCatalogProvider`], which never fails and never
//! returns an empty list. Network failures are absorbed by
//! [`FallbackCatalog`].

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CatalogSettings;
use crate::error::CatalogError;
use crate::models::{self, DEFAULT_MAX_CONTEXT, ModelDescriptor};

const USER_AGENT: &str = concat!("llm-checkmate/", env!("CARGO_PKG_VERSION"));

// ────────────────────────────────────────────────────────────────────
// Provider traits
// ────────────────────────────────────────────────────────────────────

/// Supplies model descriptors to the engine.
pub trait ModelCatalogProvider {
    /// Human-readable name shown in logs and the UI.
    fn name(&self) -> &str;

    /// Models for a pipeline task, optionally narrowed by a search term.
    /// Infallible and never empty.
    fn fetch_models(&self, task: &str, search: &str) -> Vec<ModelDescriptor>;
}

/// A catalog that can fail, e.g. because it lives behind the network.
pub trait RemoteCatalog {
    fn name(&self) -> &str;

    fn try_fetch(&self, task: &str, search: &str) -> Result<Vec<ModelDescriptor>, CatalogError>;
}

// ────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────

/// Exponential backoff: `base * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Client errors other than rate limiting will not change on retry.
pub fn is_retryable(err: &CatalogError) -> bool {
    match err {
        CatalogError::Http(_) => true,
        CatalogError::Status(code) => *code == 429 || *code >= 500,
        CatalogError::Decode(_) | CatalogError::Exhausted { .. } => false,
    }
}

// ────────────────────────────────────────────────────────────────────
// Hugging Face
// ────────────────────────────────────────────────────────────────────

/// Live listing from the Hugging Face Hub `/api/models` endpoint.
pub struct HuggingFaceCatalog {
    endpoint: String,
    limit: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for HuggingFaceCatalog {
    fn default() -> Self {
        Self::from_settings(&CatalogSettings::default())
    }
}

#[derive(Deserialize)]
struct HfModelEntry {
    id: String,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    safetensors: Option<HfSafetensors>,
}

#[derive(Deserialize)]
struct HfSafetensors {
    #[serde(default)]
    total: Option<u64>,
}

impl HuggingFaceCatalog {
    pub fn new(endpoint: impl Into<String>) -> Self {
        HuggingFaceCatalog {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &CatalogSettings) -> Self {
        HuggingFaceCatalog {
            endpoint: settings.endpoint.clone(),
            limit: settings.limit,
            timeout: Duration::from_secs(settings.timeout_secs),
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                base_delay: Duration::from_millis(settings.base_delay_ms),
                max_delay: Duration::from_millis(settings.max_delay_ms),
            },
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn models_url(&self) -> String {
        format!("{}/api/models", self.endpoint.trim_end_matches('/'))
    }

    fn call_once(&self, task: &str, search: &str) -> Result<Vec<HfModelEntry>, CatalogError> {
        let mut request = ureq::get(&self.models_url())
            .query("pipeline_tag", task)
            .query("sort", "downloads")
            .query("direction", "-1")
            .query("limit", self.limit.to_string())
            .query("expand[]", "downloads")
            .query("expand[]", "pipeline_tag")
            .query("expand[]", "safetensors")
            .header("User-Agent", USER_AGENT);
        if !search.trim().is_empty() {
            request = request.query("search", search.trim());
        }

        let response = request
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => CatalogError::Status(code),
                other => CatalogError::Http(other.to_string()),
            })?;

        response
            .into_body()
            .read_json()
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Turn one listing entry into a descriptor. Entries whose size cannot be
/// determined are skipped.
fn descriptor_from_entry(entry: HfModelEntry, task: &str) -> Option<ModelDescriptor> {
    let params_b = entry
        .safetensors
        .and_then(|s| s.total)
        .filter(|&total| total > 0)
        .map(|total| total as f64 / 1_000_000_000.0)
        .or_else(|| models::parse_params_from_name(&entry.id))?;

    let task = entry.pipeline_tag.unwrap_or_else(|| task.to_string());
    match ModelDescriptor::new(entry.id, params_b, DEFAULT_MAX_CONTEXT) {
        Ok(model) => Some(model.with_downloads(entry.downloads).with_task(task)),
        Err(e) => {
            debug!(error = %e, "skipping catalog entry");
            None
        }
    }
}

impl RemoteCatalog for HuggingFaceCatalog {
    fn name(&self) -> &str {
        "Hugging Face"
    }

    fn try_fetch(&self, task: &str, search: &str) -> Result<Vec<ModelDescriptor>, CatalogError> {
        let mut attempt = 0u32;
        loop {
            match self.call_once(task, search) {
                Ok(entries) => {
                    let total = entries.len();
                    let models: Vec<ModelDescriptor> = entries
                        .into_iter()
                        .filter_map(|e| descriptor_from_entry(e, task))
                        .collect();
                    debug!(total, kept = models.len(), task, search, "catalog fetched");
                    return Ok(models);
                }
                Err(err) if is_retryable(&err) && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "catalog request failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) if is_retryable(&err) => {
                    return Err(CatalogError::Exhausted {
                        attempts: attempt + 1,
                        last: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Bundled list
// ────────────────────────────────────────────────────────────────────

/// The model list compiled into the binary.
#[derive(Default)]
pub struct EmbeddedCatalog;

impl ModelCatalogProvider for EmbeddedCatalog {
    fn name(&self) -> &str {
        "Bundled"
    }

    fn fetch_models(&self, task: &str, search: &str) -> Vec<ModelDescriptor> {
        let all = models::embedded_models();
        let filtered: Vec<ModelDescriptor> = all
            .iter()
            .filter(|m| task.is_empty() || m.task() == task)
            .filter(|m| m.matches(search))
            .cloned()
            .collect();
        if filtered.is_empty() {
            all.to_vec()
        } else {
            filtered
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Fallback wrapper
// ────────────────────────────────────────────────────────────────────

/// Tries `primary` first; any error or empty result yields the bundled list.
pub struct FallbackCatalog<P> {
    primary: P,
    fallback: EmbeddedCatalog,
}

impl<P: RemoteCatalog> FallbackCatalog<P> {
    pub fn new(primary: P) -> Self {
        FallbackCatalog {
            primary,
            fallback: EmbeddedCatalog,
        }
    }
}

impl<P: RemoteCatalog> ModelCatalogProvider for FallbackCatalog<P> {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn fetch_models(&self, task: &str, search: &str) -> Vec<ModelDescriptor> {
        match self.primary.try_fetch(task, search) {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                warn!(
                    catalog = self.primary.name(),
                    task,
                    search,
                    "catalog returned no models, using bundled list"
                );
                self.fallback.fetch_models(task, search)
            }
            Err(err) => {
                warn!(
                    catalog = self.primary.name(),
                    error = %err,
                    "catalog unavailable, using bundled list"
                );
                self.fallback.fetch_models(task, search)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubCatalog(Result<Vec<ModelDescriptor>, u16>);

    impl RemoteCatalog for StubCatalog {
        fn name(&self) -> &str {
            "stub"
        }

        fn try_fetch(
            &self,
            _task: &str,
            _search: &str,
        ) -> Result<Vec<ModelDescriptor>, CatalogError> {
            self.0.clone().map_err(CatalogError::Status)
        }
    }

    /// Mount a fixed `/api/models` reply on a fresh mock server.
    async fn serve_fixed(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;
        server
    }

    async fn hits(server: &MockServer) -> usize {
        server.received_requests().await.unwrap_or_default().len()
    }

    /// The ureq client blocks, so it runs off the async test runtime.
    async fn fetch(
        catalog: HuggingFaceCatalog,
        search: &'static str,
    ) -> Result<Vec<ModelDescriptor>, CatalogError> {
        tokio::task::spawn_blocking(move || catalog.try_fetch("text-generation", search))
            .await
            .unwrap()
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(10), Duration::from_secs(8));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(&CatalogError::Status(429)));
        assert!(is_retryable(&CatalogError::Status(503)));
        assert!(is_retryable(&CatalogError::Http("reset".into())));
        assert!(!is_retryable(&CatalogError::Status(404)));
        assert!(!is_retryable(&CatalogError::Decode("bad".into())));
    }

    #[test]
    fn test_entry_params_from_safetensors_or_name() {
        let entry: HfModelEntry = serde_json::from_str(
            r#"{"id": "org/Some-Model", "downloads": 12, "safetensors": {"total": 7241732096}}"#,
        )
        .unwrap();
        let m = descriptor_from_entry(entry, "text-generation").unwrap();
        assert!((m.params_b() - 7.24).abs() < 0.01);
        assert_eq!(m.company(), "org");
        assert_eq!(m.max_context(), DEFAULT_MAX_CONTEXT);

        let named: HfModelEntry =
            serde_json::from_str(r#"{"id": "Qwen/Qwen2.5-1.5B-Instruct"}"#).unwrap();
        assert_eq!(descriptor_from_entry(named, "text-generation").unwrap().params_b(), 1.5);

        let unknown: HfModelEntry =
            serde_json::from_str(r#"{"id": "openai-community/gpt2"}"#).unwrap();
        assert!(descriptor_from_entry(unknown, "text-generation").is_none());
    }

    #[tokio::test]
    async fn test_fetch_parses_listing() {
        let server = serve_fixed(
            200,
            r#"[{"id": "meta-llama/Llama-3.1-8B-Instruct", "downloads": 500, "pipeline_tag": "text-generation"},
                {"id": "openai-community/gpt2", "downloads": 900}]"#,
        )
        .await;
        let catalog = HuggingFaceCatalog::new(server.uri()).with_retry(RetryPolicy::none());
        let models = fetch(catalog, "llama").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].params_b(), 8.0);
        assert_eq!(models[0].downloads(), 500);
        assert_eq!(hits(&server).await, 1);
    }

    #[tokio::test]
    async fn test_fetch_sends_listing_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .and(query_param("pipeline_tag", "text-generation"))
            .and(query_param("search", "qwen"))
            .and(query_param("sort", "downloads"))
            .and(query_param("limit", "5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"[{"id": "Qwen/Qwen2.5-7B"}]"#, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let catalog = HuggingFaceCatalog::new(server.uri())
            .with_retry(RetryPolicy::none())
            .with_limit(5);
        let models = fetch(catalog, " qwen ").await.unwrap();
        assert_eq!(models[0].id(), "Qwen/Qwen2.5-7B");
        assert_eq!(models[0].params_b(), 7.0);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = serve_fixed(404, r#"{"error": "not found"}"#).await;
        let retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let catalog = HuggingFaceCatalog::new(server.uri()).with_retry(retry);
        let err = fetch(catalog, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::Status(404)));
        assert_eq!(hits(&server).await, 1);
    }

    #[tokio::test]
    async fn test_server_error_retries_until_exhausted() {
        let server = serve_fixed(503, r#"{"error": "busy"}"#).await;
        let retry = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let catalog = HuggingFaceCatalog::new(server.uri()).with_retry(retry);
        let err = fetch(catalog, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::Exhausted { attempts: 3, .. }));
        assert_eq!(hits(&server).await, 3);
    }

    #[tokio::test]
    async fn test_too_many_requests_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"[{"id": "microsoft/phi-2-2.7b"}]"#, "application/json"),
            )
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        let catalog = HuggingFaceCatalog::new(server.uri()).with_retry(retry);
        let models = fetch(catalog, "").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(hits(&server).await, 2);
    }

    #[test]
    fn test_embedded_catalog_filters_and_falls_back() {
        let catalog = EmbeddedCatalog;
        let llamas = catalog.fetch_models("text-generation", "llama");
        assert!(!llamas.is_empty());
        assert!(llamas.iter().all(|m| m.matches("llama")));

        let embeddings = catalog.fetch_models("feature-extraction", "");
        assert!(embeddings.iter().all(|m| m.task() == "feature-extraction"));

        let nothing = catalog.fetch_models("text-generation", "zzz-no-such-model");
        assert_eq!(nothing.len(), models::embedded_models().len());
    }

    #[test]
    fn test_fallback_on_error_and_empty() {
        let failing = FallbackCatalog::new(StubCatalog(Err(503)));
        assert!(!failing.fetch_models("text-generation", "").is_empty());

        let empty = FallbackCatalog::new(StubCatalog(Ok(Vec::new())));
        assert!(!empty.fetch_models("text-generation", "").is_empty());

        let one = ModelDescriptor::new("a/b-7b", 7.0, 4096).unwrap();
        let live = FallbackCatalog::new(StubCatalog(Ok(vec![one.clone()])));
        assert_eq!(live.fetch_models("text-generation", ""), vec![one]);
    }
}
