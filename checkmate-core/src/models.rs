use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{LazyLock, OnceLock};

use crate::error::ModelError;

pub const DEFAULT_MAX_CONTEXT: u32 = 4096;
pub const DEFAULT_TASK: &str = "text-generation";

/// A model the engine can classify. Built through [`ModelDescriptor::new`]
/// or deserialization; both reject empty ids, non-positive parameter counts
/// and a zero context limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelDescriptor")]
pub struct ModelDescriptor {
    id: String,
    name: String,
    params_b: f64,
    max_context: u32,
    company: String,
    downloads: u64,
    task: String,
}

#[derive(Deserialize)]
struct RawModelDescriptor {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(alias = "params")]
    params_b: f64,
    #[serde(default, alias = "maxContext")]
    max_context: Option<u32>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    task: Option<String>,
}

impl TryFrom<RawModelDescriptor> for ModelDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawModelDescriptor) -> Result<Self, Self::Error> {
        let mut model = ModelDescriptor::new(
            raw.id,
            raw.params_b,
            raw.max_context.unwrap_or(DEFAULT_MAX_CONTEXT),
        )?;
        if let Some(name) = raw.name.filter(|n| !n.trim().is_empty()) {
            model.name = name;
        }
        if let Some(company) = raw.company {
            model.company = company;
        }
        if let Some(task) = raw.task {
            model.task = task;
        }
        model.downloads = raw.downloads;
        Ok(model)
    }
}

impl ModelDescriptor {
    /// Name defaults to the last path segment of the id and company to its
    /// owner ("meta-llama/Llama-3.1-8B" → "Llama-3.1-8B", "meta-llama").
    pub fn new(id: impl Into<String>, params_b: f64, max_context: u32) -> Result<Self, ModelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ModelError::EmptyId);
        }
        if !params_b.is_finite() || params_b <= 0.0 {
            return Err(ModelError::InvalidParams { id, value: params_b });
        }
        if max_context == 0 {
            return Err(ModelError::InvalidMaxContext { id });
        }
        let (company, name) = match id.split_once('/') {
            Some((owner, repo)) => (owner.to_string(), repo.to_string()),
            None => ("Unknown".to_string(), id.clone()),
        };
        Ok(ModelDescriptor {
            id,
            name,
            params_b,
            max_context,
            company,
            downloads: 0,
            task: DEFAULT_TASK.to_string(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_downloads(mut self, downloads: u64) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter count in billions.
    pub fn params_b(&self) -> f64 {
        self.params_b
    }

    pub fn max_context(&self) -> u32 {
        self.max_context
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn downloads(&self) -> u64 {
        self.downloads
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Short parameter label such as "7B", "1.5B" or "350M".
    pub fn params_label(&self) -> String {
        if self.params_b < 1.0 {
            format!("{}M", (self.params_b * 1000.0).round())
        } else if self.params_b.fract() == 0.0 {
            format!("{}B", self.params_b)
        } else {
            format!("{:.1}B", self.params_b)
        }
    }

    /// Name as used in runtime commands: lowercased, spaces become dashes.
    pub fn slug(&self) -> String {
        self.name
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.id.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
            || self.company.to_lowercase().contains(&q)
    }
}

/// Requested context length for a classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    context_window_tokens: u32,
}

impl RequestContext {
    pub fn new(context_window_tokens: u32) -> Result<Self, ModelError> {
        if context_window_tokens == 0 {
            return Err(ModelError::InvalidContextWindow);
        }
        Ok(RequestContext {
            context_window_tokens,
        })
    }

    pub fn tokens(&self) -> u32 {
        self.context_window_tokens
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext {
            context_window_tokens: DEFAULT_MAX_CONTEXT,
        }
    }
}

static PARAMS_IN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9.])(?:(\d+)x)?(\d+(?:\.\d+)?)([bm])(?:[^a-z0-9]|$)")
        .expect("parameter pattern is valid")
});

/// Extract a parameter count (billions) from a repo id or model name:
/// "Llama-3.1-8B" → 8, "Qwen2.5-1.5B" → 1.5, "Mixtral-8x7B" → 56,
/// "opt-350m" → 0.35. Returns `None` when nothing looks like a size.
pub fn parse_params_from_name(name: &str) -> Option<f64> {
    PARAMS_IN_NAME.captures_iter(name).find_map(|caps| {
        let value: f64 = caps.get(2)?.as_str().parse().ok()?;
        let experts: f64 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1.0);
        let divisor = match caps.get(3)?.as_str() {
            "m" | "M" => 1000.0,
            _ => 1.0,
        };
        let params = value * experts / divisor;
        (params > 0.0).then_some(params)
    })
}

// ────────────────────────────────────────────────────────────────────
// Bundled catalog
// ────────────────────────────────────────────────────────────────────

const FALLBACK_MODELS_JSON: &str = include_str!("../data/fallback_models.json");

/// The model list bundled into the binary, used when the live catalog is
/// unreachable and by the offline CLI commands.
pub fn embedded_models() -> &'static [ModelDescriptor] {
    static MODELS: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    MODELS.get_or_init(|| {
        serde_json::from_str(FALLBACK_MODELS_JSON)
            .expect("Failed to parse embedded fallback_models.json")
    })
}

/// Case-insensitive lookup by id or name. Exact matches come first.
pub fn find_models<'a>(models: &'a [ModelDescriptor], query: &str) -> Vec<&'a ModelDescriptor> {
    let q = query.trim().to_lowercase();
    let mut found: Vec<&ModelDescriptor> = models.iter().filter(|m| m.matches(&q)).collect();
    found.sort_by_key(|m| {
        let exact = m.id.to_lowercase() == q || m.name.to_lowercase() == q;
        !exact
    });
    found
}
