//! Compatibility scoring: maps a hardware profile, a model and a context
//! length onto a tier, GPU offload share, fine-tuning verdict, predicted
//! throughput and a runtime recommendation.
//!
//! Everything here is a pure function of its inputs. Inputs are validated by
//! their constructors, so nothing in this module can fail.

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::hardware::{HardwareProfile, Vendor};
use crate::models::{ModelDescriptor, RequestContext};

// ────────────────────────────────────────────────────────────────────
// Calibration
// ────────────────────────────────────────────────────────────────────

/// GB of weights per billion parameters at each precision.
pub const INT4_GB_PER_B: f64 = 0.70;
pub const INT8_GB_PER_B: f64 = 1.30;
pub const FP16_GB_PER_B: f64 = 2.20;

/// KV cache reference point: a 7B model at 4096 tokens holds 0.5 GB.
pub const KV_REFERENCE_PARAMS_B: f64 = 7.0;
pub const KV_REFERENCE_CONTEXT: f64 = 4096.0;
pub const KV_REFERENCE_GB: f64 = 0.5;

/// OS and runtime slack for split GPU/CPU inference.
pub const HYBRID_OVERHEAD_GB: f64 = 4.0;
/// ~2-bit weights, the floor for anything that still runs locally.
pub const EXPERIMENTAL_GB_PER_B: f64 = 0.5;
pub const EXPERIMENTAL_OVERHEAD_GB: f64 = 1.0;
/// Below this GPU share a hybrid run is reported as CPU-bound.
pub const CPU_BOTTLENECK_OFFLOAD_PCT: u8 = 20;

pub const QLORA_GB_PER_B: f64 = 0.6;
pub const QLORA_OVERHEAD_GB: f64 = 2.0;
pub const FULL_FINE_TUNE_OVERHEAD_GB: f64 = 8.0;
pub const APPLE_UNIFIED_HEADROOM_GB: f64 = 4.0;

pub const BASE_TPS: f64 = 80.0;
pub const APPLE_TPS_FACTOR: f64 = 0.7;
pub const HYBRID_TPS_FLOOR: f64 = 5.0;
pub const HYBRID_TPS_RANGE: f64 = 20.0;
pub const CPU_TPS_FLOOR: f64 = 1.2;
pub const CPU_TPS_RAM_SCALE_GB: f64 = 128.0;
pub const CPU_TPS_RANGE: f64 = 2.0;

// ────────────────────────────────────────────────────────────────────
// Tiers
// ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    #[serde(rename = "Native Performance")]
    NativePerformance,
    #[serde(rename = "Optimized Local")]
    OptimizedLocal,
    #[serde(rename = "Hybrid Offload")]
    HybridOffload,
    #[serde(rename = "CPU Bottleneck")]
    CpuBottleneck,
    #[serde(rename = "Experimental")]
    Experimental,
    #[serde(rename = "Cloud Only")]
    CloudOnly,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::NativePerformance,
        Tier::OptimizedLocal,
        Tier::HybridOffload,
        Tier::CpuBottleneck,
        Tier::Experimental,
        Tier::CloudOnly,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::NativePerformance => "Native Performance",
            Tier::OptimizedLocal => "Optimized Local",
            Tier::HybridOffload => "Hybrid Offload",
            Tier::CpuBottleneck => "CPU Bottleneck",
            Tier::Experimental => "Experimental",
            Tier::CloudOnly => "Cloud Only",
        }
    }

    /// Desirability, higher is better. Hybrid and CPU Bottleneck share a
    /// rank: the relabel only reflects how much of the model sits on the GPU.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::NativePerformance => 4,
            Tier::OptimizedLocal => 3,
            Tier::HybridOffload | Tier::CpuBottleneck => 2,
            Tier::Experimental => 1,
            Tier::CloudOnly => 0,
        }
    }

    pub fn at_least(&self, min: Tier) -> bool {
        self.rank() >= min.rank()
    }

    pub fn is_local(&self) -> bool {
        *self != Tier::CloudOnly
    }

    pub fn severity(&self) -> Severity {
        match self {
            Tier::NativePerformance | Tier::OptimizedLocal => Severity::Ok,
            Tier::HybridOffload => Severity::Notice,
            Tier::CpuBottleneck | Tier::Experimental => Severity::Warning,
            Tier::CloudOnly => Severity::Critical,
        }
    }

    /// Accepts labels and short forms ("native", "optimized", "hybrid",
    /// "cpu", "experimental", "cloud").
    pub fn parse(s: &str) -> Option<Tier> {
        let key: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "native" | "nativeperformance" => Some(Tier::NativePerformance),
            "optimized" | "optimizedlocal" | "local" => Some(Tier::OptimizedLocal),
            "hybrid" | "hybridoffload" => Some(Tier::HybridOffload),
            "cpu" | "cpubottleneck" => Some(Tier::CpuBottleneck),
            "experimental" => Some(Tier::Experimental),
            "cloud" | "cloudonly" => Some(Tier::CloudOnly),
            _ => None,
        }
    }
}

/// How urgently the display layer should flag a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Notice,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FineTuningVerdict {
    #[serde(rename = "Not Feasible")]
    NotFeasible,
    #[serde(rename = "QLoRA")]
    QLoRA,
    #[serde(rename = "Full Fine-Tuning")]
    FullFineTuning,
    #[serde(rename = "Apple Unified")]
    AppleUnified,
}

impl FineTuningVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            FineTuningVerdict::NotFeasible => "Not Feasible",
            FineTuningVerdict::QLoRA => "QLoRA",
            FineTuningVerdict::FullFineTuning => "Full Fine-Tuning",
            FineTuningVerdict::AppleUnified => "Apple Unified",
        }
    }

    pub fn is_feasible(&self) -> bool {
        *self != FineTuningVerdict::NotFeasible
    }
}

/// Predicted generation speed. Serialized as a bare number, or `"N/A"` for
/// models that cannot run locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    TokensPerSecond(f64),
    NotApplicable,
}

impl Throughput {
    pub fn value(&self) -> Option<f64> {
        match self {
            Throughput::TokensPerSecond(tps) => Some(*tps),
            Throughput::NotApplicable => None,
        }
    }
}

impl std::fmt::Display for Throughput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Throughput::TokensPerSecond(tps) => write!(f, "{tps} tok/s"),
            Throughput::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Throughput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Throughput::TokensPerSecond(tps) => serializer.serialize_f64(*tps),
            Throughput::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

/// Weight footprint at the three precisions the engine considers, in GB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightSizes {
    pub fp16: f64,
    pub int8: f64,
    pub int4: f64,
}

impl WeightSizes {
    pub fn for_params(params_b: f64) -> Self {
        WeightSizes {
            fp16: params_b * FP16_GB_PER_B,
            int8: params_b * INT8_GB_PER_B,
            int4: params_b * INT4_GB_PER_B,
        }
    }

    fn rounded(&self) -> Self {
        WeightSizes {
            fp16: round2(self.fp16),
            int8: round2(self.int8),
            int4: round2(self.int4),
        }
    }
}

/// KV cache estimate in GB for `params_b` at `context_tokens`.
pub fn context_buffer_gb(params_b: f64, context_tokens: u32) -> f64 {
    (params_b / KV_REFERENCE_PARAMS_B)
        * (context_tokens as f64 / KV_REFERENCE_CONTEXT)
        * KV_REFERENCE_GB
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityResult {
    pub model_id: String,
    pub model_name: String,
    pub params_b: f64,
    pub downloads: u64,
    pub tier: Tier,
    pub gpu_offload_percent: u8,
    pub fine_tuning: FineTuningVerdict,
    pub predicted_tps: Throughput,
    pub weight_size_gb: WeightSizes,
    pub context_buffer_gb: f64,
    pub context_window_tokens: u32,
    pub max_context: u32,
    pub is_over_context_limit: bool,
    pub severity: Severity,
    pub reasoning: String,
    pub recommended_strategy: String,
    pub optimized_command: String,
}

// ────────────────────────────────────────────────────────────────────
// Tier cascade
// ────────────────────────────────────────────────────────────────────

/// Memory picture for one (hardware, model, context) triple.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub vram_gb: f64,
    pub ram_gb: f64,
    pub params_b: f64,
    pub weights: WeightSizes,
    pub context_buffer_gb: f64,
}

impl Budget {
    pub fn new(hw: &HardwareProfile, model: &ModelDescriptor, ctx: RequestContext) -> Self {
        Budget {
            vram_gb: hw.vram_gb(),
            ram_gb: hw.ram_gb(),
            params_b: model.params_b(),
            weights: WeightSizes::for_params(model.params_b()),
            context_buffer_gb: context_buffer_gb(model.params_b(), ctx.tokens()),
        }
    }
}

pub struct TierRule {
    pub tier: Tier,
    pub admits: fn(&Budget) -> bool,
}

/// Evaluated top to bottom; the first rule that admits the budget wins.
/// Exact equality qualifies for the better tier.
pub const TIER_RULES: &[TierRule] = &[
    TierRule {
        tier: Tier::NativePerformance,
        admits: |b| b.vram_gb >= b.weights.int8 + b.context_buffer_gb,
    },
    TierRule {
        tier: Tier::OptimizedLocal,
        admits: |b| b.vram_gb >= b.weights.int4 + b.context_buffer_gb,
    },
    TierRule {
        tier: Tier::HybridOffload,
        admits: |b| {
            b.vram_gb + b.ram_gb >= b.weights.int4 + b.context_buffer_gb + HYBRID_OVERHEAD_GB
        },
    },
    TierRule {
        tier: Tier::Experimental,
        admits: |b| {
            b.ram_gb + b.vram_gb
                >= b.params_b * EXPERIMENTAL_GB_PER_B
                    + b.context_buffer_gb
                    + EXPERIMENTAL_OVERHEAD_GB
        },
    },
    TierRule {
        tier: Tier::CloudOnly,
        admits: |_| true,
    },
];

/// Share of the 4-bit weights that fits in VRAM after the context buffer.
pub fn hybrid_offload_percent(budget: &Budget) -> u8 {
    let usable = (budget.vram_gb - budget.context_buffer_gb).max(0.0);
    let pct = (usable / budget.weights.int4 * 100.0).min(100.0);
    pct.round() as u8
}

/// Tier and GPU offload share for a budget.
pub fn tier_for(budget: &Budget) -> (Tier, u8) {
    let tier = TIER_RULES
        .iter()
        .find(|rule| (rule.admits)(budget))
        .map(|rule| rule.tier)
        .unwrap_or(Tier::CloudOnly);

    match tier {
        Tier::NativePerformance | Tier::OptimizedLocal => (tier, 100),
        Tier::HybridOffload => {
            let offload = hybrid_offload_percent(budget);
            if offload < CPU_BOTTLENECK_OFFLOAD_PCT && budget.vram_gb > 0.0 {
                (Tier::CpuBottleneck, offload)
            } else {
                (Tier::HybridOffload, offload)
            }
        }
        _ => (tier, 0),
    }
}

/// Minimum VRAM for QLoRA: 4-bit weights, adapter/optimizer state and slack.
pub fn qlora_min_vram_gb(params_b: f64) -> f64 {
    params_b * INT4_GB_PER_B + params_b * QLORA_GB_PER_B + QLORA_OVERHEAD_GB
}

pub fn fine_tuning_verdict(hw: &HardwareProfile, params_b: f64) -> FineTuningVerdict {
    let qlora_min = qlora_min_vram_gb(params_b);
    let full_min = params_b * FP16_GB_PER_B + FULL_FINE_TUNE_OVERHEAD_GB;

    if hw.vram_gb() >= full_min {
        FineTuningVerdict::FullFineTuning
    } else if hw.vram_gb() >= qlora_min {
        FineTuningVerdict::QLoRA
    } else if hw.is_darwin() && hw.ram_gb() >= qlora_min + APPLE_UNIFIED_HEADROOM_GB {
        FineTuningVerdict::AppleUnified
    } else {
        FineTuningVerdict::NotFeasible
    }
}

pub fn predicted_throughput(
    tier: Tier,
    offload_pct: u8,
    hw: &HardwareProfile,
    params_b: f64,
) -> Throughput {
    let tps = match tier {
        Tier::NativePerformance | Tier::OptimizedLocal => {
            let factor = if hw.vendor() == Vendor::Apple {
                APPLE_TPS_FACTOR
            } else {
                1.0
            };
            (BASE_TPS / (params_b / KV_REFERENCE_PARAMS_B) * factor).round()
        }
        Tier::HybridOffload => {
            (HYBRID_TPS_FLOOR + offload_pct as f64 / 100.0 * HYBRID_TPS_RANGE).round()
        }
        Tier::CpuBottleneck | Tier::Experimental => {
            round1(CPU_TPS_FLOOR + hw.ram_gb() / CPU_TPS_RAM_SCALE_GB * CPU_TPS_RANGE)
        }
        Tier::CloudOnly => return Throughput::NotApplicable,
    };
    Throughput::TokensPerSecond(tps)
}

// ────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────

/// Runtime suggestion for every tier and vendor pairing.
pub fn recommended_strategy(tier: Tier, vendor: Vendor) -> &'static str {
    match (tier, vendor) {
        (Tier::NativePerformance, Vendor::Nvidia) => {
            "vLLM / Hugging Face Transformers (FP16/INT8, CUDA)"
        }
        (Tier::NativePerformance, Vendor::Amd) => "vLLM on ROCm (FP16/INT8)",
        (Tier::NativePerformance, Vendor::Apple) => "MLX (8-bit)",
        (Tier::NativePerformance, Vendor::Intel) => "llama.cpp with SYCL (Q8_0)",
        (Tier::NativePerformance, Vendor::General) => "Ollama (Q8_0)",
        (Tier::OptimizedLocal, Vendor::Nvidia) => "Ollama / llama.cpp with CUDA (Q4_K_M)",
        (Tier::OptimizedLocal, Vendor::Amd) => "Ollama with ROCm (Q4_K_M)",
        (Tier::OptimizedLocal, Vendor::Apple) => "Ollama / MLX with Metal (4-bit)",
        (Tier::OptimizedLocal, Vendor::Intel) => "llama.cpp with SYCL (Q4_K_M)",
        (Tier::OptimizedLocal, Vendor::General) => "Ollama (Q4_K_M)",
        (Tier::HybridOffload, Vendor::Nvidia) => "llama.cpp, partial CUDA offload (Q4_K_M)",
        (Tier::HybridOffload, Vendor::Amd) => "llama.cpp, partial ROCm offload (Q4_K_M)",
        (Tier::HybridOffload, Vendor::Apple) => "llama.cpp with Metal, unified memory (Q4_K_M)",
        (Tier::HybridOffload, Vendor::Intel | Vendor::General) => {
            "llama.cpp, partial GPU offload (Q4_K_M)"
        }
        (Tier::CpuBottleneck, _) => "llama.cpp, mostly CPU (Q4_K_M, few GPU layers)",
        (Tier::Experimental, _) => "llama.cpp CPU only (Q2_K / IQ2, expect low quality)",
        (Tier::CloudOnly, _) => "Hosted inference (Hugging Face Inference Endpoints or similar)",
    }
}

/// Approximate transformer block count, for turning an offload share into
/// llama.cpp `--n-gpu-layers`.
pub fn estimated_layer_count(params_b: f64) -> u32 {
    match params_b {
        p if p <= 3.0 => 28,
        p if p <= 8.0 => 32,
        p if p <= 14.0 => 40,
        p if p <= 34.0 => 60,
        p if p <= 72.0 => 80,
        _ => 96,
    }
}

pub fn gpu_layers_for_offload(params_b: f64, offload_pct: u8) -> u32 {
    (estimated_layer_count(params_b) as f64 * offload_pct as f64 / 100.0).round() as u32
}

/// Ready-to-run command line. Ollama and llama.cpp commands address the
/// model by its slug; vLLM and MLX take the repository id.
pub fn optimized_command(
    tier: Tier,
    vendor: Vendor,
    model: &ModelDescriptor,
    ctx: RequestContext,
    offload_pct: u8,
) -> String {
    let slug = model.slug();
    let tokens = ctx.tokens();
    match (tier, vendor) {
        (Tier::NativePerformance, Vendor::Nvidia | Vendor::Amd) => format!(
            "vllm serve {} --max-model-len {tokens} --dtype float16",
            model.id()
        ),
        (Tier::NativePerformance, Vendor::Apple) => {
            format!("mlx_lm.server --model {} --max-kv-size {tokens}", model.id())
        }
        (Tier::NativePerformance, Vendor::Intel | Vendor::General) => {
            format!("OLLAMA_CONTEXT_LENGTH={tokens} ollama run {slug}:q8_0")
        }
        (Tier::OptimizedLocal, _) => {
            format!("OLLAMA_CONTEXT_LENGTH={tokens} ollama run {slug}:q4_K_M")
        }
        (Tier::HybridOffload | Tier::CpuBottleneck, _) => format!(
            "llama-server -m {slug}.Q4_K_M.gguf -c {tokens} --n-gpu-layers {}",
            gpu_layers_for_offload(model.params_b(), offload_pct)
        ),
        (Tier::Experimental, _) => {
            format!("llama-server -m {slug}.Q2_K.gguf -c {tokens} --n-gpu-layers 0")
        }
        (Tier::CloudOnly, _) => format!(
            "curl -H \"Authorization: Bearer $HF_TOKEN\" https://api-inference.huggingface.co/models/{}",
            model.id()
        ),
    }
}

fn reasoning(
    tier: Tier,
    offload_pct: u8,
    hw: &HardwareProfile,
    budget: &Budget,
    model: &ModelDescriptor,
    ctx: RequestContext,
) -> String {
    let gpu = if hw.gpu_name().is_empty() {
        "the GPU".to_string()
    } else {
        hw.gpu_name().to_string()
    };
    let buf = budget.context_buffer_gb;
    let w = budget.weights;

    let mut text = match tier {
        Tier::NativePerformance => format!(
            "Fits entirely in {:.1} GB of VRAM on {gpu} at INT8 ({:.1} GB incl. {:.1} GB context buffer).",
            hw.vram_gb(),
            w.int8 + buf,
            buf
        ),
        Tier::OptimizedLocal => format!(
            "Fits in {:.1} GB of VRAM on {gpu} at 4-bit ({:.1} GB incl. context); INT8 would need {:.1} GB.",
            hw.vram_gb(),
            w.int4 + buf,
            w.int8 + buf
        ),
        Tier::HybridOffload => format!(
            "Needs {:.1} GB at 4-bit, more than {:.1} GB of VRAM; {offload_pct}% of the weights run on {gpu}, the rest from {:.1} GB of system RAM.",
            w.int4 + buf,
            hw.vram_gb(),
            hw.ram_gb()
        ),
        Tier::CpuBottleneck => format!(
            "Only {offload_pct}% of the 4-bit weights fit on {gpu}; generation is bound by the CPU and {:.1} GB of system RAM.",
            hw.ram_gb()
        ),
        Tier::Experimental => format!(
            "Only runs with ~2-bit quantization from {:.1} GB of combined memory; expect degraded quality and speed.",
            hw.ram_gb() + hw.vram_gb()
        ),
        Tier::CloudOnly => format!(
            "Needs at least {:.1} GB even at ~2-bit, beyond the {:.1} GB of combined RAM and VRAM.",
            budget.params_b * EXPERIMENTAL_GB_PER_B + buf + EXPERIMENTAL_OVERHEAD_GB,
            hw.ram_gb() + hw.vram_gb()
        ),
    };

    if ctx.tokens() > model.max_context() {
        text.push_str(&format!(
            " Requested context of {} tokens exceeds the model's limit of {} tokens.",
            ctx.tokens(),
            model.max_context()
        ));
    }
    text
}

// ────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────

pub fn classify(
    hw: &HardwareProfile,
    model: &ModelDescriptor,
    ctx: RequestContext,
) -> CompatibilityResult {
    let budget = Budget::new(hw, model, ctx);
    let (tier, offload) = tier_for(&budget);
    let is_over_context_limit = ctx.tokens() > model.max_context();

    let mut severity = tier.severity();
    if is_over_context_limit {
        severity = severity.max(Severity::Warning);
    }

    CompatibilityResult {
        model_id: model.id().to_string(),
        model_name: model.name().to_string(),
        params_b: model.params_b(),
        downloads: model.downloads(),
        tier,
        gpu_offload_percent: offload,
        fine_tuning: fine_tuning_verdict(hw, model.params_b()),
        predicted_tps: predicted_throughput(tier, offload, hw, model.params_b()),
        weight_size_gb: budget.weights.rounded(),
        context_buffer_gb: round2(budget.context_buffer_gb),
        context_window_tokens: ctx.tokens(),
        max_context: model.max_context(),
        is_over_context_limit,
        severity,
        reasoning: reasoning(tier, offload, hw, &budget, model, ctx),
        recommended_strategy: recommended_strategy(tier, hw.vendor()).to_string(),
        optimized_command: optimized_command(tier, hw.vendor(), model, ctx, offload),
    }
}

/// Classify every model, preserving input order.
pub fn classify_all(
    hw: &HardwareProfile,
    models: &[ModelDescriptor],
    ctx: RequestContext,
) -> Vec<CompatibilityResult> {
    debug!(
        models = models.len(),
        context = ctx.tokens(),
        "classifying catalog"
    );
    models.iter().map(|m| classify(hw, m, ctx)).collect()
}

// ────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────

/// Column to order results by in the table and TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Tier,
    Params,
    Speed,
    Downloads,
}

impl SortColumn {
    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Tier => "Tier",
            SortColumn::Params => "Params",
            SortColumn::Speed => "Speed",
            SortColumn::Downloads => "Downloads",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortColumn::Tier => SortColumn::Params,
            SortColumn::Params => SortColumn::Speed,
            SortColumn::Speed => SortColumn::Downloads,
            SortColumn::Downloads => SortColumn::Tier,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tier" | "fit" => Some(SortColumn::Tier),
            "params" | "size" => Some(SortColumn::Params),
            "speed" | "tps" => Some(SortColumn::Speed),
            "downloads" | "popular" => Some(SortColumn::Downloads),
            _ => None,
        }
    }
}

fn desc_f64(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

/// Order results for display. Cloud Only always sorts last regardless of
/// column; ties fall back to the better tier, then the larger model.
pub fn rank_results(
    results: Vec<CompatibilityResult>,
    sort: SortColumn,
) -> Vec<CompatibilityResult> {
    let mut ranked = results;
    ranked.sort_by(|a, b| {
        match (a.tier.is_local(), b.tier.is_local()) {
            (true, false) => return std::cmp::Ordering::Less,
            (false, true) => return std::cmp::Ordering::Greater,
            _ => {}
        }

        let by_tier = b.tier.rank().cmp(&a.tier.rank());
        let by_params = desc_f64(a.params_b, b.params_b);

        let primary = match sort {
            SortColumn::Tier => by_tier,
            SortColumn::Params => by_params,
            SortColumn::Speed => desc_f64(
                a.predicted_tps.value().unwrap_or(-1.0),
                b.predicted_tps.value().unwrap_or(-1.0),
            ),
            SortColumn::Downloads => b.downloads.cmp(&a.downloads),
        };
        primary.then(by_tier).then(by_params)
    });
    ranked
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────

    fn hw(ram: f64, vram: f64) -> HardwareProfile {
        HardwareProfile::new(ram, vram, 0.0)
            .unwrap()
            .with_platform("linux")
            .with_vendor(Vendor::Nvidia)
    }

    fn model(params: f64, max_context: u32) -> ModelDescriptor {
        ModelDescriptor::new("test-org/Test-Model", params, max_context)
            .unwrap()
            .with_name("Test Model")
    }

    fn ctx(tokens: u32) -> RequestContext {
        RequestContext::new(tokens).unwrap()
    }

    // ────────────────────────────────────────────────────────────────────
    // Scenarios
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_7b_on_8gb_is_optimized_local() {
        let r = classify(&hw(16.0, 8.0), &model(7.0, 8192), ctx(4096));
        assert_eq!(r.weight_size_gb.int4, 4.9);
        assert_eq!(r.weight_size_gb.int8, 9.1);
        assert_eq!(r.context_buffer_gb, 0.5);
        assert_eq!(r.tier, Tier::OptimizedLocal);
        assert_eq!(r.gpu_offload_percent, 100);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(80.0));
        assert_eq!(r.severity, Severity::Ok);
        assert!(!r.is_over_context_limit);
    }

    #[test]
    fn test_70b_on_small_machine_is_cloud_only() {
        let r = classify(&hw(8.0, 0.0), &model(70.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::CloudOnly);
        assert_eq!(r.gpu_offload_percent, 0);
        assert_eq!(r.predicted_tps, Throughput::NotApplicable);
        assert_eq!(r.fine_tuning, FineTuningVerdict::NotFeasible);
        assert_eq!(r.severity, Severity::Critical);
    }

    #[test]
    fn test_native_performance() {
        let r = classify(&hw(32.0, 24.0), &model(7.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::NativePerformance);
        assert_eq!(r.gpu_offload_percent, 100);
        assert!(r.optimized_command.starts_with("vllm serve test-org/Test-Model"));
    }

    #[test]
    fn test_hybrid_offload_percent() {
        // 14B: int4 9.8, buffer 1.0; 8 GB VRAM leaves 7 GB -> 71%
        let r = classify(&hw(32.0, 8.0), &model(14.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::HybridOffload);
        assert_eq!(r.gpu_offload_percent, 71);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(19.0));
        assert_eq!(r.severity, Severity::Notice);
        assert!(r.optimized_command.contains("--n-gpu-layers 28"));
    }

    #[test]
    fn test_low_offload_relabels_to_cpu_bottleneck() {
        // 70B: int4 49, buffer 5; 2 GB VRAM -> offload 0, vram > 0
        let r = classify(&hw(64.0, 2.0), &model(70.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::CpuBottleneck);
        assert!(r.gpu_offload_percent < CPU_BOTTLENECK_OFFLOAD_PCT);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(2.2));
        assert_eq!(r.severity, Severity::Warning);
    }

    #[test]
    fn test_no_vram_stays_hybrid() {
        let r = classify(&hw(64.0, 0.0), &model(7.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::HybridOffload);
        assert_eq!(r.gpu_offload_percent, 0);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(5.0));
    }

    #[test]
    fn test_experimental_tier() {
        // 34B: int4 23.8 + 2.43 + 4 > 24; 17 + 2.43 + 1 <= 24
        let r = classify(&hw(24.0, 0.0), &model(34.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::Experimental);
        assert_eq!(r.gpu_offload_percent, 0);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(1.6));
    }

    // ────────────────────────────────────────────────────────────────────
    // Boundaries and context
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_exact_boundary_qualifies_for_better_tier() {
        // 10B at 4096 tokens: int8 13.0, buffer 5/7
        let m = model(10.0, 8192);
        let exact = 10.0 * INT8_GB_PER_B + context_buffer_gb(10.0, 4096);
        let at = classify(&hw(0.0, exact), &m, ctx(4096));
        assert_eq!(at.tier, Tier::NativePerformance);

        let below = classify(&hw(0.0, exact - 1e-9), &m, ctx(4096));
        assert_eq!(below.tier, Tier::OptimizedLocal);
    }

    #[test]
    fn test_context_overrun_does_not_change_tier() {
        let r = classify(&hw(64.0, 48.0), &model(7.0, 8192), ctx(16384));
        assert_eq!(r.tier, Tier::NativePerformance);
        assert!(r.is_over_context_limit);
        assert_eq!(r.severity, Severity::Warning);
        assert!(r.reasoning.contains("exceeds the model's limit of 8192"));
    }

    #[test]
    fn test_context_overrun_keeps_critical() {
        let r = classify(&hw(4.0, 0.0), &model(70.0, 2048), ctx(4096));
        assert!(r.is_over_context_limit);
        assert_eq!(r.severity, Severity::Critical);
    }

    #[test]
    fn test_longer_context_grows_buffer() {
        let short = classify(&hw(16.0, 8.0), &model(7.0, 32768), ctx(4096));
        let long = classify(&hw(16.0, 8.0), &model(7.0, 32768), ctx(32768));
        assert_eq!(long.context_buffer_gb, 4.0);
        assert!(long.tier.rank() < short.tier.rank());
    }

    // ────────────────────────────────────────────────────────────────────
    // Fine-tuning and throughput
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_fine_tuning_levels() {
        // 7B: qlora_min 11.1, full 23.4
        assert_eq!(
            fine_tuning_verdict(&hw(16.0, 8.0), 7.0),
            FineTuningVerdict::NotFeasible
        );
        assert_eq!(
            fine_tuning_verdict(&hw(16.0, 12.0), 7.0),
            FineTuningVerdict::QLoRA
        );
        assert_eq!(
            fine_tuning_verdict(&hw(32.0, 24.0), 7.0),
            FineTuningVerdict::FullFineTuning
        );
    }

    #[test]
    fn test_apple_unified_fine_tuning_needs_darwin() {
        let mac = HardwareProfile::new(64.0, 0.0, 64.0)
            .unwrap()
            .with_platform("macOS")
            .with_vendor(Vendor::Apple);
        assert_eq!(fine_tuning_verdict(&mac, 7.0), FineTuningVerdict::AppleUnified);

        let linux = HardwareProfile::new(64.0, 0.0, 0.0)
            .unwrap()
            .with_platform("linux");
        assert_eq!(fine_tuning_verdict(&linux, 7.0), FineTuningVerdict::NotFeasible);
    }

    #[test]
    fn test_apple_throughput_factor() {
        let mac = HardwareProfile::new(64.0, 16.0, 0.0)
            .unwrap()
            .with_platform("darwin")
            .with_vendor(Vendor::Apple);
        let r = classify(&mac, &model(7.0, 8192), ctx(4096));
        assert_eq!(r.tier, Tier::NativePerformance);
        assert_eq!(r.predicted_tps, Throughput::TokensPerSecond(56.0));
        assert!(r.optimized_command.starts_with("mlx_lm.server"));
    }

    #[test]
    fn test_throughput_serializes_number_or_na() {
        assert_eq!(
            serde_json::to_string(&Throughput::TokensPerSecond(42.0)).unwrap(),
            "42.0"
        );
        assert_eq!(
            serde_json::to_string(&Throughput::NotApplicable).unwrap(),
            "\"N/A\""
        );
    }

    // ────────────────────────────────────────────────────────────────────
    // Recommendations
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_strategy_and_command_are_total() {
        let m = model(7.0, 8192);
        for tier in Tier::ALL {
            for vendor in Vendor::ALL {
                assert!(!recommended_strategy(tier, vendor).is_empty());
                let cmd = optimized_command(tier, vendor, &m, ctx(4096), 50);
                assert!(!cmd.is_empty());
                assert_eq!(cmd, optimized_command(tier, vendor, &m, ctx(4096), 50));
            }
        }
    }

    #[test]
    fn test_command_uses_slug() {
        let m = ModelDescriptor::new("a/b", 7.0, 8192)
            .unwrap()
            .with_name("Mistral 7B Instruct");
        let cmd = optimized_command(Tier::OptimizedLocal, Vendor::Nvidia, &m, ctx(8192), 100);
        assert_eq!(
            cmd,
            "OLLAMA_CONTEXT_LENGTH=8192 ollama run mistral-7b-instruct:q4_K_M"
        );
    }

    #[test]
    fn test_layer_estimate() {
        assert_eq!(estimated_layer_count(1.5), 28);
        assert_eq!(estimated_layer_count(7.0), 32);
        assert_eq!(estimated_layer_count(70.0), 80);
        assert_eq!(estimated_layer_count(180.0), 96);
        assert_eq!(gpu_layers_for_offload(7.0, 50), 16);
        assert_eq!(gpu_layers_for_offload(7.0, 0), 0);
    }

    // ────────────────────────────────────────────────────────────────────
    // Tier helpers and ranking
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_tier_rank_and_parse() {
        assert_eq!(Tier::HybridOffload.rank(), Tier::CpuBottleneck.rank());
        assert!(Tier::NativePerformance.at_least(Tier::OptimizedLocal));
        assert!(Tier::CpuBottleneck.at_least(Tier::HybridOffload));
        assert!(!Tier::Experimental.at_least(Tier::HybridOffload));
        assert_eq!(Tier::parse("Optimized Local"), Some(Tier::OptimizedLocal));
        assert_eq!(Tier::parse("cpu-bottleneck"), Some(Tier::CpuBottleneck));
        assert_eq!(Tier::parse("great"), None);
    }

    #[test]
    fn test_rank_results_puts_cloud_last() {
        let h = hw(16.0, 8.0);
        let models = vec![
            model(70.0, 8192).with_downloads(9_000_000),
            model(1.0, 8192).with_downloads(10),
            model(7.0, 8192).with_downloads(1_000),
        ];
        let results = classify_all(&h, &models, ctx(4096));
        assert_eq!(results[0].params_b, 70.0);

        for sort in [
            SortColumn::Tier,
            SortColumn::Params,
            SortColumn::Speed,
            SortColumn::Downloads,
        ] {
            let ranked = rank_results(results.clone(), sort);
            assert_eq!(ranked.last().unwrap().tier, Tier::CloudOnly, "{sort:?}");
        }

        let by_downloads = rank_results(results.clone(), SortColumn::Downloads);
        assert_eq!(by_downloads[0].params_b, 7.0);

        let by_tier = rank_results(results, SortColumn::Tier);
        assert_eq!(by_tier[0].params_b, 1.0);
        assert_eq!(by_tier[0].tier, Tier::NativePerformance);
    }

    #[test]
    fn test_sort_column_cycles() {
        let mut col = SortColumn::Tier;
        for _ in 0..4 {
            col = col.next();
        }
        assert_eq!(col, SortColumn::Tier);
        assert_eq!(SortColumn::parse("TPS"), Some(SortColumn::Speed));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let h = hw(32.0, 8.0);
        let m = model(13.0, 4096);
        assert_eq!(classify(&h, &m, ctx(8192)), classify(&h, &m, ctx(8192)));
    }

    // ────────────────────────────────────────────────────────────────────
    // Properties
    // ────────────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_more_vram_never_worsens_tier(
            ram in 0.0f64..256.0,
            vram in 0.0f64..96.0,
            extra in 0.0f64..64.0,
            params in 0.1f64..200.0,
            tokens in 1u32..65536,
        ) {
            let m = model(params, 8192);
            let base = classify(&hw(ram, vram), &m, ctx(tokens));
            let more = classify(&hw(ram, vram + extra), &m, ctx(tokens));
            prop_assert!(more.tier.rank() >= base.tier.rank());
        }

        #[test]
        fn prop_more_ram_never_worsens_tier(
            ram in 0.0f64..256.0,
            vram in 0.0f64..96.0,
            extra in 0.0f64..128.0,
            params in 0.1f64..200.0,
            tokens in 1u32..65536,
        ) {
            let m = model(params, 8192);
            let base = classify(&hw(ram, vram), &m, ctx(tokens));
            let more = classify(&hw(ram + extra, vram), &m, ctx(tokens));
            prop_assert!(more.tier.rank() >= base.tier.rank());
        }

        #[test]
        fn prop_offload_is_bounded(
            ram in 0.0f64..256.0,
            vram in 0.0f64..96.0,
            params in 0.1f64..200.0,
            tokens in 1u32..65536,
        ) {
            let r = classify(&hw(ram, vram), &model(params, 8192), ctx(tokens));
            prop_assert!(r.gpu_offload_percent <= 100);
            match r.tier {
                Tier::NativePerformance | Tier::OptimizedLocal => {
                    prop_assert_eq!(r.gpu_offload_percent, 100);
                }
                Tier::Experimental | Tier::CloudOnly => {
                    prop_assert_eq!(r.gpu_offload_percent, 0);
                }
                _ => {}
            }
        }

        #[test]
        fn prop_max_context_never_affects_tier(
            ram in 0.0f64..256.0,
            vram in 0.0f64..96.0,
            params in 0.1f64..200.0,
            tokens in 1u32..65536,
            max_a in 1u32..200_000,
            max_b in 1u32..200_000,
        ) {
            let h = hw(ram, vram);
            let a = classify(&h, &model(params, max_a), ctx(tokens));
            let b = classify(&h, &model(params, max_b), ctx(tokens));
            prop_assert_eq!(a.tier, b.tier);
            prop_assert_eq!(a.gpu_offload_percent, b.gpu_offload_percent);
        }
    }
}
