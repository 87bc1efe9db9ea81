use checkmate_core::engine::{CompatibilityResult, Severity, Tier, round1, round2};
use checkmate_core::hardware::{HardwareInput, HardwareProfile, LocalSystem, is_running_in_wsl};
use checkmate_core::models::{ModelDescriptor, RequestContext};
use checkmate_core::report::DeviceReport;
use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Params")]
    params: String,
    #[tabled(rename = "GPU %")]
    offload: String,
    #[tabled(rename = "tok/s")]
    tps: String,
    #[tabled(rename = "Fine-tune")]
    fine_tuning: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
}

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    id: String,
    #[tabled(rename = "Company")]
    company: String,
    #[tabled(rename = "Params")]
    params: String,
    #[tabled(rename = "Context")]
    context: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Downloads")]
    downloads: String,
}

fn model_row(m: &ModelDescriptor) -> ModelRow {
    ModelRow {
        id: m.id().to_string(),
        company: m.company().to_string(),
        params: m.params_label(),
        context: format!("{}k", m.max_context() / 1024),
        task: m.task().to_string(),
        downloads: compact_count(m.downloads()),
    }
}

fn compact_count(n: u64) -> String {
    match n {
        0 => "-".to_string(),
        n if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        n if n >= 1_000 => format!("{:.0}k", n as f64 / 1_000.0),
        n => n.to_string(),
    }
}

pub fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::NativePerformance => Color::Green,
        Tier::OptimizedLocal => Color::BrightGreen,
        Tier::HybridOffload => Color::Yellow,
        Tier::CpuBottleneck => Color::BrightYellow,
        Tier::Experimental => Color::Magenta,
        Tier::CloudOnly => Color::Red,
    }
}

fn tier_badge(tier: Tier) -> ColoredString {
    let icon = match tier.severity() {
        Severity::Ok => "●",
        Severity::Notice => "◐",
        Severity::Warning => "○",
        Severity::Critical => "✗",
    };
    format!("{} {}", icon, tier.label()).color(tier_color(tier))
}

fn severity_text(severity: Severity) -> ColoredString {
    match severity {
        Severity::Ok => severity.label().green(),
        Severity::Notice => severity.label().cyan(),
        Severity::Warning => severity.label().yellow(),
        Severity::Critical => severity.label().red().bold(),
    }
}

pub fn display_system(local: &LocalSystem, profile: &HardwareProfile) {
    println!("\n{}", "=== System Specifications ===".bold().cyan());
    println!("CPU: {} ({} cores)", profile.cpu_name(), local.cpu_cores);
    println!(
        "Total RAM: {:.2} GB{}",
        profile.ram_gb(),
        if is_running_in_wsl() { " (WSL)" } else { "" }
    );
    println!("Available RAM: {:.2} GB", local.available_ram_gb);
    println!("Platform: {}", profile.platform());

    if local.gpus.is_empty() {
        println!("GPU: Not detected");
    } else {
        for (i, gpu) in local.gpus.iter().enumerate() {
            let prefix = if local.gpus.len() > 1 {
                format!("GPU {}: ", i + 1)
            } else {
                "GPU: ".to_string()
            };
            let memory = if gpu.unified_memory {
                format!("unified memory, {:.2} GB shared", gpu.vram_gb.unwrap_or(0.0))
            } else {
                match gpu.vram_gb {
                    Some(vram) if gpu.count > 1 => format!("{:.2} GB VRAM each", vram),
                    Some(vram) if vram > 0.0 => format!("{:.2} GB VRAM", vram),
                    _ => "VRAM unknown".to_string(),
                }
            };
            let count = if gpu.count > 1 {
                format!(" x{}", gpu.count)
            } else {
                String::new()
            };
            println!(
                "{}{}{} ({}, {}, via {})",
                prefix,
                gpu.name,
                count,
                memory,
                gpu.vendor.label(),
                gpu.source
            );
        }
    }
    println!();
    display_profile(profile);
}

/// The numbers the engine actually sees, after overrides.
pub fn display_profile(profile: &HardwareProfile) {
    println!("{}", "Scoring profile:".bold().underline());
    println!(
        "  RAM {:.1} GB  |  VRAM {:.1} GB  |  Shared {:.1} GB  |  {}  |  {}",
        profile.ram_gb(),
        profile.vram_gb(),
        profile.shared_vram_gb(),
        profile.vendor().label(),
        profile.platform()
    );
    if !profile.gpu_name().is_empty() {
        println!("  GPU: {}", profile.gpu_name());
    }
}

pub fn display_all_models(models: &[ModelDescriptor]) {
    println!("\n{}", "=== Bundled Model Catalog ===".bold().cyan());
    println!("Total models: {}\n", models.len());

    let rows: Vec<ModelRow> = models.iter().map(model_row).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn display_search_results(models: &[&ModelDescriptor], query: &str) {
    if models.is_empty() {
        println!(
            "\n{}",
            format!("No models found matching '{}'", query).yellow()
        );
        return;
    }

    println!(
        "\n{}",
        format!("=== Search Results for '{}' ===", query)
            .bold()
            .cyan()
    );
    println!("Found {} model(s)\n", models.len());

    let rows: Vec<ModelRow> = models.iter().map(|m| model_row(m)).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn display_results(results: &[CompatibilityResult], ctx: RequestContext) {
    if results.is_empty() {
        println!("\n{}", "No models match the given filters.".yellow());
        return;
    }

    println!("\n{}", "=== Model Compatibility Analysis ===".bold().cyan());
    let local = results.iter().filter(|r| r.tier.is_local()).count();
    println!(
        "{} of {} model(s) run locally at {} tokens of context\n",
        local,
        results.len(),
        ctx.tokens()
    );

    let rows: Vec<ResultRow> = results
        .iter()
        .map(|r| {
            let name = if r.is_over_context_limit {
                format!("{} (ctx!)", r.model_name)
            } else {
                r.model_name.clone()
            };
            ResultRow {
                tier: tier_badge(r.tier).to_string(),
                name,
                company: r
                    .model_id
                    .split_once('/')
                    .map_or("Unknown", |(owner, _)| owner)
                    .to_string(),
                params: format!("{}B", r.params_b),
                offload: format!("{}%", r.gpu_offload_percent),
                tps: r.predicted_tps.value().map_or_else(|| "N/A".to_string(), |v| v.to_string()),
                fine_tuning: r.fine_tuning.label().to_string(),
                strategy: r.recommended_strategy.clone(),
            }
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn display_result_detail(result: &CompatibilityResult, profile: &HardwareProfile) {
    println!("\n{}", format!("=== {} ===", result.model_name).bold().cyan());
    println!();
    println!("{}: {}", "Model".bold(), result.model_id);
    println!("{}: {}B", "Parameters".bold(), result.params_b);
    println!("{}: {} tokens", "Max Context".bold(), result.max_context);
    if result.downloads > 0 {
        println!("{}: {}", "Downloads".bold(), compact_count(result.downloads));
    }
    println!();

    println!("{}", "Memory Requirements:".bold().underline());
    println!("  FP16 weights: {:.2} GB", result.weight_size_gb.fp16);
    println!("  INT8 weights: {:.2} GB", result.weight_size_gb.int8);
    println!("  INT4 weights: {:.2} GB", result.weight_size_gb.int4);
    println!(
        "  KV cache at {} tokens: {:.2} GB",
        result.context_window_tokens, result.context_buffer_gb
    );
    println!(
        "  Available: {:.1} GB VRAM + {:.1} GB RAM",
        profile.vram_gb(),
        profile.ram_gb()
    );
    println!();

    println!("{}", "Verdict:".bold().underline());
    println!("  Tier: {}", tier_badge(result.tier));
    println!("  Severity: {}", severity_text(result.severity));
    println!("  GPU Offload: {}%", result.gpu_offload_percent);
    println!("  Predicted Speed: {}", result.predicted_tps);
    println!("  Fine-Tuning: {}", result.fine_tuning.label());
    if result.is_over_context_limit {
        println!(
            "  {}",
            format!(
                "Context {} exceeds the model limit of {}",
                result.context_window_tokens, result.max_context
            )
            .yellow()
        );
    }
    println!();

    println!("{}", "Reasoning:".bold().underline());
    println!("  {}", result.reasoning);
    println!();

    println!("{}", "Recommended Strategy:".bold().underline());
    println!("  {}", result.recommended_strategy);
    println!("  {}", result.optimized_command.green());
    println!();
}

/// What the free-text parser managed to extract.
pub fn display_parsed_input(input: &HardwareInput) {
    fn gb(v: Option<f64>) -> String {
        v.map_or_else(|| "?".red().to_string(), |v| format!("{:.1} GB", v))
    }

    println!("\n{}", "=== Parsed Description ===".bold().cyan());
    println!("RAM: {}", gb(input.ram_gb));
    println!("VRAM: {}", gb(input.vram_gb));
    println!("Shared VRAM: {}", gb(input.shared_vram_gb));
    if let Some(gpu) = &input.gpu_name {
        println!("GPU: {}", gpu);
    }
    if let Some(cpu) = &input.cpu_name {
        println!("CPU: {}", cpu);
    }
    if let Some(platform) = &input.platform {
        println!("Platform: {}", platform);
    }
    println!();
}

pub fn display_scan(report: &DeviceReport) {
    let metrics = &report.metrics;
    println!("\n{}", "Detected specifications:".bold());
    println!("   CPU: {}", metrics.cpu.brand);
    if let Some(threads) = metrics.cpu.logical_cores {
        println!("   Threads: {} logical cores", threads);
    }
    match &metrics.ram {
        Some(ram) => println!("   RAM: {} GB", ram.total_gb),
        None => println!("   RAM: unknown"),
    }
    if let Some(storage) = &metrics.storage {
        println!("   Disk: {} GB free of {} GB", storage.free_gb, storage.total_gb);
    }
    if metrics.gpu.is_empty() {
        println!("   GPU: No dedicated GPU detected.");
    }
    for gpu in &metrics.gpu {
        if gpu.is_unified() {
            println!("   GPU: {} (VRAM: Unified)", gpu.name);
        } else {
            println!("   GPU: {} (VRAM: {} GB)", gpu.name, gpu.vram_total_gb);
        }
    }
    println!("--------------------------------------------------\n");
}

pub fn display_privacy_notice() {
    println!("--------------------------------------------------");
    println!("NOTICE: Only hardware capability metrics (CPU/RAM/GPU/Disk Space)");
    println!("are being collected to determine LLM compatibility.");
    println!("NO personal files, browsing history, or private data is accessed.");
    println!("--------------------------------------------------");
}

pub fn display_scan_success(link: &str) {
    println!("\n{}", "=".repeat(50));
    println!("{}", "Hardware profile updated.".green().bold());
    println!("View your report here:");
    println!("   {}", link.cyan());
    println!("{}\n", "=".repeat(50));
}

// ────────────────────────────────────────────────────────────────────
// JSON output for machine consumption (scripts, dashboards, etc.)
// ────────────────────────────────────────────────────────────────────

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serialize the detected system and the scoring profile to stdout.
pub fn display_json_system(local: &LocalSystem, profile: &HardwareProfile) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "system": system_json(local),
        "profile": profile,
    }))
}

/// Serialize the scoring profile and results to stdout.
pub fn display_json_results(
    profile: &HardwareProfile,
    ctx: RequestContext,
    results: &[CompatibilityResult],
) -> anyhow::Result<()> {
    print_json(&serde_json::json!({
        "hardware": profile,
        "context_tokens": ctx.tokens(),
        "results": results,
    }))
}

fn system_json(local: &LocalSystem) -> serde_json::Value {
    let gpus_json: Vec<serde_json::Value> = local
        .gpus
        .iter()
        .map(|g| {
            serde_json::json!({
                "name": g.name,
                "vram_gb": g.vram_gb.map(round2),
                "vendor": g.vendor.label(),
                "count": g.count,
                "unified_memory": g.unified_memory,
                "source": g.source,
            })
        })
        .collect();

    serde_json::json!({
        "total_ram_gb": round2(local.profile.ram_gb()),
        "available_ram_gb": round2(local.available_ram_gb),
        "cpu_cores": local.cpu_cores,
        "cpu_name": local.profile.cpu_name(),
        "platform": local.profile.platform(),
        "wsl": is_running_in_wsl(),
        "total_vram_gb": round1(local.profile.vram_gb()),
        "gpus": gpus_json,
    })
}
