mod display;
mod server;
mod tui_app;
mod tui_events;
mod tui_ui;

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use checkmate_core::catalog::{
    EmbeddedCatalog, FallbackCatalog, HuggingFaceCatalog, ModelCatalogProvider,
};
use checkmate_core::config::Settings;
use checkmate_core::engine::{self, SortColumn, Tier};
use checkmate_core::hardware::{self, HardwareInput, HardwareProfile, LocalSystem, Vendor};
use checkmate_core::models::{self, ModelDescriptor, RequestContext};
use checkmate_core::report::{self, DeviceReport};
use checkmate_core::{device_id, sender, spec_parser};

const CONTEXT_ENV: &str = "CHECKMATE_CONTEXT_LENGTH";

#[derive(Parser)]
#[command(name = "llm-checkmate")]
#[command(about = "Check which LLMs your hardware can run, serve or fine-tune", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use classic CLI table output instead of TUI
    #[arg(long)]
    cli: bool,

    /// Output results as JSON (for tool integration)
    #[arg(long)]
    json: bool,

    /// Debug logging for the checkmate crates (RUST_LOG still applies)
    #[arg(short, long)]
    verbose: bool,

    /// Context window to evaluate, in tokens.
    /// Falls back to CHECKMATE_CONTEXT_LENGTH, then the config file.
    #[arg(long, value_name = "TOKENS", value_parser = clap::value_parser!(u32).range(1..))]
    context: Option<u32>,

    /// Override system RAM (e.g. "32G", "32000M", "1T")
    #[arg(long, value_name = "SIZE")]
    ram: Option<String>,

    /// Override dedicated GPU memory (e.g. "24G")
    #[arg(long, value_name = "SIZE")]
    vram: Option<String>,

    /// Override shared GPU memory (e.g. "8G")
    #[arg(long, value_name = "SIZE")]
    shared_vram: Option<String>,

    /// Override the platform (linux, darwin, win32)
    #[arg(long)]
    platform: Option<String>,

    /// Override the GPU name; the vendor is derived from it
    #[arg(long)]
    gpu_name: Option<String>,

    /// Override the CPU name
    #[arg(long)]
    cpu_name: Option<String>,

    /// Override the GPU vendor: nvidia, amd, apple, intel, general
    #[arg(long, value_parser = parse_vendor)]
    vendor: Option<Vendor>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected hardware profile
    System,

    /// List the bundled model catalog
    List,

    /// Rate every model against this machine (classic table output)
    Check {
        /// Only show models at or above this tier: native, optimized, hybrid, cpu, experimental, cloud
        #[arg(long, value_name = "TIER", value_parser = parse_tier)]
        min_tier: Option<Tier>,

        /// Limit number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Query the Hugging Face catalog instead of the bundled list
        #[arg(long)]
        online: bool,

        /// Pipeline task to list models for
        #[arg(long)]
        task: Option<String>,

        /// Narrow the catalog by name
        #[arg(long, default_value = "")]
        search: String,

        /// Sort column: tier, params, speed, downloads
        #[arg(long, default_value = "tier", value_parser = parse_sort)]
        sort: SortColumn,
    },

    /// Search the bundled catalog
    Search {
        /// Search query (model id, name or company)
        query: String,
    },

    /// Show the full compatibility report for one model
    Info {
        /// Model id or partial name to look up
        model: String,
    },

    /// Extract hardware from a free-text description and rate models for it
    Parse {
        /// File with the description; reads stdin when omitted
        file: Option<PathBuf>,

        /// Confirm system RAM when the text does not state it
        #[arg(long, value_name = "SIZE")]
        assume_ram: Option<String>,

        /// Confirm dedicated GPU memory when the text does not state it
        #[arg(long, value_name = "SIZE")]
        assume_vram: Option<String>,

        /// Confirm shared GPU memory
        #[arg(long, value_name = "SIZE")]
        assume_shared_vram: Option<String>,
    },

    /// Scan this machine and send the report to a checkmate backend
    Scan {
        /// Backend API URL
        #[arg(long)]
        backend: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    Tier::parse(s).ok_or_else(|| {
        format!("unknown tier '{s}' (native, optimized, hybrid, cpu, experimental, cloud)")
    })
}

fn parse_vendor(s: &str) -> Result<Vendor, String> {
    Vendor::parse(s)
        .ok_or_else(|| format!("unknown vendor '{s}' (nvidia, amd, apple, intel, general)"))
}

fn parse_sort(s: &str) -> Result<SortColumn, String> {
    SortColumn::parse(s)
        .ok_or_else(|| format!("unknown sort column '{s}' (tier, params, speed, downloads)"))
}

fn init_tracing(verbose: bool) {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    if verbose {
        for directive in ["checkmate_core=debug", "llm_checkmate=debug"] {
            if let Ok(parsed) = directive.parse() {
                env_filter = env_filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flag, then `CHECKMATE_CONTEXT_LENGTH`, then the config file.
fn resolve_context_tokens(flag: Option<u32>, settings: &Settings) -> Result<RequestContext> {
    if let Some(tokens) = flag {
        return Ok(RequestContext::new(tokens)?);
    }

    if let Ok(raw) = std::env::var(CONTEXT_ENV) {
        match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => return Ok(RequestContext::new(v)?),
            _ => eprintln!(
                "Warning: could not parse {}='{}'. Expected a positive integer.",
                CONTEXT_ENV, raw
            ),
        }
    }

    RequestContext::new(settings.engine.default_context_tokens)
        .context("invalid engine.default_context_tokens in config")
}

fn parse_size_arg(flag: &str, value: &Option<String>) -> Result<Option<f64>> {
    match value {
        None => Ok(None),
        Some(s) => match hardware::parse_memory_size(s) {
            Some(gb) => Ok(Some(gb)),
            None => bail!(
                "could not parse {} value '{}'. Expected format: 32G, 32000M, 1.5T",
                flag,
                s
            ),
        },
    }
}

/// Hardware fields given on the command line.
fn manual_overrides(cli: &Cli) -> Result<HardwareInput> {
    Ok(HardwareInput {
        ram_gb: parse_size_arg("--ram", &cli.ram)?,
        vram_gb: parse_size_arg("--vram", &cli.vram)?,
        shared_vram_gb: parse_size_arg("--shared-vram", &cli.shared_vram)?,
        vendor: cli.vendor,
        platform: cli.platform.clone(),
        cpu_name: cli.cpu_name.clone(),
        gpu_name: cli.gpu_name.clone(),
    })
}

/// Detect the machine and apply any manual overrides on top.
fn detect_profile(cli: &Cli) -> Result<(LocalSystem, HardwareProfile)> {
    let overrides = manual_overrides(cli)?;
    let local = HardwareProfile::detect().context("hardware detection returned unusable values")?;

    let mut base = local.profile.to_input();
    if overrides.gpu_name.is_some() || overrides.cpu_name.is_some() {
        // re-derive the vendor from the overridden names unless --vendor is set
        base.vendor = None;
    }
    let profile = base
        .merge(overrides)
        .into_profile()
        .context("invalid hardware override")?;
    Ok((local, profile))
}

fn load_models(
    online: bool,
    task: &str,
    search: &str,
    settings: &Settings,
) -> Vec<ModelDescriptor> {
    if online {
        FallbackCatalog::new(HuggingFaceCatalog::from_settings(&settings.catalog))
            .fetch_models(task, search)
    } else {
        EmbeddedCatalog.fetch_models(task, search)
    }
}

struct CheckOptions {
    min_tier: Option<Tier>,
    limit: Option<usize>,
    online: bool,
    task: String,
    search: String,
    sort: SortColumn,
}

fn run_check(
    cli: &Cli,
    settings: &Settings,
    ctx: RequestContext,
    opts: CheckOptions,
) -> Result<()> {
    let (local, profile) = detect_profile(cli)?;
    let models = load_models(opts.online, &opts.task, &opts.search, settings);

    if !cli.json {
        display::display_system(&local, &profile);
    }

    let mut results = engine::classify_all(&profile, &models, ctx);
    if let Some(min) = opts.min_tier {
        results.retain(|r| r.tier.at_least(min));
    }
    results = engine::rank_results(results, opts.sort);
    if let Some(n) = opts.limit {
        results.truncate(n);
    }

    if cli.json {
        display::display_json_results(&profile, ctx, &results)
    } else {
        display::display_results(&results, ctx);
        Ok(())
    }
}

fn run_info(cli: &Cli, ctx: RequestContext, query: &str) -> Result<()> {
    let all = models::embedded_models();
    let found = models::find_models(all, query);

    let Some(&first) = found.first() else {
        println!("\nNo model found matching '{}'", query);
        return Ok(());
    };

    let exact = first.id().eq_ignore_ascii_case(query.trim())
        || first.name().eq_ignore_ascii_case(query.trim());
    if found.len() > 1 && !exact {
        println!("\nMultiple models found. Please be more specific:");
        for m in found {
            println!("  - {}", m.id());
        }
        return Ok(());
    }

    let (_, profile) = detect_profile(cli)?;
    let result = engine::classify(&profile, first, ctx);
    if cli.json {
        display::display_json_results(&profile, ctx, std::slice::from_ref(&result))
    } else {
        display::display_result_detail(&result, &profile);
        Ok(())
    }
}

fn run_parse(
    cli: &Cli,
    settings: &Settings,
    ctx: RequestContext,
    file: Option<PathBuf>,
    assumptions: HardwareInput,
) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let parsed = spec_parser::parse_spec_text(&text);
    let input = parsed.clone().merge(assumptions);

    let missing = input.missing_fields();
    if !missing.is_empty() {
        display::display_parsed_input(&parsed);
        let flags: Vec<String> = missing
            .iter()
            .map(|f| format!("--assume-{}", f.trim_end_matches("_gb").replace('_', "-")))
            .collect();
        bail!(
            "description does not state {}; confirm with {}",
            missing.join(", "),
            flags.join(" / ")
        );
    }

    let profile = input.into_profile().context("invalid hardware in description")?;
    let models = EmbeddedCatalog.fetch_models(&settings.catalog.default_task, "");
    let results = engine::rank_results(
        engine::classify_all(&profile, &models, ctx),
        SortColumn::Tier,
    );

    if cli.json {
        display::display_json_results(&profile, ctx, &results)
    } else {
        display::display_profile(&profile);
        display::display_results(&results, ctx);
        Ok(())
    }
}

fn run_scan(cli: &Cli, settings: &Settings, backend: Option<String>) -> Result<()> {
    let backend_url = backend.unwrap_or_else(|| settings.agent.backend_url.clone());

    let id = device_id::get_or_create();
    println!("Device identified: {}", id);
    println!("Running hardware diagnostics (this may take a few seconds)...");

    let report = DeviceReport::new(id.clone(), report::scan_system());
    if cli.json {
        display::print_json(&report)?;
    } else {
        display::display_scan(&report);
    }

    display::display_privacy_notice();
    println!("Sending report to backend at {}...", backend_url);

    let timeout = Duration::from_secs(settings.agent.timeout_secs);
    sender::send_report(&report, &backend_url, timeout)
        .with_context(|| format!("failed to reach {}", backend_url))?;

    display::display_scan_success(&sender::dashboard_link(&backend_url, &id));
    Ok(())
}

fn run_tui(cli: &Cli, settings: &Settings, ctx: RequestContext) -> Result<()> {
    let (local, profile) = detect_profile(cli)?;
    let models = EmbeddedCatalog.fetch_models(&settings.catalog.default_task, "");

    // Setup terminal
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = tui_app::App::new(local, profile, models, ctx);

    let outcome = (|| -> std::io::Result<()> {
        loop {
            terminal.draw(|frame| tui_ui::draw(frame, &mut app))?;
            tui_events::handle_events(&mut app)?;
            if app.should_quit {
                return Ok(());
            }
        }
    })();

    // Restore terminal
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    outcome.context("error running TUI")
}

fn run(mut cli: Cli) -> Result<()> {
    let tui_mode = cli.command.is_none() && !cli.cli;
    if !tui_mode {
        init_tracing(cli.verbose);
    }

    let settings = Settings::load().context("failed to load config")?;
    let ctx = resolve_context_tokens(cli.context, &settings)?;

    let Some(command) = cli.command.take() else {
        if cli.cli {
            let opts = CheckOptions {
                min_tier: None,
                limit: None,
                online: false,
                task: settings.catalog.default_task.clone(),
                search: String::new(),
                sort: SortColumn::Tier,
            };
            return run_check(&cli, &settings, ctx, opts);
        }
        return run_tui(&cli, &settings, ctx);
    };

    match command {
        Commands::System => {
            let (local, profile) = detect_profile(&cli)?;
            if cli.json {
                display::display_json_system(&local, &profile)?;
            } else {
                display::display_system(&local, &profile);
            }
        }

        Commands::List => {
            display::display_all_models(models::embedded_models());
        }

        Commands::Check {
            min_tier,
            limit,
            online,
            task,
            search,
            sort,
        } => {
            let opts = CheckOptions {
                min_tier,
                limit,
                online,
                task: task.unwrap_or_else(|| settings.catalog.default_task.clone()),
                search,
                sort,
            };
            run_check(&cli, &settings, ctx, opts)?;
        }

        Commands::Search { query } => {
            let results = models::find_models(models::embedded_models(), &query);
            display::display_search_results(&results, &query);
        }

        Commands::Info { model } => {
            run_info(&cli, ctx, &model)?;
        }

        Commands::Parse {
            file,
            assume_ram,
            assume_vram,
            assume_shared_vram,
        } => {
            let assumptions = HardwareInput {
                ram_gb: parse_size_arg("--assume-ram", &assume_ram)?,
                vram_gb: parse_size_arg("--assume-vram", &assume_vram)?,
                shared_vram_gb: parse_size_arg("--assume-shared-vram", &assume_shared_vram)?,
                ..Default::default()
            };
            run_parse(&cli, &settings, ctx, file, assumptions)?;
        }

        Commands::Scan { backend } => {
            run_scan(&cli, &settings, backend)?;
        }

        Commands::Serve { host, port } => {
            let mut server_settings = settings.server.clone();
            if let Some(host) = host {
                server_settings.host = host;
            }
            if let Some(port) = port {
                server_settings.port = port;
            }
            server::run(&server_settings, &settings)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_flag_accepts_backend_names() {
        let cli = Cli::try_parse_from(["llm-checkmate", "--vendor", "rocm", "system"]).unwrap();
        assert_eq!(cli.vendor, Some(Vendor::Amd));
        assert_eq!(manual_overrides(&cli).unwrap().vendor, Some(Vendor::Amd));

        assert!(Cli::try_parse_from(["llm-checkmate", "--vendor", "voodoo", "system"]).is_err());
    }

    #[test]
    fn test_manual_overrides_parse_sizes() {
        let cli = Cli::try_parse_from([
            "llm-checkmate",
            "--ram",
            "64G",
            "--vram",
            "24000M",
            "--gpu-name",
            "RTX 4090",
            "check",
        ])
        .unwrap();
        let overrides = manual_overrides(&cli).unwrap();
        assert_eq!(overrides.ram_gb, Some(64.0));
        assert!(overrides.vram_gb.is_some_and(|v| (v - 23.44).abs() < 0.01));
        assert_eq!(overrides.gpu_name.as_deref(), Some("RTX 4090"));
        assert_eq!(overrides.vendor, None);
    }

    #[test]
    fn test_bad_size_flag_is_rejected() {
        let cli = Cli::try_parse_from(["llm-checkmate", "--ram", "lots", "system"]).unwrap();
        assert!(manual_overrides(&cli).is_err());
    }
}
