use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sysinfo::System;
use tracing::debug;

use crate::error::ProfileError;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// GPU vendor family. Only the recommended runtime and command strings (plus
/// the Apple throughput factor) depend on it; tiering never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    #[serde(rename = "NVIDIA", alias = "nvidia", alias = "Nvidia")]
    Nvidia,
    #[serde(rename = "AMD", alias = "amd", alias = "Amd")]
    Amd,
    #[serde(alias = "apple")]
    Apple,
    #[serde(alias = "intel")]
    Intel,
    #[serde(alias = "general")]
    General,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::Nvidia,
        Vendor::Amd,
        Vendor::Apple,
        Vendor::Intel,
        Vendor::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Vendor::Nvidia => "NVIDIA",
            Vendor::Amd => "AMD",
            Vendor::Apple => "Apple",
            Vendor::Intel => "Intel",
            Vendor::General => "General",
        }
    }

    /// Infer the vendor from a device name such as "NVIDIA GeForce RTX 3070"
    /// or "Apple M2 Pro". Unknown names map to `General`.
    pub fn from_device_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if ["nvidia", "geforce", "quadro", "tesla", "rtx", "gtx"]
            .iter()
            .any(|k| lower.contains(k))
        {
            Vendor::Nvidia
        } else if lower.contains("apple") || lower.contains("mps") {
            Vendor::Apple
        } else if ["intel", "iris", "uhd graphics", "arc a"]
            .iter()
            .any(|k| lower.contains(k))
        {
            Vendor::Intel
        } else if lower.contains("amd")
            || lower.contains("radeon")
            || lower.starts_with("ati ")
            || lower.contains(" ati ")
        {
            Vendor::Amd
        } else {
            Vendor::General
        }
    }

    /// Parse a user-supplied vendor label (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nvidia" | "cuda" => Some(Vendor::Nvidia),
            "amd" | "rocm" | "radeon" => Some(Vendor::Amd),
            "apple" | "metal" | "mps" => Some(Vendor::Apple),
            "intel" | "sycl" => Some(Vendor::Intel),
            "general" | "generic" | "other" => Some(Vendor::General),
            _ => None,
        }
    }
}

/// Normalize an OS identifier to the values the engine compares against
/// (`darwin`, `win32`, `linux`, ...).
pub fn normalize_platform(platform: &str) -> String {
    let lower = platform.trim().to_lowercase();
    match lower.as_str() {
        "macos" | "mac os x" | "mac os" | "osx" | "mac" | "darwin" => "darwin".to_string(),
        "windows" | "win32" | "win64" | "windows_nt" => "win32".to_string(),
        "" => "unknown".to_string(),
        _ => lower,
    }
}

/// Validated hardware numbers for one machine. Built only through
/// [`HardwareProfile::new`] or [`HardwareInput::into_profile`], so every
/// numeric field is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardwareProfile {
    ram_gb: f64,
    vram_gb: f64,
    shared_vram_gb: f64,
    vendor: Vendor,
    platform: String,
    cpu_name: String,
    gpu_name: String,
}

fn check_gb(field: &'static str, value: f64) -> Result<f64, ProfileError> {
    if !value.is_finite() {
        return Err(ProfileError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(ProfileError::Negative { field, value });
    }
    Ok(value)
}

impl HardwareProfile {
    pub fn new(ram_gb: f64, vram_gb: f64, shared_vram_gb: f64) -> Result<Self, ProfileError> {
        Ok(HardwareProfile {
            ram_gb: check_gb("ram_gb", ram_gb)?,
            vram_gb: check_gb("vram_gb", vram_gb)?,
            shared_vram_gb: check_gb("shared_vram_gb", shared_vram_gb)?,
            vendor: Vendor::General,
            platform: normalize_platform(std::env::consts::OS),
            cpu_name: "Unknown CPU".to_string(),
            gpu_name: String::new(),
        })
    }

    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = normalize_platform(platform);
        self
    }

    pub fn ram_gb(&self) -> f64 {
        self.ram_gb
    }

    pub fn vram_gb(&self) -> f64 {
        self.vram_gb
    }

    pub fn shared_vram_gb(&self) -> f64 {
        self.shared_vram_gb
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn cpu_name(&self) -> &str {
        &self.cpu_name
    }

    pub fn gpu_name(&self) -> &str {
        &self.gpu_name
    }

    pub fn is_darwin(&self) -> bool {
        self.platform == "darwin"
    }

    /// Convert back into an editable input, e.g. to apply CLI overrides.
    pub fn to_input(&self) -> HardwareInput {
        HardwareInput {
            ram_gb: Some(self.ram_gb),
            vram_gb: Some(self.vram_gb),
            shared_vram_gb: Some(self.shared_vram_gb),
            vendor: Some(self.vendor),
            platform: Some(self.platform.clone()),
            cpu_name: Some(self.cpu_name.clone()),
            gpu_name: Some(self.gpu_name.clone()),
        }
    }
}

/// Possibly-partial hardware numbers from any profile source (detection, agent
/// report, free-text parse, manual entry, HTTP body). Nothing reaches the
/// engine until [`HardwareInput::into_profile`] accepts it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareInput {
    #[serde(default, alias = "ramGB")]
    pub ram_gb: Option<f64>,
    #[serde(default, alias = "vramGB")]
    pub vram_gb: Option<f64>,
    #[serde(default, alias = "sharedVramGB")]
    pub shared_vram_gb: Option<f64>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default, alias = "cpuName")]
    pub cpu_name: Option<String>,
    #[serde(default, alias = "gpuName")]
    pub gpu_name: Option<String>,
}

impl HardwareInput {
    /// Overlay every field that is set in `other` onto `self`.
    pub fn merge(mut self, other: HardwareInput) -> Self {
        if other.ram_gb.is_some() {
            self.ram_gb = other.ram_gb;
        }
        if other.vram_gb.is_some() {
            self.vram_gb = other.vram_gb;
        }
        if other.shared_vram_gb.is_some() {
            self.shared_vram_gb = other.shared_vram_gb;
        }
        if other.vendor.is_some() {
            self.vendor = other.vendor;
        }
        if other.platform.is_some() {
            self.platform = other.platform;
        }
        if other.cpu_name.is_some() {
            self.cpu_name = other.cpu_name;
        }
        if other.gpu_name.is_some() {
            self.gpu_name = other.gpu_name;
        }
        self
    }

    /// Names of required numeric fields that are still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.ram_gb.is_none() {
            missing.push("ram_gb");
        }
        if self.vram_gb.is_none() {
            missing.push("vram_gb");
        }
        missing
    }

    /// Validate into a profile. RAM and VRAM are required; shared VRAM is
    /// informational and reads as 0 when absent. The vendor falls back to the
    /// GPU name, then the CPU name (Apple SoCs), then `General`.
    pub fn into_profile(self) -> Result<HardwareProfile, ProfileError> {
        let ram = self.ram_gb.ok_or(ProfileError::Missing("ram_gb"))?;
        let vram = self.vram_gb.ok_or(ProfileError::Missing("vram_gb"))?;
        let shared = self.shared_vram_gb.unwrap_or(0.0);

        let mut profile = HardwareProfile::new(ram, vram, shared)?;

        let cpu_name = self.cpu_name.filter(|s| !s.trim().is_empty());
        let gpu_name = self.gpu_name.filter(|s| !s.trim().is_empty());

        let vendor = self.vendor.unwrap_or_else(|| {
            let from_gpu = gpu_name
                .as_deref()
                .map(Vendor::from_device_name)
                .unwrap_or(Vendor::General);
            if from_gpu != Vendor::General {
                return from_gpu;
            }
            match cpu_name.as_deref().map(Vendor::from_device_name) {
                Some(Vendor::Apple) => Vendor::Apple,
                _ => Vendor::General,
            }
        });
        profile.vendor = vendor;

        if let Some(platform) = self.platform {
            profile.platform = normalize_platform(&platform);
        }
        if let Some(cpu) = cpu_name {
            profile.cpu_name = cpu;
        }
        if let Some(gpu) = gpu_name {
            profile.gpu_name = gpu;
        }
        Ok(profile)
    }
}

// ────────────────────────────────────────────────────────────────────
// Local probing
// ────────────────────────────────────────────────────────────────────

/// A GPU found by one of the platform queries.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedGpu {
    pub name: String,
    /// Dedicated memory per card. `None` when it could not be determined.
    pub vram_gb: Option<f64>,
    pub vendor: Vendor,
    pub count: u32,
    pub unified_memory: bool,
    /// Which query reported it (nvidia-smi, rocm-smi, sysfs, cim, ...).
    pub source: &'static str,
}

/// Everything local detection learned, plus the validated profile built
/// from it.
#[derive(Debug, Clone, Serialize)]
pub struct LocalSystem {
    pub profile: HardwareProfile,
    pub available_ram_gb: f64,
    pub cpu_cores: usize,
    pub gpus: Vec<DetectedGpu>,
}

impl LocalSystem {
    pub fn primary_gpu(&self) -> Option<&DetectedGpu> {
        self.gpus.first()
    }
}

/// Profile fields for a detected machine: the primary GPU's memory, scaled by
/// its card count, or shared RAM for unified-memory GPUs.
fn detected_input(total_ram_gb: f64, cpu_name: String, gpus: &[DetectedGpu]) -> HardwareInput {
    let mut input = HardwareInput {
        ram_gb: Some(total_ram_gb),
        vram_gb: Some(0.0),
        shared_vram_gb: Some(0.0),
        vendor: None,
        platform: Some(std::env::consts::OS.to_string()),
        cpu_name: Some(cpu_name),
        gpu_name: None,
    };

    if let Some(primary) = gpus.first() {
        input.gpu_name = Some(if primary.count > 1 {
            format!("{}x {}", primary.count, primary.name)
        } else {
            primary.name.clone()
        });
        input.vendor = Some(primary.vendor);
        if primary.unified_memory {
            // Unified memory is borrowed from system RAM, not dedicated.
            input.shared_vram_gb = primary.vram_gb;
        } else {
            input.vram_gb = Some(primary.vram_gb.unwrap_or(0.0) * primary.count as f64);
        }
    }
    input
}

impl HardwareProfile {
    /// Inspect the local machine. An undetectable GPU yields 0 GB of VRAM; a
    /// reading that does not validate is returned as the error.
    pub fn detect() -> Result<LocalSystem, ProfileError> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let total_ram_gb = sys.total_memory() as f64 / BYTES_PER_GB;
        let available_ram_gb = sys.available_memory() as f64 / BYTES_PER_GB;
        let cpu_cores = sys.cpus().len();
        let cpu_name = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "Unknown CPU".to_string());

        let gpus = detect_gpus(total_ram_gb, &cpu_name);
        debug!(count = gpus.len(), "gpu detection finished");

        let profile = detected_input(total_ram_gb, cpu_name, &gpus).into_profile()?;

        Ok(LocalSystem {
            profile,
            available_ram_gb,
            cpu_cores,
            gpus,
        })
    }
}

/// Run every vendor query and return GPUs sorted by total VRAM, best first.
/// A system with both NVIDIA and AMD cards reports both.
pub fn detect_gpus(total_ram_gb: f64, cpu_name: &str) -> Vec<DetectedGpu> {
    let mut gpus = Vec::new();

    let nvidia = query_nvidia_smi();
    if nvidia.is_empty() {
        gpus.extend(query_drm_vendor("0x10de", Vendor::Nvidia));
    } else {
        gpus.extend(nvidia);
    }

    if let Some(amd) = query_rocm_smi() {
        gpus.push(amd);
    } else if let Some(amd) = query_drm_vendor("0x1002", Vendor::Amd) {
        gpus.push(amd);
    }

    if let Some(intel) = query_drm_vendor("0x8086", Vendor::Intel) {
        gpus.push(intel);
    }

    for gpu in query_windows_cim() {
        let seen = gpus.iter().any(|g| {
            let a = g.name.to_lowercase();
            let b = gpu.name.to_lowercase();
            a.contains(&b) || b.contains(&a)
        });
        if !seen {
            gpus.push(gpu);
        }
    }

    if query_apple_gpu() {
        let name = if cpu_name.to_lowercase().contains("apple") {
            cpu_name.to_string()
        } else {
            "Apple Silicon".to_string()
        };
        gpus.push(DetectedGpu {
            name,
            vram_gb: Some(total_ram_gb),
            vendor: Vendor::Apple,
            count: 1,
            unified_memory: true,
            source: "system_profiler",
        });
    }

    gpus.sort_by(|a, b| {
        let va = a.vram_gb.unwrap_or(0.0) * a.count as f64;
        let vb = b.vram_gb.unwrap_or(0.0) * b.count as f64;
        vb.partial_cmp(&va).unwrap_or(std::cmp::Ordering::Equal)
    });
    gpus
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    std::process::Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
}

fn query_nvidia_smi() -> Vec<DetectedGpu> {
    command_stdout(
        "nvidia-smi",
        &["--query-gpu=memory.total,name", "--format=csv,noheader,nounits"],
    )
    .map(|text| parse_nvidia_smi(&text))
    .unwrap_or_default()
}

/// Parse `nvidia-smi --query-gpu=memory.total,name --format=csv,noheader,nounits`.
/// Identical cards are grouped with a count; VRAM stays per card.
pub fn parse_nvidia_smi(text: &str) -> Vec<DetectedGpu> {
    let mut grouped: BTreeMap<String, (u32, f64)> = BTreeMap::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (mem, name) = line.split_once(',').unwrap_or((line, ""));
        let name = match name.trim() {
            "" => "NVIDIA GPU".to_string(),
            n => n.to_string(),
        };
        let mb = mem.trim().parse::<f64>().unwrap_or(0.0);
        let gb = if mb > 0.0 {
            mb / 1024.0
        } else {
            estimate_vram_from_name(&name)
        };

        let entry = grouped.entry(name).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 = entry.1.max(gb);
    }

    grouped
        .into_iter()
        .map(|(name, (count, gb))| DetectedGpu {
            name,
            vram_gb: (gb > 0.0).then_some(gb),
            vendor: Vendor::Nvidia,
            count,
            unified_memory: false,
            source: "nvidia-smi",
        })
        .collect()
}

fn query_rocm_smi() -> Option<DetectedGpu> {
    let text = command_stdout("rocm-smi", &["--showmeminfo", "vram"])?;
    let per_card: Vec<u64> = text
        .lines()
        .filter(|l| {
            let lower = l.to_lowercase();
            lower.contains("total") && !lower.contains("used")
        })
        .filter_map(|l| {
            l.split_whitespace()
                .filter_map(|w| w.parse::<u64>().ok())
                .next_back()
        })
        .filter(|&b| b > 0)
        .collect();

    let name = command_stdout("rocm-smi", &["--showproductname"])
        .and_then(|text| {
            text.lines().find_map(|line| {
                let lower = line.to_lowercase();
                if lower.contains("card series") || lower.contains("card model") {
                    line.split(':')
                        .nth(1)
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                } else {
                    None
                }
            })
        })
        .unwrap_or_else(|| "AMD GPU".to_string());

    let vram_gb = match per_card.iter().max() {
        Some(&bytes) => Some(bytes as f64 / BYTES_PER_GB),
        None => Some(estimate_vram_from_name(&name)).filter(|&v| v > 0.0),
    };

    Some(DetectedGpu {
        name,
        vram_gb,
        vendor: Vendor::Amd,
        count: per_card.len().max(1) as u32,
        unified_memory: false,
        source: "rocm-smi",
    })
}

/// Walk `/sys/class/drm/cardN/device` for a PCI vendor id. Works inside
/// containers and without vendor tools installed.
fn query_drm_vendor(vendor_id: &str, vendor: Vendor) -> Option<DetectedGpu> {
    if !cfg!(target_os = "linux") {
        return None;
    }

    let mut count = 0u32;
    let mut max_bytes = 0u64;
    for entry in std::fs::read_dir("/sys/class/drm").ok()?.flatten() {
        let card = entry.path();
        let Some(fname) = card.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        // cardN only, not connectors like card0-DP-1
        if !fname.starts_with("card") || fname.contains('-') {
            continue;
        }
        let device = card.join("device");
        let Ok(id) = std::fs::read_to_string(device.join("vendor")) else {
            continue;
        };
        if id.trim() != vendor_id {
            continue;
        }
        count += 1;
        if let Ok(raw) = std::fs::read_to_string(device.join("mem_info_vram_total"))
            && let Ok(bytes) = raw.trim().parse::<u64>()
        {
            max_bytes = max_bytes.max(bytes);
        }
    }

    if count == 0 {
        return None;
    }

    let name = lspci_model_name(vendor).unwrap_or_else(|| format!("{} GPU", vendor.label()));
    let vram_gb = if max_bytes > 0 {
        Some(max_bytes as f64 / BYTES_PER_GB)
    } else {
        Some(estimate_vram_from_name(&name)).filter(|&v| v > 0.0)
    };

    Some(DetectedGpu {
        name,
        vram_gb,
        vendor,
        count,
        unified_memory: false,
        source: "sysfs",
    })
}

fn lspci_model_name(vendor: Vendor) -> Option<String> {
    let text = command_stdout("lspci", &["-nn"])?;
    let keys: &[&str] = match vendor {
        Vendor::Nvidia => &["nvidia"],
        Vendor::Amd => &["amd", "ati technologies"],
        Vendor::Intel => &["intel"],
        _ => return None,
    };
    text.lines().find_map(|line| {
        let lower = line.to_lowercase();
        let display = lower.contains("vga") || lower.contains("3d") || lower.contains("display");
        if display && keys.iter().any(|k| lower.contains(k)) {
            model_from_lspci_line(line)
        } else {
            None
        }
    })
}

/// Pick the most descriptive bracketed token of an lspci line
/// (e.g. "GeForce RTX 2060" out of "... [10de:1f08] ... [GeForce RTX 2060]").
pub fn model_from_lspci_line(line: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut rest = line;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(']') else { break };
        let token = after[..end].trim();
        let usable = !token.is_empty()
            && !token.contains(':')
            && !token.chars().all(|c| c.is_ascii_digit());
        if usable && best.is_none_or(|b| token.len() > b.len()) {
            best = Some(token);
        }
        rest = &after[end + 1..];
    }
    best.map(str::to_string).or_else(|| {
        line.split_once(": ")
            .map(|(_, right)| right.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn query_windows_cim() -> Vec<DetectedGpu> {
    if !cfg!(target_os = "windows") {
        return Vec::new();
    }
    command_stdout(
        "powershell",
        &[
            "-NoProfile",
            "-Command",
            "Get-CimInstance Win32_VideoController | ForEach-Object { $_.Name + '|' + $_.AdapterRAM }",
        ],
    )
    .map(|text| parse_windows_gpu_list(&text))
    .unwrap_or_default()
}

/// Parse `Name|AdapterRAM` lines. AdapterRAM is a 32-bit field that caps
/// near 4 GB, so larger cards are estimated from their name.
pub fn parse_windows_gpu_list(text: &str) -> Vec<DetectedGpu> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let (name, raw) = line.split_once('|').unwrap_or((line, ""));
            let name = name.trim().to_string();
            let lower = name.to_lowercase();
            if name.is_empty()
                || lower.contains("microsoft")
                || lower.contains("basic")
                || lower.contains("virtual")
            {
                return None;
            }
            let bytes = raw.trim().parse::<i64>().unwrap_or(0).unsigned_abs();
            let mut gb = bytes as f64 / BYTES_PER_GB;
            let estimated = estimate_vram_from_name(&name);
            if gb < 0.1 || (gb <= 4.1 && estimated > 4.1) {
                gb = estimated;
            }
            Some(DetectedGpu {
                vendor: Vendor::from_device_name(&name),
                name,
                vram_gb: (gb > 0.0).then_some(gb),
                count: 1,
                unified_memory: false,
                source: "cim",
            })
        })
        .collect()
}

fn query_apple_gpu() -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }
    command_stdout("system_profiler", &["SPDisplaysDataType"])
        .map(|text| {
            text.lines().any(|line| {
                let lower = line.to_lowercase();
                lower.contains("apple m") || lower.contains("apple gpu")
            })
        })
        .unwrap_or(false)
}

/// Parse a human-readable memory size into gigabytes.
/// Accepts "32G", "32gb", "8000M", "1.5T", or a bare number (GB).
pub fn parse_memory_size(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let num_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num, suffix) = s.split_at(num_end);
    let value: f64 = num.parse().ok()?;

    match suffix.trim().to_lowercase().as_str() {
        "" | "g" | "gb" | "gib" => Some(value),
        "m" | "mb" | "mib" => Some(value / 1024.0),
        "t" | "tb" | "tib" => Some(value * 1024.0),
        _ => None,
    }
}

pub fn is_running_in_wsl() -> bool {
    static IS_WSL: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *IS_WSL.get_or_init(|| {
        if !cfg!(target_os = "linux") {
            return false;
        }
        if std::env::var_os("WSL_DISTRO_NAME").is_some() {
            return true;
        }
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map(|t| t.to_ascii_lowercase().contains("microsoft"))
            .unwrap_or(false)
    })
}

/// Fallback VRAM (GB) from a GPU model name, for queries that report 0.
pub fn estimate_vram_from_name(name: &str) -> f64 {
    const TABLE: &[(&str, f64)] = &[
        ("5090", 32.0),
        ("5080", 16.0),
        ("5070 ti", 16.0),
        ("5070", 12.0),
        ("4090", 24.0),
        ("4080", 16.0),
        ("4070", 12.0),
        ("4060 ti", 16.0),
        ("4060", 8.0),
        ("3090", 24.0),
        ("3080 ti", 12.0),
        ("3080", 10.0),
        ("3070", 8.0),
        ("3060 ti", 8.0),
        ("3060", 12.0),
        ("h100", 80.0),
        ("a100", 80.0),
        ("l40", 48.0),
        ("a10", 24.0),
        ("t4", 16.0),
        ("7900 xtx", 24.0),
        ("7900", 20.0),
        ("7800", 16.0),
        ("7700", 12.0),
        ("7600", 8.0),
        ("6900", 16.0),
        ("6800", 16.0),
        ("6700", 12.0),
        ("6600", 8.0),
        ("arc a770", 16.0),
        ("arc a750", 8.0),
    ];

    let lower = name.to_lowercase();
    if let Some((_, gb)) = TABLE.iter().find(|(key, _)| lower.contains(key)) {
        return *gb;
    }
    if lower.contains("rtx") {
        8.0
    } else if lower.contains("gtx") {
        4.0
    } else if lower.contains("rx ") {
        8.0
    } else {
        0.0
    }
}
