//! Hardware report sent by the scanning agent, and the local scan that
//! produces it.
//!
//! Only capability metrics are collected (CPU, RAM, GPU, disk space). No
//! files, history or personal data are read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sysinfo::{Disks, System};
use tracing::debug;

use crate::hardware::{self, HardwareInput, Vendor};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// The agent sends `{}` for a section it failed to read.
fn empty_section_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsMetrics {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub physical_cores: Option<usize>,
    #[serde(default)]
    pub logical_cores: Option<usize>,
    #[serde(default, alias = "frequency_max")]
    pub frequency_max_mhz: Option<f64>,
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamMetrics {
    pub total_gb: f64,
    #[serde(default)]
    pub available_gb: f64,
    #[serde(default)]
    pub percent_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub total_gb: f64,
    pub free_gb: f64,
    #[serde(default)]
    pub percent_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuMetrics {
    pub name: String,
    /// Dedicated memory. Zero for integrated and unified-memory GPUs.
    #[serde(default)]
    pub vram_total_gb: f64,
    #[serde(default)]
    pub source: String,
}

impl GpuMetrics {
    /// Apple silicon GPUs share system RAM.
    pub fn is_unified(&self) -> bool {
        let name = self.name.to_lowercase();
        name.contains("apple") || name.contains("mps") || self.source.contains("mps")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    #[serde(default)]
    pub os: OsMetrics,
    #[serde(default)]
    pub cpu: CpuMetrics,
    /// Absent when the agent could not read memory; such a report cannot be
    /// turned into a profile.
    #[serde(default, deserialize_with = "empty_section_as_none")]
    pub ram: Option<RamMetrics>,
    #[serde(default, deserialize_with = "empty_section_as_none")]
    pub storage: Option<StorageMetrics>,
    #[serde(default)]
    pub gpu: Vec<GpuMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device_id: String,
    pub metrics: SystemMetrics,
    /// RFC 3339 time of the scan, as reported by the agent.
    #[serde(default)]
    pub timestamp: String,
}

impl DeviceReport {
    pub fn new(device_id: impl Into<String>, metrics: SystemMetrics) -> Self {
        DeviceReport {
            device_id: device_id.into(),
            metrics,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The GPU with the most dedicated memory, if any.
    pub fn primary_gpu(&self) -> Option<&GpuMetrics> {
        self.metrics.gpu.iter().max_by(|a, b| {
            a.vram_total_gb
                .partial_cmp(&b.vram_total_gb)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Hardware fields this report states. A missing RAM section stays
    /// missing; no GPU at all means 0 GB of dedicated memory.
    pub fn to_hardware_input(&self) -> HardwareInput {
        let ram_gb = self.metrics.ram.as_ref().map(|r| r.total_gb);
        let primary = self.primary_gpu();

        let (vram_gb, shared_vram_gb) = match primary {
            Some(gpu) if gpu.is_unified() => (0.0, ram_gb),
            Some(gpu) => (gpu.vram_total_gb, Some(0.0)),
            None => (0.0, Some(0.0)),
        };

        let vendor = primary.map(|g| {
            if g.is_unified() {
                Vendor::Apple
            } else {
                Vendor::from_device_name(&g.name)
            }
        });

        HardwareInput {
            ram_gb,
            vram_gb: Some(vram_gb),
            shared_vram_gb,
            vendor: vendor.filter(|v| *v != Vendor::General),
            platform: Some(self.metrics.os.system.clone()).filter(|s| !s.is_empty()),
            cpu_name: Some(self.metrics.cpu.brand.clone()).filter(|s| !s.is_empty()),
            gpu_name: primary.map(|g| g.name.clone()),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn os_family() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Darwin",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}

/// Collect capability metrics for this machine. Takes about a quarter
/// second because CPU usage needs two samples.
pub fn scan_system() -> SystemMetrics {
    let mut sys = System::new_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let cpu = CpuMetrics {
        brand: sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .unwrap_or_default(),
        architecture: std::env::consts::ARCH.to_string(),
        physical_cores: sys.physical_core_count(),
        logical_cores: Some(sys.cpus().len()),
        frequency_max_mhz: sys.cpus().iter().map(|c| c.frequency() as f64).reduce(f64::max),
        usage_percent: Some(round2(sys.global_cpu_usage() as f64)),
    };

    let total = sys.total_memory() as f64;
    let available = sys.available_memory() as f64;
    let ram = RamMetrics {
        total_gb: round2(total / BYTES_PER_GB),
        available_gb: round2(available / BYTES_PER_GB),
        percent_used: if total > 0.0 {
            round2((total - available) / total * 100.0)
        } else {
            0.0
        },
    };

    let disks = Disks::new_with_refreshed_list();
    let storage = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().first())
        .map(|d| {
            let total = d.total_space() as f64;
            let free = d.available_space() as f64;
            StorageMetrics {
                total_gb: round2(total / BYTES_PER_GB),
                free_gb: round2(free / BYTES_PER_GB),
                percent_used: if total > 0.0 {
                    round2((total - free) / total * 100.0)
                } else {
                    0.0
                },
            }
        });

    let gpu = hardware::detect_gpus(ram.total_gb, &cpu.brand)
        .into_iter()
        .map(|g| GpuMetrics {
            vram_total_gb: if g.unified_memory {
                0.0
            } else {
                round2(g.vram_gb.unwrap_or(0.0))
            },
            name: g.name,
            source: g.source.to_string(),
        })
        .collect::<Vec<_>>();
    debug!(gpus = gpu.len(), "system scan finished");

    SystemMetrics {
        os: OsMetrics {
            system: os_family().to_string(),
            release: System::kernel_version().unwrap_or_default(),
            version: System::long_os_version().unwrap_or_default(),
        },
        cpu,
        ram: Some(ram),
        storage,
        gpu,
    }
}
