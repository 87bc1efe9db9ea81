//! Short-lived storage for hardware profiles reported by remote agents.
//!
//! Only the HTTP layer talks to a [`DeviceStore`]; the engine receives a
//! plain [`HardwareProfile`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::hardware::HardwareProfile;
use crate::report::DeviceReport;

#[derive(Debug, Clone, Serialize)]
pub struct StoredDevice {
    pub device_id: String,
    pub profile: HardwareProfile,
    pub report: DeviceReport,
    pub received_at: DateTime<Utc>,
}

impl StoredDevice {
    /// Stamp a validated report with the current time.
    pub fn received_now(profile: HardwareProfile, report: DeviceReport) -> Self {
        StoredDevice {
            device_id: report.device_id.clone(),
            profile,
            report,
            received_at: Utc::now(),
        }
    }
}

pub trait DeviceStore: Send + Sync {
    /// A live (non-expired) device.
    fn get(&self, device_id: &str) -> Option<StoredDevice>;

    /// Insert or replace, keyed by `device.device_id`.
    fn put(&self, device: StoredDevice);

    /// Drop expired entries, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Process-local store with a fixed time-to-live per entry.
pub struct InMemoryDeviceStore {
    ttl: chrono::Duration,
    devices: RwLock<HashMap<String, StoredDevice>>,
}

impl InMemoryDeviceStore {
    pub fn new(ttl: Duration) -> Self {
        InMemoryDeviceStore {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            devices: RwLock::new(HashMap::new()),
        }
    }

    fn is_expired(&self, device: &StoredDevice, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(device.received_at) > self.ttl
    }

    pub fn get_at(&self, device_id: &str, now: DateTime<Utc>) -> Option<StoredDevice> {
        let devices = self.devices.read();
        devices
            .get(device_id)
            .filter(|d| !self.is_expired(d, now))
            .cloned()
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|_, d| !self.is_expired(d, now));
        let removed = before - devices.len();
        if removed > 0 {
            debug!(removed, remaining = devices.len(), "purged expired devices");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceStore for InMemoryDeviceStore {
    fn get(&self, device_id: &str) -> Option<StoredDevice> {
        self.get_at(device_id, Utc::now())
    }

    fn put(&self, device: StoredDevice) {
        info!(device_id = %device.device_id, "device registered");
        self.devices.write().insert(device.device_id.clone(), device);
    }

    fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CpuMetrics, OsMetrics, RamMetrics, SystemMetrics};

    fn device(id: &str, received_at: DateTime<Utc>) -> StoredDevice {
        let report = DeviceReport {
            device_id: id.to_string(),
            timestamp: received_at.to_rfc3339(),
            metrics: SystemMetrics {
                os: OsMetrics {
                    system: "Linux".to_string(),
                    release: "6.8".to_string(),
                    version: "Ubuntu 24.04".to_string(),
                },
                cpu: CpuMetrics::default(),
                ram: Some(RamMetrics {
                    total_gb: 16.0,
                    available_gb: 8.0,
                    percent_used: 50.0,
                }),
                storage: None,
                gpu: Vec::new(),
            },
        };
        StoredDevice {
            device_id: id.to_string(),
            profile: HardwareProfile::new(16.0, 0.0, 0.0).unwrap(),
            report,
            received_at,
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemoryDeviceStore::new(Duration::from_secs(60));
        store.put(device("abc", Utc::now()));
        assert!(store.get("abc").is_some());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_received_now_keys_by_report_id() {
        let template = device("xyz", Utc::now());
        let stored = StoredDevice::received_now(template.profile, template.report);
        assert_eq!(stored.device_id, "xyz");
        assert!(Utc::now() - stored.received_at < chrono::Duration::seconds(5));
    }

    #[test]
    fn test_put_replaces_existing() {
        let store = InMemoryDeviceStore::new(Duration::from_secs(60));
        let now = Utc::now();
        store.put(device("abc", now - chrono::Duration::seconds(30)));
        store.put(device("abc", now));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("abc", now).unwrap().received_at, now);
    }

    #[test]
    fn test_expired_entries_are_hidden_and_purged() {
        let store = InMemoryDeviceStore::new(Duration::from_secs(60));
        let now = Utc::now();
        store.put(device("old", now - chrono::Duration::seconds(120)));
        store.put(device("new", now));

        assert!(store.get_at("old", now).is_none());
        assert!(store.get_at("new", now).is_some());
        assert_eq!(store.purge_expired_at(now), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired_at(now), 0);
    }
}
