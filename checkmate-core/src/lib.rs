pub mod catalog;
pub mod config;
pub mod device_id;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod models;
pub mod registry;
pub mod report;
pub mod sender;
pub mod spec_parser;

// Re-export key types for convenience
pub use catalog::{
    EmbeddedCatalog, FallbackCatalog, HuggingFaceCatalog, ModelCatalogProvider, RemoteCatalog,
    RetryPolicy,
};
pub use config::Settings;
pub use engine::{
    CompatibilityResult, FineTuningVerdict, Severity, SortColumn, Throughput, Tier, classify,
    classify_all, rank_results,
};
pub use error::CheckmateError;
pub use hardware::{HardwareInput, HardwareProfile, LocalSystem, Vendor};
pub use models::{ModelDescriptor, RequestContext};
pub use registry::{DeviceStore, InMemoryDeviceStore, StoredDevice};
pub use report::DeviceReport;
