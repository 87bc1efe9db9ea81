use checkmate_core::catalog::{EmbeddedCatalog, ModelCatalogProvider};
use checkmate_core::engine::{self, SortColumn, Throughput, Tier};
use checkmate_core::error::ProfileError;
use checkmate_core::hardware::{HardwareInput, Vendor};
use checkmate_core::models::{ModelDescriptor, RequestContext};
use checkmate_core::report::DeviceReport;
use checkmate_core::spec_parser::parse_spec_text;

#[test]
fn free_text_to_ranked_results() {
    let input =
        parse_spec_text("Ryzen 5 5600X, 16GB DDR4 RAM, GeForce RTX 3060 12GB VRAM, Ubuntu 24.04");
    assert!(input.missing_fields().is_empty());
    let profile = input.into_profile().unwrap();
    assert_eq!(profile.vendor(), Vendor::Nvidia);
    assert_eq!(profile.platform(), "linux");

    let models = EmbeddedCatalog.fetch_models("text-generation", "");
    let results = engine::classify_all(&profile, &models, RequestContext::default());
    assert_eq!(results.len(), models.len());
    for (model, result) in models.iter().zip(&results) {
        assert_eq!(model.id(), result.model_id);
    }

    let ranked = engine::rank_results(results, SortColumn::Tier);
    let first_cloud = ranked.iter().position(|r| r.tier == Tier::CloudOnly);
    if let Some(idx) = first_cloud {
        assert!(ranked[idx..].iter().all(|r| r.tier == Tier::CloudOnly));
    }
    assert!(ranked[0].tier.at_least(Tier::OptimizedLocal));
}

#[test]
fn partial_text_needs_confirmation() {
    let input = parse_spec_text("Gaming laptop with an RTX 4070 and 8GB VRAM");
    assert_eq!(input.missing_fields(), vec!["ram_gb"]);
    assert_eq!(
        input.clone().into_profile(),
        Err(ProfileError::Missing("ram_gb"))
    );

    let confirmed = input.merge(HardwareInput {
        ram_gb: Some(32.0),
        ..Default::default()
    });
    assert!(confirmed.into_profile().is_ok());
}

#[test]
fn agent_report_to_compatibility() {
    let payload = r#"{
        "device_id": "9c1e",
        "metrics": {
            "os": {"system": "Darwin", "release": "23.4.0", "version": "Darwin Kernel"},
            "cpu": {"brand": "Apple M2 Max", "architecture": "arm64"},
            "ram": {"total_gb": 64.0, "available_gb": 40.0, "percent_used": 37.5},
            "gpu": [{"name": "Apple Unified Memory (MPS)", "vram_total_gb": 0, "source": "torch-mps"}]
        },
        "timestamp": "2024-06-01T12:00:00Z"
    }"#;
    let report: DeviceReport = serde_json::from_str(payload).unwrap();
    let profile = report.to_hardware_input().into_profile().unwrap();
    assert_eq!(profile.vram_gb(), 0.0);
    assert_eq!(profile.shared_vram_gb(), 64.0);
    assert_eq!(profile.vendor(), Vendor::Apple);

    let model = ModelDescriptor::new("mistralai/Mistral-7B-Instruct-v0.3", 7.0, 32768).unwrap();
    let result = engine::classify(&profile, &model, RequestContext::default());
    // no dedicated VRAM: weights live in unified RAM
    assert_eq!(result.tier, Tier::HybridOffload);
    assert_eq!(result.gpu_offload_percent, 0);
    assert_eq!(result.predicted_tps, Throughput::TokensPerSecond(5.0));
    assert_eq!(
        result.fine_tuning,
        checkmate_core::engine::FineTuningVerdict::AppleUnified
    );
}

#[test]
fn result_json_shape() {
    let profile = HardwareInput {
        ram_gb: Some(8.0),
        vram_gb: Some(0.0),
        ..Default::default()
    }
    .into_profile()
    .unwrap();
    let model = ModelDescriptor::new("meta-llama/Llama-3.3-70B-Instruct", 70.0, 131072).unwrap();
    let result = engine::classify(&profile, &model, RequestContext::new(8192).unwrap());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["tier"], "Cloud Only");
    assert_eq!(json["predicted_tps"], "N/A");
    assert_eq!(json["fine_tuning"], "Not Feasible");
    assert_eq!(json["severity"], "critical");
    assert_eq!(json["weight_size_gb"]["int4"], 49.0);
    assert_eq!(json["context_window_tokens"], 8192);
}
