#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    let Ok(cfg) = geofix_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A config that validates must also satisfy the engine's own checks.
        let engine = geofix_core::EngineCfg::from(&cfg);
        assert!(engine.validate().is_ok(), "validated config rejected by engine: {engine:?}");
    }
});
