#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject the input but must never panic.
    let Ok(cfg) = brewscale_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A validated config always yields one or two distinct data lines
        // that do not collide with the clock line.
        let lines = &cfg.sensor.data_lines;
        assert!(matches!(lines.len(), 1 | 2));
        assert!(!lines.contains(&cfg.sensor.clock_line));
        assert!(cfg.sensor.calibration_factor.is_finite());
        assert!(cfg.sensor.calibration_factor != 0.0);
        assert!(cfg.tare.repetitions >= 1);
    }
});
