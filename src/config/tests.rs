use super::defaults::MAX_TIMEOUT_MS;
use super::{AppConfig, DecayKind, DecayMode, MeterConfig};
use crate::error::MeterError;
use clap::Parser;

fn base_config() -> AppConfig {
    AppConfig::parse_from(["test-app"])
}

#[test]
fn defaults_match_reference_tuning() {
    let cfg = MeterConfig::default();
    assert!((cfg.clip_level - 0.60).abs() < f32::EPSILON);
    assert!((cfg.averaging - 0.99).abs() < f32::EPSILON);
    assert_eq!(cfg.clip_lag_ms, 3_500);
    assert_eq!(cfg.frame_size, 512);
    assert_eq!(cfg.settle_delay_ms, 1_000);
    assert_eq!(cfg.decay, DecayMode::PerFrame);
    assert!(cfg.validate().is_ok());
}

#[test]
fn cli_defaults_produce_default_meter_config() {
    let mut cfg = base_config();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.meter_config(), MeterConfig::default());
}

#[test]
fn rejects_clip_level_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--clip-level", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--clip-level", "1.01"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_clip_level_upper_bound() {
    let mut cfg = AppConfig::parse_from(["test-app", "--clip-level", "1.0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_averaging_of_one() {
    let mut cfg = AppConfig::parse_from(["test-app", "--averaging", "1.0"]);
    let err = cfg.validate().expect_err("averaging 1.0 never decays");
    assert!(format!("{err:#}").contains("averaging"));
}

#[test]
fn accepts_zero_averaging() {
    let mut cfg = AppConfig::parse_from(["test-app", "--averaging", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_zero_frame_size() {
    let mut cfg = AppConfig::parse_from(["test-app", "--frame-size", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_zero_lag_and_settle_delay() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--clip-lag-ms",
        "0",
        "--settle-delay-ms",
        "0",
    ]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_timeouts_past_hard_limit() {
    let over = (MAX_TIMEOUT_MS + 1).to_string();
    let mut cfg = AppConfig::parse_from(["test-app", "--clip-lag-ms", over.as_str()]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--settle-delay-ms", over.as_str()]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_tick_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--tick-ms", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--tick-ms", "251"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn wall_clock_decay_carries_reference() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--decay",
        "wall-clock",
        "--decay-reference-ms",
        "20",
    ]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.decay, DecayKind::WallClock);
    assert_eq!(
        cfg.meter_config().decay,
        DecayMode::WallClock { reference_ms: 20 }
    );
}

#[test]
fn rejects_zero_decay_reference() {
    let mut cfg = AppConfig::parse_from(["test-app", "--decay-reference-ms", "0"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn trims_input_device_name() {
    let mut cfg = AppConfig::parse_from(["test-app", "--input-device", "  USB Mic  "]);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.input_device.as_deref(), Some("USB Mic"));
}

#[test]
fn rejects_blank_input_device_name() {
    let mut cfg = AppConfig::parse_from(["test-app", "--input-device", "   "]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_meter_width_out_of_bounds() {
    let mut cfg = AppConfig::parse_from(["test-app", "--meter-width", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from(["test-app", "--meter-width", "201"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn logging_requires_flag_and_respects_no_logs() {
    let mut cfg = base_config();
    assert!(!cfg.logging_enabled());
    cfg.log_timings = true;
    assert!(cfg.logging_enabled());
    cfg.no_logs = true;
    assert!(!cfg.logging_enabled());
}

#[test]
fn meter_config_validation_returns_typed_error() {
    let cfg = MeterConfig {
        clip_level: f32::NAN,
        ..MeterConfig::default()
    };
    match cfg.validate() {
        Err(MeterError::InvalidConfig(msg)) => assert!(msg.contains("clip_level")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn meter_config_round_trips_through_json_with_defaults() {
    let cfg: MeterConfig =
        serde_json::from_str(r#"{"clip_level":0.8,"decay":{"mode":"wall_clock","reference_ms":10}}"#)
            .expect("partial config parses");
    assert!((cfg.clip_level - 0.8).abs() < f32::EPSILON);
    assert_eq!(cfg.decay, DecayMode::WallClock { reference_ms: 10 });
    assert_eq!(cfg.clip_lag_ms, 3_500);
    assert_eq!(cfg.frame_size, 512);
}
