// End-to-end: candump log -> DBC decode -> store and trackers
use can_dash_core::{
    CandumpReplay, FrameDecoder, IngestionLoop, PerfState, StopReason, TelemetryConfig,
};
use std::io::Write;
use std::path::PathBuf;

fn dash_dbc() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/dash.dbc")
}

fn stamp(tenths: u32, extra_ms: u32) -> String {
    let secs = 1_700_000_000 + tenths / 10;
    let micros = (tenths % 10) * 100_000 + extra_ms * 1_000;
    format!("({}.{:06})", secs, micros)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Straight-line pull at +1 km/h every 100ms from standstill to 200 km/h,
/// with a lateral sample 50ms after every speed sample
fn drag_log() -> String {
    let mut log = String::new();
    for i in 0..=200u32 {
        let [lo, hi] = ((i * 64) as u16).to_le_bytes();
        log.push_str(&format!(
            "{} vcan0 3E9#{}\n",
            stamp(i, 0),
            hex(&[lo, hi, 0, 0, 0, 0, 0, 0])
        ));

        let lateral = ((i % 5) as i16 - 2) * 50;
        let [lo, hi] = lateral.to_le_bytes();
        log.push_str(&format!(
            "{} vcan0 1E5#{}\n",
            stamp(i, 50),
            hex(&[lo, hi, 0, 0, 0, 0, 0, 0])
        ));
    }
    log.push_str(&format!("{} vcan0 0C9#2EE0000000000000\n", stamp(201, 0)));
    log.push_str(&format!("{} vcan0 7E8#04410C1F40000000\n", stamp(201, 10)));
    log.push_str("garbage line\n");
    log.push_str(&format!("{} vcan0 3E9#00\n", stamp(201, 20)));
    log
}

fn replay(content: &str) -> (StopReason, std::sync::Arc<can_dash_core::Telemetry>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();

    let decoder = FrameDecoder::from_dbc_files(&[dash_dbc()]).unwrap();
    let source = CandumpReplay::open(file.path()).unwrap();
    let mut ingest = IngestionLoop::new(source, decoder, &TelemetryConfig::new()).unwrap();
    let reason = ingest.run();
    (reason, ingest.telemetry())
}

#[test]
fn test_drag_run_from_log() {
    let (reason, telemetry) = replay(&drag_log());
    assert_eq!(reason, StopReason::SourceClosed);

    let perf = telemetry.performance();
    assert_eq!(perf.state(), PerfState::Running);

    // Run starts on the first non-zero sample (t = 0.1s)
    let result = perf.current_result();
    assert!((result.zero_to_sixty - 9.6).abs() < 1e-6);
    assert!((result.zero_to_hundred - 16.0).abs() < 1e-6);
    assert!((result.eighth_mile - 12.0).abs() < 1e-6);
    assert!((result.eighth_mile_mph - 121.0 * 0.621371).abs() < 1e-6);
    assert!((result.quarter_mile - 17.0).abs() < 1e-6);
    assert!((result.quarter_mile_mph - 171.0 * 0.621371).abs() < 1e-6);

    // The previous (empty) result was archived when the run started
    assert_eq!(perf.results().len(), 1);
}

#[test]
fn test_acceleration_from_log() {
    let (_, telemetry) = replay(&drag_log());
    let accel = telemetry.acceleration();

    // 1 km/h per 100ms
    assert!((accel.longitudinal() - 10.0 * 0.277778).abs() < 1e-6);
    // Last lateral raw value is -100
    assert!((accel.lateral() + 1.0).abs() < 1e-9);
    assert!((accel.lateral_min_max().min + 1.0).abs() < 1e-9);
    assert!((accel.lateral_min_max().max - 1.0).abs() < 1e-9);
    assert_eq!(accel.trace().len(), 30);
}

#[test]
fn test_store_from_log() {
    let (_, telemetry) = replay(&drag_log());

    let speed = telemetry.latest("speed_average_non_driven").unwrap();
    assert_eq!(speed.value, 200.0);
    assert_eq!(telemetry.latest("engine_speed").unwrap().value, 3000.0);
    assert!(telemetry.latest("speed_average_driven").is_some());
    assert!(telemetry.latest("steering_wheel_angle").is_some());

    let history = telemetry.history("speed_average_non_driven");
    assert_eq!(history.first().unwrap().value, 0.0);
    assert!(history.len() < 201);
    for pair in history.windows(2) {
        let gap = (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
        assert!(gap > 100, "history samples {}ms apart", gap);
    }
}

#[test]
fn test_bad_frames_do_not_stop_replay() {
    let (reason, telemetry) = replay(&drag_log());
    assert_eq!(reason, StopReason::SourceClosed);

    let stats = telemetry.stats();
    // 402 drag frames, one engine frame, one unknown, one short payload
    assert_eq!(stats.frames_received, 405);
    assert_eq!(stats.unknown_frames, 1);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.frames_decoded, 403);
}

#[test]
fn test_missing_log_is_an_error() {
    assert!(CandumpReplay::open(std::path::Path::new("/nonexistent/drive.log")).is_err());
}
