//! Dashboard snapshots (text and JSON)

use can_dash_core::accel::STANDARD_GRAVITY;
use can_dash_core::{IngestStats, MinMax, PerfResult, Telemetry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// One watched signal as a gauge would show it
#[derive(Debug, Clone, Serialize)]
pub struct Gauge {
    pub name: String,
    pub value: Option<f64>,
    pub unit: String,
    pub minimum: f64,
    pub maximum: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
    pub state: String,
    pub elapsed: f64,
    pub distance: f64,
    pub current: PerfResult,
    pub results: Vec<PerfResult>,
}

/// Current acceleration and its extrema, all in g
#[derive(Debug, Clone, Serialize)]
pub struct AccelerationView {
    pub longitudinal_g: f64,
    pub lateral_g: f64,
    pub longitudinal: MinMax,
    pub lateral: MinMax,
}

fn in_g(extrema: MinMax) -> MinMax {
    MinMax {
        min: extrema.min / STANDARD_GRAVITY,
        max: extrema.max / STANDARD_GRAVITY,
    }
}

/// Everything one dashboard refresh shows
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub gauges: Vec<Gauge>,
    pub performance: PerformanceView,
    pub acceleration: AccelerationView,
    pub stats: IngestStats,
}

impl Snapshot {
    /// Copy the current state of `telemetry` for the watched signals
    ///
    /// Signals missing from the catalog are still listed, without unit or range.
    pub fn capture(telemetry: &Telemetry, watch: &[String]) -> Self {
        let gauges = watch
            .iter()
            .map(|name| {
                let latest = telemetry.latest(name);
                let descriptor = telemetry.catalog().get(name);
                Gauge {
                    name: name.clone(),
                    value: latest.map(|s| s.value),
                    unit: descriptor.and_then(|d| d.unit.clone()).unwrap_or_default(),
                    minimum: descriptor.map_or(0.0, |d| d.minimum),
                    maximum: descriptor.map_or(0.0, |d| d.maximum),
                    timestamp: latest.map(|s| s.timestamp),
                }
            })
            .collect();

        let perf = telemetry.performance();
        let accel = telemetry.acceleration();

        Self {
            gauges,
            performance: PerformanceView {
                state: perf.state().label().to_string(),
                elapsed: perf.current_elapsed(),
                distance: perf.current_distance(),
                current: perf.current_result(),
                results: perf.results(),
            },
            acceleration: AccelerationView {
                longitudinal_g: accel.longitudinal_g(),
                lateral_g: accel.lateral_g(),
                longitudinal: in_g(accel.longitudinal_min_max()),
                lateral: in_g(accel.lateral_min_max()),
            },
            stats: telemetry.stats(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "───────────────────────────────────────────────");
        for gauge in &self.gauges {
            match gauge.value {
                Some(value) => {
                    let _ = writeln!(out, "  {:<40} {:>10.2} {}", gauge.name, value, gauge.unit);
                }
                None => {
                    let _ = writeln!(out, "  {:<40} {:>10}", gauge.name, "--");
                }
            }
        }

        let perf = &self.performance;
        let _ = writeln!(
            out,
            "  Performance: {} ({:.2}s, {:.3} mi)",
            perf.state, perf.elapsed, perf.distance
        );
        for (label, value) in perf.current.entries() {
            if value != 0.0 {
                let _ = writeln!(out, "    {:<14} {:.2}", label, value);
            }
        }

        let accel = &self.acceleration;
        let _ = writeln!(
            out,
            "  G-force: long {:+.2}g [{:+.2}g, {:+.2}g]  lat {:+.2}g [{:+.2}g, {:+.2}g]",
            accel.longitudinal_g,
            accel.longitudinal.min,
            accel.longitudinal.max,
            accel.lateral_g,
            accel.lateral.min,
            accel.lateral.max
        );

        let stats = &self.stats;
        let _ = writeln!(
            out,
            "  Frames: {} received, {} decoded, {} unknown, {} failed",
            stats.frames_received, stats.frames_decoded, stats.unknown_frames, stats.decode_failures
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_dash_core::{FrameDecoder, TelemetryConfig};

    const DBC: &str = r#"
VERSION ""

NS_ :

BS_:

BU_: ECM

BO_ 201 Engine_General: 8 ECM
 SG_ engine_speed : 7|16@0+ (0.25,0) [0|16383.75] "rpm" ECM
"#;

    fn telemetry() -> Telemetry {
        let mut decoder = FrameDecoder::new();
        decoder.add_dbc_str(DBC, "engine.dbc").unwrap();
        Telemetry::new(decoder.catalog(), &TelemetryConfig::default())
    }

    #[test]
    fn test_capture_without_data() {
        let telemetry = telemetry();
        let watch = vec!["engine_speed".to_string(), "boost".to_string()];
        let snapshot = Snapshot::capture(&telemetry, &watch);

        assert_eq!(snapshot.gauges.len(), 2);
        assert_eq!(snapshot.gauges[0].unit, "rpm");
        assert_eq!(snapshot.gauges[0].maximum, 16383.75);
        assert!(snapshot.gauges[0].value.is_none());
        assert!(snapshot.gauges[1].unit.is_empty());
        assert_eq!(snapshot.performance.state, "Stop to Reset");
    }

    #[test]
    fn test_text_report() {
        let telemetry = telemetry();
        let snapshot = Snapshot::capture(&telemetry, &["engine_speed".to_string()]);
        let text = snapshot.to_text();

        assert!(text.contains("engine_speed"));
        assert!(text.contains("--"));
        assert!(text.contains("Performance: Stop to Reset"));
        assert!(text.contains("0 received"));
    }

    #[test]
    fn test_acceleration_extrema_in_g() {
        let telemetry = telemetry();
        let mut snapshot = Snapshot::capture(&telemetry, &[]);
        snapshot.acceleration = AccelerationView {
            longitudinal_g: 1.0,
            lateral_g: 0.0,
            longitudinal: in_g(MinMax { min: -9.81, max: 9.81 }),
            lateral: in_g(MinMax { min: -4.905, max: 0.0 }),
        };

        assert!((snapshot.acceleration.longitudinal.max - 1.0).abs() < 1e-9);
        assert!((snapshot.acceleration.lateral.min + 0.5).abs() < 1e-9);
        let text = snapshot.to_text();
        assert!(text.contains("long +1.00g [-1.00g, +1.00g]"), "{}", text);
        assert!(text.contains("lat +0.00g [-0.50g, +0.00g]"), "{}", text);
    }

    #[test]
    fn test_json_report() {
        let telemetry = telemetry();
        let snapshot = Snapshot::capture(&telemetry, &["engine_speed".to_string()]);
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(value["gauges"][0]["name"], "engine_speed");
        assert!(value["gauges"][0]["value"].is_null());
        assert_eq!(value["stats"]["frames_received"], 0);
        assert_eq!(value["performance"]["results"].as_array().unwrap().len(), 0);
    }
}
