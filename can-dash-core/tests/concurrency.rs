// One writer, many readers: every read is a whole sample
use can_dash_core::{
    CanFrame, ChannelSource, FrameDecoder, IngestionLoop, Sample, SignalStore, StopReason,
    StoreConfig, TelemetryConfig,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn start() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

#[test]
fn test_readers_never_see_torn_samples() {
    let config = StoreConfig {
        history_capacity: 50,
        sample_interval: Duration::from_millis(10),
    };
    let store = Arc::new(SignalStore::new(["engine_speed"], config));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..20_000i64 {
                // Value mirrors the timestamp so a mixed read is detectable
                let sample = Sample::new(start() + ChronoDuration::milliseconds(i), i as f64);
                assert!(store.record("engine_speed", sample));
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_seen = -1.0;
                while !done.load(Ordering::Acquire) {
                    if let Some(sample) = store.latest("engine_speed") {
                        let ms = (sample.timestamp - start()).num_milliseconds() as f64;
                        assert_eq!(sample.value, ms);
                        assert!(sample.value >= last_seen);
                        last_seen = sample.value;
                    }

                    let window = store.current_window("engine_speed");
                    assert!(window.len() <= 2);
                    if let [a, b] = window.as_slice() {
                        assert_eq!(b.value - a.value, 1.0);
                    }

                    let history = store.history("engine_speed");
                    assert!(history.len() <= store.history_capacity());
                    for pair in history.windows(2) {
                        assert!(pair[1].timestamp > pair[0].timestamp);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.latest("engine_speed").unwrap().value, 19_999.0);
    assert_eq!(store.history("engine_speed").len(), store.history_capacity());
}

#[test]
fn test_stop_is_observed_within_one_timeout() {
    let mut decoder = FrameDecoder::new();
    decoder
        .add_dbc(&std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/dash.dbc"))
        .unwrap();

    let (sender, source) = ChannelSource::channel();
    let config = TelemetryConfig::new().with_recv_timeout(Duration::from_millis(50));
    let ingest = IngestionLoop::new(source, decoder, &config).unwrap();
    let telemetry = ingest.telemetry();
    let run_flag = ingest.run_flag();
    let handle = ingest.spawn().unwrap();

    let [lo, hi] = (50u16 * 64).to_le_bytes();
    sender
        .send(CanFrame::new(start(), 1001, vec![lo, hi, 0, 0, 0, 0, 0, 0]))
        .unwrap();

    // Wait for the frame to land
    let deadline = Instant::now() + Duration::from_secs(5);
    while telemetry.latest("speed_average_non_driven").is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(telemetry.latest("speed_average_non_driven").unwrap().value, 50.0);

    // Sender stays alive, so only the flag can end the loop
    let stopped_at = Instant::now();
    run_flag.stop();
    let reason = handle.join().unwrap();

    assert_eq!(reason, StopReason::Stopped);
    assert!(stopped_at.elapsed() < Duration::from_millis(500));
    drop(sender);
}
