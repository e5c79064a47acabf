use blowout::audio::{offline_meter_from_pcm, MeterEvents, ReplayEnd, ReplaySource};
use blowout::clock::ManualClock;
use blowout::config::MeterConfig;
use blowout::{BlowDetector, MeterError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Counts {
    sustained: AtomicUsize,
    lost: AtomicUsize,
}

impl MeterEvents for Counts {
    fn on_sustained_loud_input(&self) {
        self.sustained.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stream_lost(&self, _err: &MeterError) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn blow(frames: usize) -> Vec<Vec<f32>> {
    (0..frames).map(|_| vec![0.8f32; 256]).collect()
}

fn config() -> MeterConfig {
    MeterConfig {
        frame_size: 256,
        tick_ms: 1,
        ..MeterConfig::default()
    }
}

#[test]
fn replayed_blow_fires_after_settle_delay() {
    let events = Arc::new(Counts::default());
    let clock = ManualClock::new();
    let source = ReplaySource::from_frames(blow(4));
    let mut detector = BlowDetector::with_clock(source, events.clone(), Arc::new(clock.clone()));
    detector.start(config()).expect("start");

    wait_until("clipping", || detector.is_clipping() == Some(true));
    assert!(detector.current_volume() > 0.7);
    assert_eq!(events.sustained.load(Ordering::SeqCst), 0);

    clock.advance(Duration::from_millis(1_000));
    wait_until("one-shot", || events.sustained.load(Ordering::SeqCst) == 1);

    detector.stop();
    assert!(!detector.is_running());
    assert!(detector.metrics().is_some_and(|m| m.fired));
}

#[test]
fn unplugged_replay_ends_the_session() {
    let events = Arc::new(Counts::default());
    let source = ReplaySource::from_frames(vec![vec![0.0f32; 256]; 3]).ending_with(ReplayEnd::Lost);
    let mut detector = BlowDetector::new(source, events.clone());
    detector.start(config()).expect("start");
    wait_until("stream loss", || !detector.is_running());
    assert_eq!(events.lost.load(Ordering::SeqCst), 1);
    assert_eq!(detector.is_clipping(), None);
    assert_eq!(detector.current_volume(), 0.0);
}

#[test]
fn drop_ends_a_pending_lifecycle() {
    let events = Arc::new(Counts::default());
    let clock = ManualClock::new();
    {
        let source = ReplaySource::from_frames(blow(1));
        let mut detector =
            BlowDetector::with_clock(source, events.clone(), Arc::new(clock.clone()));
        detector.start(config()).expect("start");
        wait_until("clipping", || detector.is_clipping() == Some(true));
    }
    clock.advance(Duration::from_secs(5));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(events.sustained.load(Ordering::SeqCst), 0);
}

#[test]
fn offline_recording_matches_live_timing() {
    let sample_rate = 16_000;
    let mut samples = vec![0.9f32; 1_600];
    samples.extend(vec![0.0f32; sample_rate as usize * 5]);
    let report = offline_meter_from_pcm(&samples, sample_rate, &config());

    let fired_at = report.fired_at.expect("one-shot fires");
    assert!(fired_at >= Duration::from_millis(1_000));
    assert!(fired_at < Duration::from_millis(1_120));
    assert_eq!(report.clip_spans.len(), 1);
    assert!(report.metrics.fired);
    assert!(report.final_volume < 0.05);
}
