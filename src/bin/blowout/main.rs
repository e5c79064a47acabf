//! Blowout entrypoint: shows the microphone level and waits for the user to
//! blow out the candle.
//!
//! The detector's meter thread delivers events over a channel; the main
//! thread redraws the level bar at tick cadence and prints flame changes.

mod cli_utils;
mod events;
mod meter_bar;

use anyhow::{bail, Context, Result};
use blowout::audio::Recorder;
use blowout::config::AppConfig;
use blowout::{init_logging, init_tracing, log_debug, log_file_path, log_panic, BlowDetector};
use clap::Parser;
use crossbeam_channel::{select, tick, unbounded};
use std::io::{self, Write};
use std::panic;
use std::sync::Arc;

use crate::cli_utils::{color_enabled, list_input_devices};
use crate::events::{ChannelEvents, UiEvent};
use crate::meter_bar::format_level_bar;

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug("=== Blowout Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let recorder = Recorder::new(config.input_device.as_deref())
        .context("failed to open audio input device")?;
    let device = recorder.device_name();

    let (tx, rx) = unbounded::<UiEvent>();
    let events = Arc::new(ChannelEvents::new(tx));
    let mut detector = BlowDetector::new(recorder, events).log_timings(config.log_timings);
    let meter_config = config.meter_config();
    let redraw = tick(meter_config.tick_interval());
    detector
        .start(meter_config)
        .with_context(|| format!("failed to start microphone on {device}"))?;

    let mut screen = Screen {
        json: config.json_events,
        color: color_enabled(config.json_events),
        width: config.meter_width,
    };
    screen.show(&UiEvent::Started { device });
    screen.message("Blow out the candle");

    loop {
        select! {
            recv(rx) -> event => {
                let Ok(event) = event else {
                    bail!("meter stopped unexpectedly");
                };
                screen.show(&event);
                match event {
                    UiEvent::SustainedLoudInput => {
                        detector.stop();
                        return Ok(());
                    }
                    UiEvent::StreamLost { reason } => {
                        detector.stop();
                        bail!("microphone stream lost: {reason}");
                    }
                    _ => {}
                }
            }
            recv(redraw) -> _ => {
                if let Some(clipping) = detector.is_clipping() {
                    screen.draw_bar(detector.current_volume(), clipping);
                }
            }
        }
    }
}

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
}

struct Screen {
    json: bool,
    color: bool,
    width: usize,
}

impl Screen {
    fn show(&mut self, event: &UiEvent) {
        if self.json {
            println!("{}", event.to_json());
            return;
        }
        match event {
            UiEvent::Started { device } => self.message(&format!("Listening on {device}")),
            UiEvent::Loud => self.message("The flame flickers out..."),
            UiEvent::Quiet => self.message("The candle is lit."),
            UiEvent::SustainedLoudInput => self.message("You blew out the candle!"),
            UiEvent::StreamLost { reason } => self.message(&format!("Microphone lost: {reason}")),
        }
    }

    fn message(&mut self, text: &str) {
        if self.json {
            return;
        }
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "\r\x1b[2K{text}");
        let _ = stdout.flush();
    }

    fn draw_bar(&mut self, volume: f32, clipping: bool) {
        if self.json {
            return;
        }
        let bar = format_level_bar(volume, clipping, self.width, self.color);
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r{bar} {:>3.0}%", volume * 100.0);
        let _ = stdout.flush();
    }
}
