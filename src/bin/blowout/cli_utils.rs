use anyhow::Result;
use blowout::audio;

pub(crate) fn list_input_devices() -> Result<()> {
    // Support BLOWOUT_TEST_DEVICES for testing
    let devices = if let Ok(raw) = std::env::var("BLOWOUT_TEST_DEVICES") {
        parse_device_list(&raw)
    } else {
        audio::Recorder::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Colors are on unless `NO_COLOR` is set or events go out as JSON.
pub(crate) fn color_enabled(json_events: bool) -> bool {
    !json_events && std::env::var_os("NO_COLOR").is_none()
}
