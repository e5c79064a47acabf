//! Default tuning for the blow detector and the bounds the CLI enforces.

/// Sample amplitude at or above which a sample counts as "blowing".
pub const DEFAULT_CLIP_LEVEL: f32 = 0.60;

/// Per-frame decay multiplier applied to the displayed volume.
pub const DEFAULT_AVERAGING: f32 = 0.99;

/// Quiet time required after the last loud sample before clipping clears.
pub const DEFAULT_CLIP_LAG_MS: u64 = 3_500;

/// Samples per processing frame.
pub const DEFAULT_FRAME_SIZE: usize = 512;

/// Delay between the first loud transition and the one-shot event.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Poll tick period; one frame of a 60 Hz render loop.
pub const DEFAULT_TICK_MS: u64 = 16;

/// Frame interval the per-frame tuning was made against (512 samples at 48 kHz).
pub const DEFAULT_DECAY_REFERENCE_MS: u64 = 11;

/// Frames buffered between the audio callback and the meter worker.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_METER_WIDTH: usize = 40;

pub const MAX_FRAME_SIZE: usize = 16_384;
pub const MAX_TIMEOUT_MS: u64 = 60_000;
pub const MIN_TICK_MS: u64 = 1;
pub const MAX_TICK_MS: u64 = 250;
pub const MIN_CHANNEL_CAPACITY: usize = 1;
pub const MAX_CHANNEL_CAPACITY: usize = 1_024;
pub const MAX_METER_WIDTH: usize = 200;

/// Device-name characters we refuse to pass through to the audio host.
pub(super) const FORBIDDEN_DEVICE_CHARS: &[char] = &['\n', '\r', '\0'];
