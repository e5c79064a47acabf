//! Horizontal volume bar drawn at tick cadence.

/// Bar gain so normal blowing reaches most of the width.
const BAR_GAIN: f32 = 1.4;

const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Number of filled cells for a volume in `[0, 1]`.
pub(crate) fn filled_cells(volume: f32, width: usize) -> usize {
    let scaled = (volume.max(0.0) * width as f32 * BAR_GAIN) as usize;
    scaled.min(width)
}

/// Format the level bar: red while clipping, green otherwise.
#[must_use]
pub(crate) fn format_level_bar(volume: f32, clipping: bool, width: usize, color: bool) -> String {
    let filled = filled_cells(volume, width);
    let mut bar = String::with_capacity(width * 3 + 16);
    if color && filled > 0 {
        bar.push_str(if clipping { RED } else { GREEN });
    }
    bar.extend(std::iter::repeat(BAR_FULL).take(filled));
    if color && filled > 0 {
        bar.push_str(RESET);
    }
    bar.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    bar
}
