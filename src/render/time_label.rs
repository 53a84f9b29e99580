const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Formats a simulation time as `HH:MM:SS.mmm`.
///
/// The time is rounded to the nearest millisecond first and every field after that is integer
/// division, so `0.3` reads `00:00:00.300`. Rounding, not truncation: `1.001` is stored as
/// `1.000999...` and still reads `00:00:01.001`, and `0.0005` reads `00:00:00.001`.
/// Negative and non-finite times read as zero. Hours are not wrapped at 24.
pub fn format_hms_ms(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * MS_PER_SECOND as f64).round() as u64
    } else {
        0
    };

    let hours = total_ms / MS_PER_HOUR;
    let minutes = (total_ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let secs = (total_ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let ms = total_ms % MS_PER_SECOND;

    format!("{hours:02}:{minutes:02}:{secs:02}.{ms:03}")
}

/// The frame title, `Time HH:MM:SS.mmm`
pub fn title(seconds: f64) -> String {
    format!("Time {}", format_hms_ms(seconds))
}
