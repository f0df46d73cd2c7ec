/// Formats a duration in seconds as zero-padded `HH:MM:SS`. Fractional seconds
/// are truncated, not rounded.
pub fn format_hms(seconds: f64) -> String {
    let total = seconds as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}
