/// Format seconds in the `HhMmSs` shorthand accepted by rule configs,
/// dropping zero segments (`5400` -> `1h30m`).
pub fn format_shorthand_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

/// Toxicity probability as a whole percentage, rounded half away from zero.
pub fn score_percent(score: f32) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::{format_shorthand_duration, score_percent};

    #[test]
    fn shorthand_duration_formatting() {
        assert_eq!(format_shorthand_duration(0), "0s");
        assert_eq!(format_shorthand_duration(45), "45s");
        assert_eq!(format_shorthand_duration(600), "10m");
        assert_eq!(format_shorthand_duration(5_400), "1h30m");
        assert_eq!(format_shorthand_duration(3_601), "1h1s");
        assert_eq!(format_shorthand_duration(172_800), "48h");
    }

    #[test]
    fn score_percent_rounds() {
        assert_eq!(score_percent(0.9), 90);
        assert_eq!(score_percent(0.956), 96);
        assert_eq!(score_percent(0.004), 0);
        assert_eq!(score_percent(1.0), 100);
    }
}
