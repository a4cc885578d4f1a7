use std::sync::OnceLock;

use regex::Regex;

/// Parses `H:MM:SS`, `MM:SS` or a bare minute count into minutes.
/// Parts that are not numbers count as zero.
pub fn parse_duration(raw: &str) -> f64 {
    let parts: Vec<f64> = raw
        .trim()
        .split(':')
        .map(|p| leading_int(p) as f64)
        .collect();

    match parts.as_slice() {
        [h, m, s] => h * 60.0 + m + s / 60.0,
        [m, s] => m + s / 60.0,
        [m] => *m,
        _ => 0.0,
    }
}

/// Leading digits of a part, the way a lenient integer parse reads `"05s"`.
fn leading_int(part: &str) -> u64 {
    let digits: String = part
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

/// `"2h 5m"` when there is at least an hour, otherwise `"5m"`.
pub fn format_duration(minutes: f64) -> String {
    let minutes = minutes.max(0.0);
    let hours = (minutes / 60.0).floor() as u64;
    let mins = (minutes % 60.0).floor() as u64;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

fn youtube_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)").ok())
        .as_ref()
}

/// Extracts the video id from `watch?v=` and `youtu.be/` links.
pub fn youtube_video_id(url: &str) -> Option<String> {
    youtube_pattern()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_shapes() {
        assert_eq!(parse_duration("1:05:30"), 65.5);
        assert_eq!(parse_duration("12:30"), 12.5);
        assert_eq!(parse_duration("7"), 7.0);
        assert_eq!(parse_duration(""), 0.0);
        assert_eq!(parse_duration("ab:30"), 0.5);
        assert_eq!(parse_duration("1:2:3:4"), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(125.0), "2h 5m");
        assert_eq!(format_duration(59.9), "59m");
        assert_eq!(format_duration(60.0), "1h 0m");
        assert_eq!(format_duration(0.0), "0m");
    }

    #[test]
    fn test_youtube_video_id() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/abc123?si=x"),
            Some("abc123".to_string())
        );
        assert_eq!(youtube_video_id("https://vimeo.com/1234"), None);
    }
}
