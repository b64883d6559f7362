//! Human readable rendering of tracks and durations.

use std::time::Duration;

use crate::track::Track;

pub use mmpconfig::DEFAULT_TRACK_FORMAT;

/// Renders `template` for `track`.
///
/// Known placeholders are `{artist}`, `{album}`, `{number}` and `{title}`;
/// any other `{key}` is looked up in the track metadata. Missing values
/// render as an empty string. `{{` and `}}` produce literal braces.
pub fn format_track(template: &str, track: &Track) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }
                if closed {
                    out.push_str(&placeholder(track, key.trim()));
                } else {
                    out.push('{');
                    out.push_str(&key);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn placeholder(track: &Track, key: &str) -> String {
    match key {
        "artist" => track.artist().unwrap_or_default().to_string(),
        "album" => track.album().unwrap_or_default().to_string(),
        "number" => track.number().map(|n| n.to_string()).unwrap_or_default(),
        "title" => track.title().to_string(),
        other => track.metadata().get(other).cloned().unwrap_or_default(),
    }
}

/// `"singular"` when `n == 1`, the plural otherwise (`singular + "s"` by default).
pub fn pluralise(n: u64, singular: &str, plural: Option<&str>) -> String {
    if n == 1 {
        singular.to_string()
    } else {
        plural
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}s", singular))
    }
}

/// Joins items as an English list: `a`, `a and b`, `a, b, and c`.
///
/// An empty list reads `nothing`.
pub fn english_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => "nothing".to_string(),
        [one] => one.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let init: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", init.join(", "), last.as_ref())
        }
    }
}

const UNITS: [(u64, &str); 5] = [
    (31_536_000, "year"),
    (2_592_000, "month"),
    (86_400, "day"),
    (3_600, "hour"),
    (60, "minute"),
];

/// Spells out a duration, e.g. `1 hour, 1 minute, and 1.50 seconds`.
///
/// Months count 30 days and years 365.
pub fn format_duration(duration: Duration) -> String {
    let mut parts = Vec::new();
    let mut secs = duration.as_secs();

    for (size, unit) in UNITS {
        let count = secs / size;
        secs %= size;
        if count > 0 {
            parts.push(format!("{} {}", count, pluralise(count, unit, None)));
        }
    }

    let seconds = secs as f64 + f64::from(duration.subsec_nanos()) / 1e9;
    if seconds > 0.0 {
        parts.push(format!("{:.2} seconds", seconds));
    }
    english_list(&parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PlayerError, Result};
    use crate::stream::Stream;
    use crate::track::TrackSource;
    use std::sync::Arc;

    struct NoStream;

    impl TrackSource for NoStream {
        fn get_stream(&self, _track: &Track) -> Result<Box<dyn Stream>> {
            Err(PlayerError::stream("none"))
        }
    }

    fn track() -> Track {
        Track::new("Breathe", Arc::new(NoStream))
            .with_artist("Pink Floyd")
            .with_album("The Dark Side of the Moon")
            .with_number(2)
            .with_metadata("duration", "2:43")
    }

    #[test]
    fn default_template() {
        assert_eq!(
            format_track(DEFAULT_TRACK_FORMAT, &track()),
            "Pink Floyd - The Dark Side of the Moon - 2 - Breathe"
        );
    }

    #[test]
    fn metadata_missing_values_and_braces() {
        let t = track();
        assert_eq!(format_track("{title} ({duration})", &t), "Breathe (2:43)");
        assert_eq!(format_track("{title}{bitrate}", &t), "Breathe");
        assert_eq!(format_track("{{title}}", &t), "{title}");
        assert_eq!(format_track("{title", &t), "{title");
    }

    #[test]
    fn english_lists() {
        let empty: [&str; 0] = [];
        assert_eq!(english_list(&empty), "nothing");
        assert_eq!(english_list(&["a"]), "a");
        assert_eq!(english_list(&["a", "b"]), "a and b");
        assert_eq!(english_list(&["a", "b", "c"]), "a, b, and c");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::ZERO), "nothing");
        assert_eq!(format_duration(Duration::from_secs(60)), "1 minute");
        assert_eq!(
            format_duration(Duration::from_millis(3_661_500)),
            "1 hour, 1 minute, and 1.50 seconds"
        );
        assert_eq!(format_duration(Duration::from_secs(2 * 86_400)), "2 days");
    }

    #[test]
    fn plurals() {
        assert_eq!(pluralise(1, "file", None), "file");
        assert_eq!(pluralise(3, "file", None), "files");
        assert_eq!(pluralise(0, "child", Some("children")), "children");
    }
}
