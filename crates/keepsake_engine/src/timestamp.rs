use chrono::{Local, NaiveDateTime, TimeZone};

const SOURCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const OUTPUT_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const ZONE_MARKER: &str = "UTC";

/// Turns an export capture timestamp into a filesystem-safe filename stem.
///
/// Input is expected as `"YYYY-MM-DD HH:MM:SS"`, optionally suffixed with a
/// `UTC` marker. The value is interpreted as UTC wall-clock time and rendered
/// in the host's local timezone as `"YYYY-MM-DD_HH-MM-SS"`.
///
/// Never fails: unparseable input falls back to stripping the zone marker and
/// replacing separators, trading timezone correctness for a usable name.
pub fn normalize_capture_timestamp(raw: &str) -> String {
    normalize_in_zone(raw, &Local)
}

fn normalize_in_zone<Tz: TimeZone>(raw: &str, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stripped = strip_zone_marker(raw);
    match NaiveDateTime::parse_from_str(stripped, SOURCE_FORMAT) {
        Ok(naive) => naive
            .and_utc()
            .with_timezone(zone)
            .format(OUTPUT_FORMAT)
            .to_string(),
        Err(_) => fallback_stem(stripped),
    }
}

fn strip_zone_marker(raw: &str) -> &str {
    raw.trim().trim_end_matches(ZONE_MARKER).trim_end()
}

fn fallback_stem(stripped: &str) -> String {
    let cleaned: String = stripped
        .chars()
        .map(|c| match c {
            ' ' => '_',
            ':' => '-',
            other => other,
        })
        .collect();
    if cleaned.is_empty() {
        "undated".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc_minus_four() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).unwrap()
    }

    #[test]
    fn converts_utc_wall_clock_into_target_zone() {
        let name = normalize_in_zone("2024-03-15 14:30:45 UTC", &utc_minus_four());
        assert_eq!(name, "2024-03-15_10-30-45");
    }

    #[test]
    fn accepts_input_without_zone_marker() {
        let name = normalize_in_zone("2024-03-15 14:30:45", &utc_minus_four());
        assert_eq!(name, "2024-03-15_10-30-45");
    }

    #[test]
    fn conversion_can_cross_a_date_boundary() {
        let name = normalize_in_zone("2024-03-15 01:10:00 UTC", &utc_minus_four());
        assert_eq!(name, "2024-03-14_21-10-00");
    }

    #[test]
    fn is_a_pure_function() {
        let first = normalize_capture_timestamp("2024-03-15 14:30:45 UTC");
        let second = normalize_capture_timestamp("2024-03-15 14:30:45 UTC");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_input_falls_back_without_failing() {
        assert_eq!(normalize_capture_timestamp("not-a-date"), "not-a-date");
        assert_eq!(
            normalize_capture_timestamp("2024-13-99 99:99:99 UTC"),
            "2024-13-99_99-99-99"
        );
    }

    #[test]
    fn empty_input_still_yields_a_usable_stem() {
        assert_eq!(normalize_capture_timestamp(""), "undated");
        assert_eq!(normalize_capture_timestamp("   UTC"), "undated");
    }

    #[test]
    fn output_contains_no_filename_hostile_characters() {
        let name = normalize_capture_timestamp("2024-03-15 14:30:45 UTC");
        assert!(!name.contains(' '));
        assert!(!name.contains(':'));
    }
}
