use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parses a due time as typed by a user or sent by a browser form.
///
/// Accepts RFC 3339, the `datetime-local` shapes (`2024-01-01T09:00`, with or
/// without seconds) and a bare date. Times without an offset are taken as UTC.
pub fn parse_due(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Current time at the precision the stores persist.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// Fixed width so that lexical order in the database matches time order
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_storage(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// Short form for list rows and form fields
pub fn display(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_datetime_local() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_due("2024-01-01T09:00"), Some(expected));
        assert_eq!(parse_due("2024-01-01T09:00:00"), Some(expected));
        assert_eq!(parse_due(" 2024-01-01 09:00 "), Some(expected));
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        assert_eq!(parse_due("2024-01-01T09:00:00+02:00"), Some(expected));
    }

    #[test]
    fn test_parse_bare_date_is_midnight() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_due("2024-03-05"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_due(""), None);
        assert_eq!(parse_due("tomorrow"), None);
        assert_eq!(parse_due("2024-13-01T09:00"), None);
    }

    #[test]
    fn test_storage_format_sorts_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert!(to_storage(&early) < to_storage(&late));
        assert_eq!(from_storage(&to_storage(&late)), Some(late));
    }
}
