//! Time range parsing for the query surface.
//!
//! Two query forms are accepted: `time=<start>/<end>` with either side of the
//! slash omissible, and the `startDateTime`/`endDateTime` pair. Open ends in
//! the `time` form are filled with wide defaults so a single-sided range still
//! queries a concrete interval; the pair form leaves an absent bound empty and
//! lets the service decide whether that is acceptable.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// An inclusive query interval. `None` means the bound was not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// A query param did not parse; the message is served verbatim to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PeriodError(String);

/// Start bound substituted when the `time` form leaves the start open.
pub fn open_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()
}

/// End bound substituted when the `time` form leaves the end open.
pub fn open_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap()
}

/// Parse the range query params into a [`Period`].
///
/// A non-empty `time` takes precedence over the pair form. Empty strings are
/// treated as absent params.
pub fn parse(
    time: Option<&str>,
    start_date_time: Option<&str>,
    end_date_time: Option<&str>,
) -> Result<Period, PeriodError> {
    let time = time.filter(|value| !value.is_empty());
    let start_param = start_date_time.filter(|value| !value.is_empty());
    let end_param = end_date_time.filter(|value| !value.is_empty());

    if let Some(spec) = time {
        return parse_time_form(spec);
    }

    if start_param.is_none() && end_param.is_none() {
        return Err(PeriodError(
            "You must provide either the `time` query param or the `startDateTime` and \
             `endDateTime` query params to filter the requested data"
                .to_string(),
        ));
    }

    let start = start_param
        .map(|raw| {
            parse_rfc3339(raw).map_err(|_| {
                PeriodError(
                    "The `startDateTime` query param must be in the RFC3339 pattern \
                     (Ex: 2019-01-02T00:00:00Z)"
                        .to_string(),
                )
            })
        })
        .transpose()?;
    let end = end_param
        .map(|raw| {
            parse_rfc3339(raw).map_err(|_| {
                PeriodError(
                    "The `endDateTime` query param must be in the RFC3339 pattern \
                     (Ex: 2019-06-02T00:00:00Z)"
                        .to_string(),
                )
            })
        })
        .transpose()?;

    Ok(Period { start, end })
}

fn parse_time_form(spec: &str) -> Result<Period, PeriodError> {
    let parts: Vec<&str> = spec.split('/').collect();
    if parts.len() != 2 {
        return Err(PeriodError(time_format_message()));
    }

    let bounds = match (parts[0], parts[1]) {
        ("", "") => return Err(PeriodError(time_format_message())),
        (start, "") => (parse_time_bound(start)?, open_end()),
        ("", end) => (open_start(), parse_time_bound(end)?),
        (start, end) => (parse_time_bound(start)?, parse_time_bound(end)?),
    };

    Ok(Period {
        start: Some(bounds.0),
        end: Some(bounds.1),
    })
}

fn parse_time_bound(raw: &str) -> Result<DateTime<Utc>, PeriodError> {
    parse_rfc3339(raw).map_err(|_| PeriodError(time_format_message()))
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|parsed| parsed.with_timezone(&Utc))
}

fn time_format_message() -> String {
    "The query param `time` must be in one of the following patterns \
     [ /<RFC3339> | <RFC3339>/ | <RFC3339>/<RFC3339> ] \
     (Ex: \"/2019-06-02T00:00:00Z\", \"2019-06-02T00:00:00Z/\", \
     \"2019-01-02T00:00:00Z/2019-06-02T00:00:00Z\")"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    // ---------------------------------------------------------------
    // `time` form
    // ---------------------------------------------------------------

    #[test]
    fn test_time_with_both_bounds() {
        let period =
            parse(Some("2019-01-02T00:00:00Z/2019-06-02T00:00:00Z"), None, None).unwrap();
        assert_eq!(period.start, Some(utc(2019, 1, 2)));
        assert_eq!(period.end, Some(utc(2019, 6, 2)));
    }

    #[test]
    fn test_time_with_open_end_defaults_far_future() {
        let period = parse(Some("2019-06-02T00:00:00Z/"), None, None).unwrap();
        assert_eq!(period.start, Some(utc(2019, 6, 2)));
        assert_eq!(period.end, Some(utc(2200, 1, 1)));
    }

    #[test]
    fn test_time_with_open_start_defaults_far_past() {
        let period = parse(Some("/2019-06-02T00:00:00Z"), None, None).unwrap();
        assert_eq!(period.start, Some(utc(1900, 1, 1)));
        assert_eq!(period.end, Some(utc(2019, 6, 2)));
    }

    #[test]
    fn test_time_without_slash_is_rejected() {
        let err = parse(Some("2019-06-02T00:00:00Z"), None, None).unwrap_err();
        assert!(err.to_string().contains("query param `time`"));
    }

    #[test]
    fn test_time_with_extra_slash_is_rejected() {
        assert!(parse(Some("a/b/c"), None, None).is_err());
    }

    #[test]
    fn test_time_bare_slash_is_rejected() {
        assert!(parse(Some("/"), None, None).is_err());
    }

    #[test]
    fn test_time_with_malformed_bound_is_rejected() {
        let err = parse(Some("2019-13-99T00:00:00Z/"), None, None).unwrap_err();
        assert!(err.to_string().contains("query param `time`"));
    }

    #[test]
    fn test_time_takes_precedence_over_pair_form() {
        let period = parse(
            Some("2019-01-02T00:00:00Z/2019-06-02T00:00:00Z"),
            Some("2021-01-01T00:00:00Z"),
            None,
        )
        .unwrap();
        assert_eq!(period.start, Some(utc(2019, 1, 2)));
    }

    // ---------------------------------------------------------------
    // `startDateTime` / `endDateTime` form
    // ---------------------------------------------------------------

    #[test]
    fn test_pair_form_with_both_params() {
        let period = parse(
            None,
            Some("2019-01-02T00:00:00Z"),
            Some("2019-06-02T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(period.start, Some(utc(2019, 1, 2)));
        assert_eq!(period.end, Some(utc(2019, 6, 2)));
    }

    #[test]
    fn test_pair_form_with_only_start() {
        let period = parse(None, Some("2019-01-02T00:00:00Z"), None).unwrap();
        assert_eq!(period.start, Some(utc(2019, 1, 2)));
        assert_eq!(period.end, None);
    }

    #[test]
    fn test_pair_form_with_only_end() {
        let period = parse(None, None, Some("2019-06-02T00:00:00Z")).unwrap();
        assert_eq!(period.start, None);
        assert_eq!(period.end, Some(utc(2019, 6, 2)));
    }

    #[test]
    fn test_no_params_at_all_is_rejected() {
        let err = parse(None, None, None).unwrap_err();
        assert!(err.to_string().contains("must provide either"));
    }

    #[test]
    fn test_empty_strings_are_treated_as_absent() {
        let err = parse(Some(""), Some(""), Some("")).unwrap_err();
        assert!(err.to_string().contains("must provide either"));
    }

    #[test]
    fn test_malformed_start_names_the_param() {
        let err = parse(None, Some("not-a-date"), None).unwrap_err();
        assert!(err.to_string().contains("`startDateTime`"));
    }

    #[test]
    fn test_malformed_end_names_the_param() {
        let err = parse(None, None, Some("2019-06-02")).unwrap_err();
        assert!(err.to_string().contains("`endDateTime`"));
    }

    #[test]
    fn test_offset_timestamps_are_normalized_to_utc() {
        let period = parse(None, Some("2019-01-02T03:00:00+03:00"), None).unwrap();
        assert_eq!(period.start, Some(utc(2019, 1, 2)));
    }
}
