//! `LONGDATE` parsing.
//!
//! The format's own specification writes the optional fractional-seconds
//! token as `.SSSS`, which pins down neither a digit count nor a unit; the
//! digit-length heuristic below is a guess that downstream consumers rely
//! on, so it must not be "improved".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

use crate::error::JcampError;

/// Accepted `LONGDATE` formats, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y/%m/%d %H:%M:%S %z", "%Y/%m/%d %H:%M:%S", "%Y/%m/%d"];

/// Match the fractional-seconds prefix: `YYYY/MM/DD`, one or more spaces,
/// `HH:MM` plus two further digits with no second colon, then 1-9 digits of
/// fraction. Returns the total matched length and the fractional digit run.
fn match_fractional_prefix(s: &str) -> Option<(usize, &str)> {
    let b = s.as_bytes();
    let digits = |from: usize, count: usize| -> bool {
        (from..from + count).all(|i| b.get(i).is_some_and(|c| c.is_ascii_digit()))
    };

    if !(digits(0, 4) && b.get(4) == Some(&b'/') && digits(5, 2) && b.get(7) == Some(&b'/') && digits(8, 2)) {
        return None;
    }
    let mut i = 10;
    if b.get(i) != Some(&b' ') {
        return None;
    }
    while b.get(i) == Some(&b' ') {
        i += 1;
    }
    if !(digits(i, 2) && b.get(i + 2) == Some(&b':') && digits(i + 3, 4)) {
        return None;
    }
    let frac_start = i + 7;
    let mut end = frac_start;
    while end - frac_start < 9 && b.get(end).is_some_and(|c| c.is_ascii_digit()) {
        end += 1;
    }
    if end == frac_start {
        return None;
    }
    Some((end, &s[frac_start..end]))
}

/// Interpret a run of fractional-second digits as microseconds.
///
/// 7-9 digits are probably nanoseconds; 4-6 digits are taken as
/// microseconds directly; 1-3 digits are milliseconds.
pub(crate) fn fractional_to_micros(digits: &str) -> Result<u32, JcampError> {
    let n: u64 = digits
        .parse()
        .map_err(|_| JcampError::DateParse(format!("fractional seconds \"{}\"", digits)))?;
    match digits.len() {
        7..=9 => Ok((n / 1000) as u32),
        4..=6 => Ok(n as u32),
        1..=3 => Ok((n * 1000) as u32),
        _ => Err(JcampError::DateParse(format!(
            "fractional seconds \"{}\"",
            digits
        ))),
    }
}

/// Parse the `LONGDATE` field.
///
/// A matched fractional-seconds prefix is excised wholesale before the
/// standard formats are tried (none of them carries fractional seconds).
/// Timezone-qualified values keep their as-written wall-clock time.
pub fn parse_longdate(date_string: &str) -> Result<NaiveDateTime, JcampError> {
    let (rest, microseconds) = match match_fractional_prefix(date_string) {
        Some((matched, frac)) => (&date_string[matched..], fractional_to_micros(frac)?),
        None => (date_string, 0),
    };

    for fmt in DATE_FORMATS {
        let parsed = match fmt {
            "%Y/%m/%d %H:%M:%S %z" => DateTime::parse_from_str(rest, fmt)
                .ok()
                .map(|dt| dt.naive_local()),
            "%Y/%m/%d" => NaiveDate::parse_from_str(rest, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            _ => NaiveDateTime::parse_from_str(rest, fmt).ok(),
        };
        if let Some(dt) = parsed {
            return dt
                .with_nanosecond(microseconds * 1000)
                .ok_or_else(|| JcampError::DateParse(date_string.to_string()));
        }
    }
    Err(JcampError::DateParse(date_string.to_string()))
}
