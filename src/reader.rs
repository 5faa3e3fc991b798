//! JCAMP-DX reader: line classification, header store, compound-block
//! recursion, and data-table assembly.
//!
//! The engine consumes a sequence of already-decoded text lines and builds
//! a [`SpectrumRecord`]. Opening files is left to the thin
//! [`read_jcamp_file`] collaborator.
//!
//! Advisory integrity checks (x-checkpoint drift, y-continuity drift,
//! final length mismatch) are logged and never abort the record; decoding
//! errors in the numeric codec are fatal for the record.

use std::fs;
use std::path::Path;

use crate::asdf;
use crate::error::JcampError;
use crate::longdate::parse_longdate;
use crate::record::{HeaderValue, SpectrumRecord};

/// Table grammars reconstructed by the assembler.
const GRAMMAR_TAGS: [&str; 3] = ["(X++(Y..Y))", "(X++(R..R))", "(X++(I..I))"];

/// Malformed DATA TABLE value emitted by some vendors; dropped from the
/// header store on sight.
const VENDOR_ARTIFACT: &str = "(X++(I..I)), XYDATA";

/// The table currently consuming data lines.
#[derive(Debug, Clone, PartialEq)]
enum TableKind {
    /// Grammar string captured from a table-start header.
    Grammar(String),
    /// `##END=` with digit bounds: a flat integer table whose values are
    /// decoded for validation and then discarded.
    Bounded(Vec<i64>),
}

/// Read and parse a JCAMP-DX file, attaching the origin as the
/// `filename` header. Byte sequences that are not valid UTF-8 are decoded
/// with replacement.
pub fn read_jcamp_file(path: &Path) -> Result<SpectrumRecord, JcampError> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let mut record = parse_jcamp(&content)?;
    record.headers.insert(
        "filename".to_string(),
        HeaderValue::Str(path.display().to_string()),
    );
    Ok(record)
}

/// Parse a complete JCAMP-DX document held in a string.
pub fn parse_jcamp(content: &str) -> Result<SpectrumRecord, JcampError> {
    let lines: Vec<&str> = content.lines().collect();
    parse_jcamp_lines(&lines)
}

/// Parse a JCAMP-DX document given as an ordered sequence of lines.
///
/// Compound (`link`) documents recurse through this same entry point, one
/// call per nested `##TITLE` ... `##END` block.
pub fn parse_jcamp_lines(lines: &[&str]) -> Result<SpectrumRecord, JcampError> {
    let mut record = SpectrumRecord::new();
    let mut x: Vec<f64> = Vec::new();
    let mut y: Vec<f64> = Vec::new();
    let mut active: Option<TableKind> = None;
    let mut dx = 1.0_f64;
    let mut asdf_table = false;
    // Leading x and y-count of the previous data line, for the x-check.
    let mut line_last: Option<(f64, usize)> = None;
    let mut last_key: Option<String> = None;
    let mut is_compound = false;
    let mut in_block = false;
    let mut block: Vec<&str> = Vec::new();
    let mut bounded: Vec<f64> = Vec::new();

    for &line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with("$$") {
            continue;
        }

        // Compound documents: buffer ##TITLE ... ##END and recurse. A new
        // title always starts a fresh buffer.
        if is_compound && line.to_uppercase().starts_with("##TITLE") {
            in_block = true;
            block = vec![line];
            continue;
        }
        if in_block {
            block.push(line);
            if line.to_uppercase().starts_with("##END") {
                record.children.push(parse_jcamp_lines(&block)?);
                in_block = false;
                block = Vec::new();
            }
            continue;
        }

        if line.starts_with("##") {
            let body = line.trim_matches('#');
            let (raw_key, raw_value) = body
                .split_once('=')
                .ok_or_else(|| JcampError::MalformedHeader(line.to_string()))?;
            let key = raw_key.trim().to_lowercase();
            let value = raw_value.trim();

            if let Some(coerced) = coerce_value(value) {
                record.headers.insert(key.clone(), coerced);
            }
            last_key = Some(key.clone());

            // Compound container marker.
            if matches!(key.as_str(), "data type" | "datatype")
                && value.eq_ignore_ascii_case("link")
            {
                is_compound = true;
            }

            match key.as_str() {
                "xydata" | "xypoints" | "peak table" | "data table" => {
                    // New data table: reset the series and fix the nominal
                    // per-step delta used by the x-check.
                    x.clear();
                    y.clear();
                    asdf_table = false;
                    active = Some(TableKind::Grammar(value.to_string()));
                    dx = nominal_dx(&record);
                    continue;
                }
                "end" => {
                    active = Some(TableKind::Bounded(digit_groups(value)));
                    bounded.clear();
                    continue;
                }
                "longdate" => {
                    // Parse failure keeps the raw string untouched.
                    let parsed = record
                        .headers
                        .get(&key)
                        .and_then(HeaderValue::as_str)
                        .map(parse_longdate);
                    match parsed {
                        Some(Ok(ts)) => {
                            record
                                .headers
                                .insert(key.clone(), HeaderValue::Timestamp(ts));
                        }
                        Some(Err(err)) => log::debug!("keeping LONGDATE as text: {}", err),
                        None => {}
                    }
                }
                _ => {
                    // Any other header record terminates an active table.
                    active = None;
                }
            }
        } else if active.is_none() {
            // Free-text continuation of the previous header value.
            if let Some(key) = &last_key {
                match record.headers.get_mut(key) {
                    Some(HeaderValue::Str(text)) => {
                        text.push('\n');
                        text.push_str(line.trim());
                    }
                    _ => log::debug!("dropping continuation for non-text header \"{}\"", key),
                }
            }
            continue;
        }

        let Some(kind) = &active else { continue };
        match kind {
            TableKind::Grammar(tag) if GRAMMAR_TAGS.contains(&tag.as_str()) => {
                // ASDF vs. AFFN is decided from the first data line only.
                if y.is_empty() {
                    asdf_table = line.chars().any(asdf::is_dif_char);
                }
                let vals = asdf::decode_line(line)?;
                let Some(&line_x) = vals.first() else { continue };

                // X-check: the leading value of each line must agree with
                // the position predicted from the previous line.
                if let Some((prev_x, count)) = line_last {
                    let predicted = prev_x + count as f64 * dx;
                    if (line_x - predicted).abs() > 1.0 {
                        log::warn!(
                            "X-check failed: line starts at {} but {} was predicted",
                            line_x,
                            predicted
                        );
                    }
                }

                if asdf_table {
                    if y.is_empty() {
                        y.extend(vals.iter().skip(1));
                        line_last = Some((line_x, y.len().saturating_sub(1)));
                    } else {
                        line_last = Some((line_x, vals.len().saturating_sub(2)));
                        // Y-check: the second value repeats the previous
                        // line's final y to validate the DIF chain.
                        if let (Some(&check), Some(&prev)) = (vals.get(1), y.last()) {
                            if check != prev {
                                log::warn!(
                                    "Y-check failed: last value of previous line is {} \
                                     but first value is {}",
                                    prev,
                                    check
                                );
                            }
                        }
                        y.extend(vals.iter().skip(2));
                    }
                } else {
                    line_last = Some((line_x, vals.len().saturating_sub(1)));
                    y.extend(vals.iter().skip(1));
                }
            }
            TableKind::Grammar(tag)
                if tag == "(XY..XY)"
                    && (record.headers.contains_key("xypoints")
                        || record.headers.contains_key("xydata")
                        || record.headers.contains_key("peak table")) =>
            {
                let tokens: Vec<&str> = line
                    .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                    .collect();
                let parsed: Option<Vec<f64>> =
                    tokens.iter().map(|t| t.parse().ok()).collect();
                // A line containing any non-numeric token is skipped whole.
                let Some(parsed) = parsed else { continue };
                for (i, v) in parsed.into_iter().enumerate() {
                    if i % 2 == 0 {
                        x.push(v);
                    } else {
                        y.push(v);
                    }
                }
            }
            TableKind::Bounded(bounds) => {
                let vals = asdf::decode_line(line)?;
                log::debug!("integer table {:?}: {} values", bounds, vals.len());
                bounded.extend(vals);
            }
            TableKind::Grammar(_) => {}
        }
    }

    assemble(&mut record, x, y)?;
    Ok(record)
}

/// Coerce a header value from its text form. `None` drops the value.
fn coerce_value(raw: &str) -> Option<HeaderValue> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return Some(HeaderValue::Int(n));
        }
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Some(HeaderValue::Float(f));
    }
    // Locale variant: first comma as the decimal separator.
    if let Ok(f) = raw.replacen(',', ".", 1).parse::<f64>() {
        return Some(HeaderValue::Float(f));
    }
    if raw == VENDOR_ARTIFACT {
        return None;
    }
    Some(HeaderValue::Str(raw.to_string()))
}

/// Nominal per-step x delta for checkpoint checks, in compressed units.
fn nominal_dx(record: &SpectrumRecord) -> f64 {
    let step = match (
        record.get_f64("lastx"),
        record.get_f64("firstx"),
        record.get_f64("npoints"),
    ) {
        (Some(lastx), Some(firstx), Some(npoints)) => (lastx - firstx) / (npoints - 1.0),
        _ => 1.0,
    };
    step / record.get_f64("xfactor").unwrap_or(1.0)
}

/// Extract every run of ASCII digits as an integer.
fn digit_groups(s: &str) -> Vec<i64> {
    let mut groups = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            if let Ok(n) = current.parse() {
                groups.push(n);
            }
            current.clear();
        }
    }
    if !current.is_empty() {
        if let Ok(n) = current.parse() {
            groups.push(n);
        }
    }
    groups
}

/// Evenly spaced samples from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i + 1 == num { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Final series assembly once every data line is consumed.
fn assemble(
    record: &mut SpectrumRecord,
    mut x: Vec<f64>,
    mut y: Vec<f64>,
) -> Result<(), JcampError> {
    if matches!(record.get_str("xydata"), Some("(X++(Y..Y))")) {
        // Decoded per-line x values were checkpoints only; the real x axis
        // is regenerated from the mandatory metadata.
        let firstx = record
            .get_f64("firstx")
            .ok_or(JcampError::MissingHeader("firstx"))?;
        let lastx = record
            .get_f64("lastx")
            .ok_or(JcampError::MissingHeader("lastx"))?;
        let npoints = record
            .get_usize("npoints")
            .ok_or(JcampError::MissingHeader("npoints"))?;
        x = linspace(firstx, lastx, npoints);
    }

    // (X++(R..R)) data tables carry x uncompressed; everything else gets
    // the xfactor scaling.
    if !matches!(record.get_str("data table"), Some("(X++(R..R))")) {
        if let Some(xfactor) = record.get_f64("xfactor") {
            for v in &mut x {
                *v *= xfactor;
            }
        }
    }

    if x.len() != y.len() {
        log::warn!(
            "mismatch of array lengths: len(x) is {} and len(y) {}",
            x.len(),
            y.len()
        );
    }

    if let Some(yfactor) = record.get_f64("yfactor") {
        for v in &mut y {
            *v *= yfactor;
        }
    }

    record.x = x;
    record.y = y;
    Ok(())
}
