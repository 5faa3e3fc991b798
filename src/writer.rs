//! Serialize a spectrum record back to JCAMP-DX text.
//!
//! The writer always emits the uncompressed `(X++(Y..Y))` numeric form; it
//! does not re-compress to ASDF. Its input is treated as read-only.

use std::fs;
use std::path::Path;

use crate::error::JcampError;
use crate::record::{HeaderValue, SpectrumRecord};

/// Default maximum data-line width, in characters.
pub const DEFAULT_LINEWIDTH: usize = 75;

/// Header keys owned by the writer itself and skipped in the pass-through
/// loop.
const RESERVED_KEYS: [&str; 4] = ["x", "y", "xydata", "end"];

/// Serialize `record` to a JCAMP-DX text blob.
///
/// `FIRSTX`/`LASTX`/`MAXX`/`MINX` and the y-range counterparts are
/// computed only when the record does not already carry them. Data lines
/// are wrapped at `linewidth`; not-a-number y values are written as `?`.
pub fn write_jcamp(record: &SpectrumRecord, linewidth: usize) -> Result<String, JcampError> {
    if record.x.is_empty() {
        return Err(JcampError::EmptySeries("x"));
    }
    if record.y.is_empty() {
        return Err(JcampError::EmptySeries("y"));
    }
    let x = &record.x;
    let y = &record.y;

    let mut out = String::new();
    out.push_str("##JCAMP-DX=5.01\n");

    for (key, value) in &record.headers {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        out.push_str(&format!("##{}={}\n", key.to_uppercase(), value));
    }

    if !record.headers.contains_key("firstx") {
        out.push_str(&format!("##FIRSTX={:.6}\n", x[0]));
    }
    if !record.headers.contains_key("lastx") {
        out.push_str(&format!("##LASTX={:.6}\n", x[x.len() - 1]));
    }
    if !record.headers.contains_key("maxx") {
        out.push_str(&format!("##MAXX={:.6}\n", fold_max(x)));
    }
    if !record.headers.contains_key("minx") {
        out.push_str(&format!("##MINX={:.6}\n", fold_min(x)));
    }

    if !record.headers.contains_key("firsty") {
        out.push_str(&format!("##FIRSTY={:.4}\n", y[0]));
    }
    if !record.headers.contains_key("lasty") {
        out.push_str(&format!("##LASTY={:.4}\n", y[y.len() - 1]));
    }
    if !record.headers.contains_key("maxy") {
        out.push_str(&format!("##MAXY={:.4}\n", fold_max(y)));
    }
    if !record.headers.contains_key("miny") {
        out.push_str(&format!("##MINY={:.4}\n", fold_min(y)));
    }

    let npts = record.get_usize("npts").unwrap_or(x.len());
    if npts > x.len() || npts > y.len() {
        return Err(JcampError::NpointsOverride {
            npts,
            len: x.len().min(y.len()),
        });
    }
    out.push_str(&format!("##NPOINTS={}\n", npts));
    out.push_str(&format!("##XFACTOR={}\n", factor_text(record, "xfactor")));
    out.push_str(&format!("##YFACTOR={}\n", factor_text(record, "yfactor")));

    let yfactor = match record.headers.get("yfactor") {
        None => 1.0,
        Some(v) => v.as_f64().ok_or_else(|| JcampError::BadQuantity {
            field: "yfactor",
            value: v.to_string(),
        })?,
    };

    out.push_str("##XYDATA=(X++(Y..Y))\n");
    let mut line = format!("{:.6} ", x[0]);
    for j in 0..npts {
        if y[j].is_nan() {
            line.push_str("? ");
        } else {
            line.push_str(&format!("{:.4} ", y[j] / yfactor));
        }
        if line.len() >= linewidth || j == npts - 1 {
            out.push_str(&line);
            out.push('\n');
            if j < npts - 1 {
                line = format!("{:.6} ", x[j + 1]);
            }
        }
    }
    out.push_str("##END=\n");
    Ok(out)
}

/// Serialize `record` and persist it at `path`. The record itself is left
/// untouched; the written copy carries the destination as its `filename`
/// header.
pub fn write_jcamp_file(
    path: &Path,
    record: &SpectrumRecord,
    linewidth: usize,
) -> Result<(), JcampError> {
    let mut copy = record.clone();
    copy.headers.insert(
        "filename".to_string(),
        HeaderValue::Str(path.display().to_string()),
    );
    let text = write_jcamp(&copy, linewidth)?;
    fs::write(path, text)?;
    Ok(())
}

fn factor_text(record: &SpectrumRecord, key: &str) -> String {
    match record.headers.get(key) {
        Some(v) => v.to_string(),
        None => "1".to_string(),
    }
}

fn fold_max(vals: &[f64]) -> f64 {
    vals.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn fold_min(vals: &[f64]) -> f64 {
    vals.iter().copied().fold(f64::INFINITY, f64::min)
}
