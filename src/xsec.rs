//! Absorption cross-section conversion.
//!
//! Takes an assembled transmittance or absorbance spectrum plus the
//! instrument metadata in its headers and derives the absorption
//! cross-section per molecule, in m^2. The conversion assumes gas-phase
//! measurements at 296 K, the temperature NIST used when collecting the
//! reference spectra.
//!
//! The abscissa sampling grid is kept nonuniform in wavelength space so
//! each digital bin retains its proportionality to energy; no resampling
//! takes place.

use crate::error::JcampError;
use crate::record::{HeaderValue, SpectrumRecord};

/// Gas temperature in kelvin at collection time.
const T_KELVIN: f64 = 296.0;
/// Conversion constant folding in the gas constant.
const R_CONST: f64 = 1.0355e-25;
/// Loschmidt-derived divisor for the premultiplied
/// `(micromol/mol)-1m-1 (base 10)` intensity unit.
const PREMULTIPLIED_DIVISOR: f64 = 2.687e19;

/// Options for [`calc_xsec`].
#[derive(Debug, Clone)]
pub struct XsecOptions {
    /// Shortest wavelength of interest, in micrometers. Accepted for
    /// signature parity with older tooling; the converter does not window
    /// the series.
    pub wavemin: Option<f64>,
    /// Longest wavelength of interest, in micrometers. See `wavemin`.
    pub wavemax: Option<f64>,
    /// When quantitative metadata (path length, partial pressure) is
    /// missing: `true` returns the empty outcome, `false` fills in
    /// defaults (0.1 m, 150.0 mmHg).
    pub skip_nonquant: bool,
}

impl Default for XsecOptions {
    fn default() -> Self {
        Self {
            wavemin: None,
            wavemax: None,
            skip_nonquant: true,
        }
    }
}

/// Convert an absorption spectrum to cross-section units.
///
/// Returns a new record with the `wavenumbers`, `wavelengths`,
/// `absorbance`, and `xsec` series filled in; the input is not modified.
/// `Ok(None)` is the quantitatively-incomplete outcome: required
/// metadata was missing and `skip_nonquant` was set.
pub fn calc_xsec(
    record: &SpectrumRecord,
    options: &XsecOptions,
) -> Result<Option<SpectrumRecord>, JcampError> {
    let mut out = record.clone();
    let mut x = record.x.clone();
    let mut y = record.y.clone();

    let xunits = record
        .get_str("xunits")
        .ok_or(JcampError::MissingHeader("xunits"))?;
    match xunits.to_lowercase().as_str() {
        "1/cm" | "cm-1" | "cm^-1" => {
            out.wavenumbers = x.clone();
            for v in &mut x {
                *v = 10000.0 / *v;
            }
            out.wavelengths = x.clone();
        }
        "micrometers" | "um" | "wavelength (um)" => {
            out.wavelengths = x.clone();
            out.wavenumbers = x.iter().map(|v| 10000.0 / v).collect();
        }
        "nanometers" | "nm" | "wavelength (nm)" => {
            for v in &mut x {
                *v /= 1000.0;
            }
            out.wavelengths = x.clone();
            out.wavenumbers = x.iter().map(|v| 10000.0 / v).collect();
        }
        _ => return Err(JcampError::UnknownXUnits(xunits.to_string())),
    }

    // Unphysical negative readings clamp to zero.
    for v in &mut y {
        if *v < 0.0 {
            *v = 0.0;
        }
    }

    let yunits = record
        .get_str("yunits")
        .ok_or(JcampError::MissingHeader("yunits"))?;
    match yunits.to_lowercase().as_str() {
        "transmittance" => {
            for v in &mut y {
                // Transmission above 1.0 is equally unphysical.
                if *v > 1.0 {
                    *v = 1.0;
                }
                *v = if *v > 0.0 {
                    (1.0 / *v).log10()
                } else {
                    f64::NAN
                };
            }
            out.absorbance = y.clone();
        }
        "absorbance" => {}
        "(micromol/mol)-1m-1 (base 10)" => {
            // Already a premultiplied cross-section; just rescale.
            out.headers.insert(
                "yunits".to_string(),
                HeaderValue::Str("xsec (m^2))".to_string()),
            );
            out.xsec = y.iter().map(|v| v / PREMULTIPLIED_DIVISOR).collect();
            return Ok(Some(out));
        }
        _ => return Err(JcampError::UnknownYUnits(yunits.to_string())),
    }

    // Effective optical path length of the measurement chamber, in meters.
    let ell = match record.get_str("path length") {
        Some(raw) => parse_path_length(raw)?,
        None => {
            if options.skip_nonquant {
                return Ok(None);
            }
            log::debug!("path length not found, using 0.1 m as a default");
            0.1
        }
    };

    debug_assert_eq!(x.len(), y.len());

    if let Some(expected) = record.get_usize("npoints") {
        if x.len() != expected {
            return Err(JcampError::PointCountMismatch {
                title: record.title().to_string(),
                actual: x.len(),
                expected,
            });
        }
    }

    // Partial pressure at measurement time, in mmHg.
    let p = match record.get_str("partial_pressure") {
        Some(raw) => parse_partial_pressure(raw)?,
        None => {
            if options.skip_nonquant {
                return Ok(None);
            }
            log::debug!(
                "partial pressure for \"{}\" is missing, using the default 150.0 mmHg",
                record.title()
            );
            150.0
        }
    };

    out.xsec = y
        .iter()
        .map(|v| v * T_KELVIN * R_CONST / (p * ell))
        .collect();
    Ok(Some(out))
}

/// Parse the `path length` header into meters. Unrecognized unit words
/// fall back to the 0.1 m default.
fn parse_path_length(raw: &str) -> Result<f64, JcampError> {
    let lower = raw.to_lowercase();
    let mut tokens = lower.split_whitespace();
    let (Some(value), Some(unit)) = (tokens.next(), tokens.next()) else {
        return Err(JcampError::BadQuantity {
            field: "path length",
            value: raw.to_string(),
        });
    };
    let value: f64 = value.parse().map_err(|_| JcampError::BadQuantity {
        field: "path length",
        value: raw.to_string(),
    })?;
    Ok(match unit {
        "cm" => value / 100.0,
        "m" => value,
        "mm" => value / 1000.0,
        _ => 0.1,
    })
}

/// Parse the `partial_pressure` header into mmHg. `ppm` is scaled at
/// atmospheric pressure; an unrecognized unit word passes the raw value
/// through.
fn parse_partial_pressure(raw: &str) -> Result<f64, JcampError> {
    let mut tokens = raw.split_whitespace();
    let (Some(value), Some(unit)) = (tokens.next(), tokens.next()) else {
        return Err(JcampError::BadQuantity {
            field: "partial_pressure",
            value: raw.to_string(),
        });
    };
    let value: f64 = value.parse().map_err(|_| JcampError::BadQuantity {
        field: "partial_pressure",
        value: raw.to_string(),
    })?;
    if unit.eq_ignore_ascii_case("ppm") {
        Ok(value * 759.8 * 1.0e-6)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> SpectrumRecord {
        let mut rec = SpectrumRecord::new();
        rec.headers
            .insert("title".into(), HeaderValue::Str("test gas".into()));
        rec.headers
            .insert("xunits".into(), HeaderValue::Str("1/CM".into()));
        rec.headers
            .insert("yunits".into(), HeaderValue::Str("transmittance".into()));
        rec.headers
            .insert("path length".into(), HeaderValue::Str("1 m".into()));
        rec.headers.insert(
            "partial_pressure".into(),
            HeaderValue::Str("150.0 mmHg".into()),
        );
        rec.x = vec![2000.0, 2001.0, 2002.0];
        rec.y = vec![1.0, 0.5, 0.25];
        rec
    }

    #[test]
    fn test_full_transmittance_gives_zero_xsec() {
        let rec = base_record();
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        assert!((out.absorbance[0] - 0.0).abs() < 1e-12);
        assert!((out.xsec[0] - 0.0).abs() < 1e-30);
        assert!(out.absorbance[1] > 0.0);
        assert!(out.xsec[1] > 0.0);
    }

    #[test]
    fn test_wavelength_derivation_from_wavenumber() {
        let rec = base_record();
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        assert_eq!(out.wavenumbers, vec![2000.0, 2001.0, 2002.0]);
        assert!((out.wavelengths[0] - 5.0).abs() < 1e-12);
        // The record's own series is untouched.
        assert_eq!(out.x, rec.x);
        assert_eq!(out.y, rec.y);
    }

    #[test]
    fn test_nanometer_units() {
        let mut rec = base_record();
        rec.headers
            .insert("xunits".into(), HeaderValue::Str("nm".into()));
        rec.x = vec![5000.0, 5001.0, 5002.0];
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        assert!((out.wavelengths[0] - 5.0).abs() < 1e-12);
        assert!((out.wavenumbers[0] - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_and_overunity_transmittance_clamped() {
        let mut rec = base_record();
        rec.y = vec![-0.5, 1.5, 0.1];
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        // -0.5 clamps to 0, which has no absorbance.
        assert!(out.absorbance[0].is_nan());
        // 1.5 clamps to full transmittance.
        assert!((out.absorbance[1] - 0.0).abs() < 1e-12);
        assert!((out.absorbance[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_absorbance_passthrough() {
        let mut rec = base_record();
        rec.headers
            .insert("yunits".into(), HeaderValue::Str("absorbance".into()));
        rec.y = vec![0.1, 0.2, 0.3];
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        assert!(out.absorbance.is_empty());
        assert_eq!(out.xsec.len(), 3);
        let expected = 0.1 * T_KELVIN * R_CONST / (150.0 * 1.0);
        assert!((out.xsec[0] - expected).abs() < 1e-40);
    }

    #[test]
    fn test_premultiplied_unit_early_return() {
        let mut rec = base_record();
        rec.headers.insert(
            "yunits".into(),
            HeaderValue::Str("(micromol/mol)-1m-1 (base 10)".into()),
        );
        rec.y = vec![2.687e19, 0.0, 2.687e19];
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap().unwrap();
        assert!((out.xsec[0] - 1.0).abs() < 1e-12);
        assert_eq!(out.get_str("yunits"), Some("xsec (m^2))"));
        // The early return skips the absorbance computation.
        assert!(out.absorbance.is_empty());
    }

    #[test]
    fn test_missing_path_length_skip_nonquant() {
        let mut rec = base_record();
        rec.headers.shift_remove("path length");
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_missing_path_length_with_defaults() {
        let mut rec = base_record();
        rec.headers.shift_remove("path length");
        let opts = XsecOptions {
            skip_nonquant: false,
            ..Default::default()
        };
        let out = calc_xsec(&rec, &opts).unwrap().unwrap();
        // y = 0.25 -> absorbance log10(4), ell defaults to 0.1 m.
        let expected = (4.0_f64).log10() * T_KELVIN * R_CONST / (150.0 * 0.1);
        assert!((out.xsec[2] - expected).abs() < 1e-40);
    }

    #[test]
    fn test_missing_partial_pressure_skip_nonquant() {
        let mut rec = base_record();
        rec.headers.shift_remove("partial_pressure");
        let out = calc_xsec(&rec, &XsecOptions::default()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_ppm_pressure_scaling() {
        assert!((parse_partial_pressure("500 ppm").unwrap() - 500.0 * 759.8e-6).abs() < 1e-12);
        assert!((parse_partial_pressure("150.0 mmHg").unwrap() - 150.0).abs() < 1e-12);
        // Unrecognized unit words pass the value through.
        assert!((parse_partial_pressure("2 atm").unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_path_length_units() {
        assert!((parse_path_length("10 cm").unwrap() - 0.1).abs() < 1e-12);
        assert!((parse_path_length("2 m").unwrap() - 2.0).abs() < 1e-12);
        assert!((parse_path_length("50 mm").unwrap() - 0.05).abs() < 1e-12);
        assert!((parse_path_length("3 furlongs").unwrap() - 0.1).abs() < 1e-12);
        assert!(parse_path_length("10cm").is_err());
    }

    #[test]
    fn test_unknown_units_are_fatal() {
        let mut rec = base_record();
        rec.headers
            .insert("xunits".into(), HeaderValue::Str("parsecs".into()));
        assert!(matches!(
            calc_xsec(&rec, &XsecOptions::default()),
            Err(JcampError::UnknownXUnits(_))
        ));

        let mut rec = base_record();
        rec.headers
            .insert("yunits".into(), HeaderValue::Str("counts".into()));
        assert!(matches!(
            calc_xsec(&rec, &XsecOptions::default()),
            Err(JcampError::UnknownYUnits(_))
        ));
    }

    #[test]
    fn test_npoints_mismatch_is_fatal_and_names_title() {
        let mut rec = base_record();
        rec.headers.insert("npoints".into(), HeaderValue::Int(99));
        match calc_xsec(&rec, &XsecOptions::default()) {
            Err(JcampError::PointCountMismatch { title, actual, expected }) => {
                assert_eq!(title, "test gas");
                assert_eq!(actual, 3);
                assert_eq!(expected, 99);
            }
            other => panic!("expected point-count mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
