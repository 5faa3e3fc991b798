//! Error type shared by the decoder, the writer, and the cross-section
//! converter.
//!
//! Advisory conditions (x-checkpoint drift, y-continuity drift, final x/y
//! length mismatch, LONGDATE fallback) are *not* errors; they are reported
//! through the `log` facade and processing continues.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JcampError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed header record (no '=' separator): {0}")]
    MalformedHeader(String),

    #[error("unknown character '{0}' encountered while parsing data")]
    UnknownCharacter(char),

    #[error("duplicate count '{0}' with no token boundary earlier on the line")]
    OrphanDup(char),

    #[error("difference digit with no previous value on the line")]
    DanglingDifference,

    #[error("invalid numeric literal \"{0}\" in data line")]
    BadNumber(String),

    #[error("missing mandatory header \"{0}\"")]
    MissingHeader(&'static str),

    #[error(
        "\"{title}\": number of data points retrieved ({actual}) does not \
         equal the expected length (npoints = {expected})"
    )]
    PointCountMismatch {
        title: String,
        actual: usize,
        expected: usize,
    },

    #[error("don't know how to convert the spectrum's x units (\"{0}\") to micrometers")]
    UnknownXUnits(String),

    #[error("don't know how to convert the spectrum's y units (\"{0}\") to absorbance")]
    UnknownYUnits(String),

    #[error("unparseable {field} value: \"{value}\"")]
    BadQuantity {
        field: &'static str,
        value: String,
    },

    #[error("cannot write a record with an empty {0} series")]
    EmptySeries(&'static str),

    #[error("npoints override ({npts}) exceeds the stored series length ({len})")]
    NpointsOverride { npts: usize, len: usize },

    #[error("failed to parse the date string: {0}")]
    DateParse(String),
}
