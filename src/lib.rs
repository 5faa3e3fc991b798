//! JCAMP-DX spectral data codec.
//!
//! JCAMP-DX is a text-based interchange format for spectroscopic data
//! (file extensions `.dx`, `.jdx`, `.jcamp`). This crate decodes a
//! document into a [`SpectrumRecord`] — header metadata plus the numeric
//! x/y series, with children for compound (`LINK`) documents — and encodes
//! a record back to text.
//!
//! Format overview:
//!   - Lines starting with `##` are labeled data records (LDR)
//!   - `##TITLE= ...` — spectrum title
//!   - `##XUNITS= ...` — "1/CM", "MICROMETERS", "NANOMETERS", ...
//!   - `##YUNITS= ...` — "TRANSMITTANCE", "ABSORBANCE", ...
//!   - `##XYDATA= (X++(Y..Y))` — compressed data table (ASDF form)
//!   - `##PEAK TABLE= (XY..XY)` — simple X,Y pairs
//!
//! Decoding handles the SQZ/DIF/DUP compression alphabets (see [`asdf`]),
//! validates per-line x and y checkpoints, and recurses into nested
//! blocks. [`calc_xsec`] further converts an absorption spectrum into
//! cross-section per molecule using the instrument metadata.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let record = jcampdx::read_jcamp_file(Path::new("ethylene.jdx"))?;
//! println!("{}: {} points", record.title(), record.y.len());
//! # Ok::<(), jcampdx::JcampError>(())
//! ```

pub mod asdf;
pub mod error;
pub mod longdate;
pub mod reader;
pub mod record;
pub mod writer;
pub mod xsec;

pub use error::JcampError;
pub use longdate::parse_longdate;
pub use reader::{parse_jcamp, parse_jcamp_lines, read_jcamp_file};
pub use record::{HeaderValue, Headers, SpectrumRecord};
pub use writer::{write_jcamp, write_jcamp_file, DEFAULT_LINEWIDTH};
pub use xsec::{calc_xsec, XsecOptions};
