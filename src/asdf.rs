//! ASDF/AFFN data-line decoder.
//!
//! JCAMP-DX data lines mix plain free-format numbers (AFFN) with three
//! overlapping single-character code tables (ASDF):
//!
//! - SQZ ("squeezed"): one character carries delimiter + sign + leading
//!   digit. `@`=+0, `A`..`I`=+1..+9, `a`..`i`=-1..-9. Literal `+`/`-` and
//!   `,` also act as delimiters.
//! - DIF ("difference"): one character carries the sign and leading digit
//!   of a delta against the previous decoded value. `%`=0, `J`..`R`=+1..+9,
//!   `j`..`r`=-1..-9.
//! - DUP ("duplicate run"): one character is a repeat count for the most
//!   recent token. `S`..`Z`=1..8, `s`=9. The count includes the first
//!   occurrence, so `T` re-emits the token once more.
//!
//! DUP codes reference already-decoded *text*, not numeric values, so they
//! are expanded in a textual pre-pass before the main decode walk.

use crate::error::JcampError;

/// Classification of one character in the ASDF mixed alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AsdfCode {
    /// Squeezed sign + leading digit.
    Sqz(i8),
    /// Literal sign acting as its own delimiter (PAC form).
    Sign(char),
    /// Comma delimiter (CSV form), decoded as a blank.
    Comma,
    /// Signed difference digit.
    Dif(i8),
    /// Duplicate-run count.
    Dup(u8),
}

fn classify(c: char) -> Option<AsdfCode> {
    match c {
        '@' => Some(AsdfCode::Sqz(0)),
        'A'..='I' => Some(AsdfCode::Sqz((c as u8 - b'A' + 1) as i8)),
        'a'..='i' => Some(AsdfCode::Sqz(-((c as u8 - b'a' + 1) as i8))),
        '+' | '-' => Some(AsdfCode::Sign(c)),
        ',' => Some(AsdfCode::Comma),
        '%' => Some(AsdfCode::Dif(0)),
        'J'..='R' => Some(AsdfCode::Dif((c as u8 - b'J' + 1) as i8)),
        'j'..='r' => Some(AsdfCode::Dif(-((c as u8 - b'j' + 1) as i8))),
        'S'..='Z' => Some(AsdfCode::Dup(c as u8 - b'S' + 1)),
        's' => Some(AsdfCode::Dup(9)),
        _ => None,
    }
}

/// Whether `c` belongs to the DIF table. Used by the reader to decide,
/// from the first data line of a table, whether the table is ASDF or AFFN.
pub(crate) fn is_dif_char(c: char) -> bool {
    matches!(classify(c), Some(AsdfCode::Dif(_)))
}

fn is_dup_char(c: char) -> bool {
    matches!(classify(c), Some(AsdfCode::Dup(_)))
}

/// Textual DUP pre-pass: replace each DUP character with `count - 1` extra
/// copies of the token it refers to. A token starts at the most recent
/// DIF-table character, which is where the previous value's text began.
fn expand_dups(line: &str) -> Result<String, JcampError> {
    if !line.chars().any(is_dup_char) {
        return Ok(line.to_string());
    }
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    for (i, &c) in chars.iter().enumerate() {
        let count = match classify(c) {
            Some(AsdfCode::Dup(n)) => n,
            _ => {
                out.push(c);
                continue;
            }
        };
        let mut start = i;
        loop {
            if start == 0 {
                return Err(JcampError::OrphanDup(c));
            }
            start -= 1;
            if is_dif_char(chars[start]) {
                break;
            }
        }
        let token: String = chars[start..i].iter().collect();
        for _ in 1..count {
            out.push_str(&token);
        }
    }
    Ok(out)
}

/// Flush the pending literal buffer into `vals`. `dif` tells whether the
/// literal is a delta against the previously decoded value.
fn flush(num: &mut String, dif: bool, vals: &mut Vec<f64>) -> Result<(), JcampError> {
    if num.is_empty() {
        return Ok(());
    }
    let literal: f64 = num
        .trim()
        .parse()
        .map_err(|_| JcampError::BadNumber(num.clone()))?;
    let value = if dif {
        match vals.last() {
            Some(last) => literal + last,
            None => return Err(JcampError::DanglingDifference),
        }
    } else {
        literal
    };
    vals.push(value);
    num.clear();
    Ok(())
}

/// Decode one data line into its ordered numeric values.
///
/// The delta chain is evaluated sequentially: each DIF token is added to
/// the value decoded immediately before it. The first value of a data line
/// is the line's x-coordinate checkpoint; interpretation of the rest is up
/// to the table assembler.
pub fn decode_line(line: &str) -> Result<Vec<f64>, JcampError> {
    // Collapse whitespace runs to single spaces.
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    let expanded = expand_dups(&collapsed)?;

    let mut vals: Vec<f64> = Vec::new();
    let mut num = String::new();
    let mut dif = false;

    for c in expanded.chars() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
            continue;
        }
        if c == ' ' {
            dif = false;
            flush(&mut num, dif, &mut vals)?;
            continue;
        }
        match classify(c) {
            Some(AsdfCode::Sqz(digit)) => {
                dif = false;
                flush(&mut num, dif, &mut vals)?;
                num = if digit < 0 {
                    format!("-{}", -digit)
                } else {
                    format!("+{}", digit)
                };
            }
            Some(AsdfCode::Sign(sign)) => {
                dif = false;
                flush(&mut num, dif, &mut vals)?;
                num = sign.to_string();
            }
            Some(AsdfCode::Comma) => {
                dif = false;
                flush(&mut num, dif, &mut vals)?;
                num = " ".to_string();
            }
            Some(AsdfCode::Dif(digit)) => {
                flush(&mut num, dif, &mut vals)?;
                dif = true;
                num = digit.to_string();
            }
            // The pre-pass consumed every DUP character.
            Some(AsdfCode::Dup(_)) | None => {
                return Err(JcampError::UnknownCharacter(c));
            }
        }
    }
    flush(&mut num, dif, &mut vals)?;
    Ok(vals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len(), "length mismatch: {:?} vs {:?}", got, want);
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-9, "{:?} != {:?}", got, want);
        }
    }

    #[test]
    fn test_affn_matches_plain_split() {
        let line = "  1000.0   2000 \t 3000.5  ";
        let got = decode_line(line).unwrap();
        let naive: Vec<f64> = line
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_close(&got, &naive);
    }

    #[test]
    fn test_negative_affn() {
        // Minus signs may replace delimiters entirely.
        let got = decode_line("300-12-13").unwrap();
        assert_close(&got, &[300.0, -12.0, -13.0]);
    }

    #[test]
    fn test_comma_delimiter() {
        let got = decode_line("100,200").unwrap();
        assert_close(&got, &[100.0, 200.0]);
    }

    #[test]
    fn test_sqz_decoding() {
        // A00 = +100, B00 = +200
        assert_close(&decode_line("A00B00").unwrap(), &[100.0, 200.0]);
        // @5 = +05, B3 = +23, c1 = -31
        assert_close(&decode_line("@5B3c1").unwrap(), &[5.0, 23.0, -31.0]);
        // a00 = -100
        assert_close(&decode_line("a00").unwrap(), &[-100.0]);
    }

    #[test]
    fn test_dif_chain() {
        // 1000, then +12, then +23
        assert_close(&decode_line("1000J2K3").unwrap(), &[1000.0, 1012.0, 1035.0]);
        // negative deltas
        assert_close(&decode_line("500j5").unwrap(), &[500.0, 495.0]);
    }

    #[test]
    fn test_percent_is_zero_delta() {
        assert_close(&decode_line("500%%").unwrap(), &[500.0, 500.0, 500.0]);
    }

    #[test]
    fn test_dup_expansion() {
        // T repeats the token "J1" one extra time: 1000, 1001, 1002.
        assert_close(&decode_line("1000J1T").unwrap(), &[1000.0, 1001.0, 1002.0]);
        // The count includes the first occurrence, so S adds nothing.
        assert_close(&decode_line("1000J1S").unwrap(), &[1000.0, 1001.0]);
        // s = 9 occurrences of the % (zero-delta) token.
        assert_close(
            &decode_line("7%s").unwrap(),
            &[7.0; 10],
        );
    }

    #[test]
    fn test_expand_dups_text() {
        assert_eq!(expand_dups("J1T").unwrap(), "J1J1");
        assert_eq!(expand_dups("J1S").unwrap(), "J1");
        assert_eq!(expand_dups("1000 2000").unwrap(), "1000 2000");
    }

    #[test]
    fn test_unknown_character_is_fatal() {
        assert!(matches!(
            decode_line("12!34"),
            Err(JcampError::UnknownCharacter('!'))
        ));
    }

    #[test]
    fn test_orphan_dup_is_fatal() {
        assert!(matches!(decode_line("123T"), Err(JcampError::OrphanDup('T'))));
    }

    #[test]
    fn test_dangling_difference_is_fatal() {
        assert!(matches!(
            decode_line("J5"),
            Err(JcampError::DanglingDifference)
        ));
    }

    #[test]
    fn test_bare_sign_is_fatal() {
        assert!(matches!(decode_line("12 +"), Err(JcampError::BadNumber(_))));
    }
}
