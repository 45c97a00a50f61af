//! Numeric normalizer for report-formatted numbers.
//!
//! Reports print numbers with `.` as thousands separator and `,` as decimal
//! separator ("4.500,75"). That convention is assumed for every input; there
//! is no per-input locale detection.

/// Convert a report-formatted number into a float.
///
/// Every `.` is dropped, the first `,` becomes the decimal point, and the
/// longest numeric prefix is parsed (leading whitespace ignored). Overflowing
/// exponents and a literal `Infinity` read as infinite. Returns `None` when no
/// number can be read, which callers treat as "not comparable".
pub fn normalize(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('.', "").replacen(',', ".", 1);
    parse_float_prefix(&cleaned)
}

/// Parse the longest prefix of `text` that forms a decimal float literal.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return Some(if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
