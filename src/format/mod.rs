//! Formatted message builder - printf-style engine over a closed table
//!
//! Design: Every conversion is value-aware: arguments arrive as tagged
//! values and each specifier both validates the kind it needs and renders
//! it. The table is closed; an unknown specifier is a value panic, not a
//! pass-through, so malformed diagnostics fail loudly at the source.
//!
//! Conversion table:
//! - `%d` `%i` decimal, `%o` octal, `%x`/`%X` hex (integral numbers)
//! - `%f` fixed, `%e` scientific, `%g` shortest, `%a` hex-float (numbers)
//! - `%s` string-like raw, `%S` any value via `to_string`
//! - `%t` kind name
//! - `%v` describe, `%V` tostring, `%p`/`%P` pretty (single/multi line),
//!   `%m`/`%M` colored pretty, `%j` canonical data notation
//! - `%%` literal percent
//!
//! Width right-aligns (`%8d`); precision selects float digits and, for the
//! pretty conversions, the nesting depth (`%.2p`).

mod pretty;


pub use pretty::{canonical, describe, pretty, to_string, PrettyOptions};

use crate::panic::Panic;
use crate::value::Value;

use pretty::{fmt_number, DEFAULT_DEPTH};

/// Render `spec`, consuming one argument value per conversion.
///
/// Surplus arguments are ignored; missing arguments, bad argument kinds,
/// and malformed specs are value panics.
pub fn vformat(spec: &str, args: &[Value]) -> Result<String, Panic> {
    let mut out = String::with_capacity(spec.len() + 16);
    let mut chars = spec.chars().peekable();
    let mut next = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width * 10 + d as usize;
            chars.next();
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p * 10 + d as usize;
                chars.next();
            }
            precision = Some(p);
        }

        let conv = chars
            .next()
            .ok_or_else(|| Panic::value_error("format string ends with a bare %"))?;
        if conv == '%' {
            out.push('%');
            continue;
        }

        let arg = args.get(next).ok_or_else(|| {
            Panic::value_error(format!("not enough arguments for format conversion %{conv}"))
        })?;
        next += 1;

        let rendered = match conv {
            'd' | 'i' => int_arg(arg, conv)?.to_string(),
            'o' => radix(int_arg(arg, conv)?, |m| format!("{m:o}")),
            'x' => radix(int_arg(arg, conv)?, |m| format!("{m:x}")),
            'X' => radix(int_arg(arg, conv)?, |m| format!("{m:X}")),
            'f' => format!("{:.*}", precision.unwrap_or(6), float_arg(arg, conv)?),
            'e' => format!("{:.*e}", precision.unwrap_or(6), float_arg(arg, conv)?),
            'g' => fmt_number(float_arg(arg, conv)?),
            'a' => hex_float(float_arg(arg, conv)?),
            's' => match arg {
                Value::Str(s) => s.to_string(),
                Value::Buffer(b) => String::from_utf8_lossy(&b.borrow()).into_owned(),
                other => {
                    return Err(Panic::value_error(format!(
                        "expected string for %s, got {}",
                        other.kind().name()
                    )))
                }
            },
            'S' => to_string(arg),
            't' => arg.kind().name().to_string(),
            'v' => describe(arg),
            'V' => to_string(arg),
            'p' | 'm' => {
                let opts = PrettyOptions::single_line()
                    .with_depth(precision.unwrap_or(DEFAULT_DEPTH))
                    .with_color(conv == 'm');
                pretty(arg, &opts)
            }
            'P' | 'M' => {
                let opts = PrettyOptions::expanded()
                    .with_depth(precision.unwrap_or(DEFAULT_DEPTH))
                    .with_color(conv == 'M');
                pretty(arg, &opts)
            }
            'j' => canonical(arg)?,
            other => {
                return Err(Panic::value_error(format!(
                    "unsupported format conversion %{other}"
                )))
            }
        };

        if rendered.len() < width {
            for _ in 0..width - rendered.len() {
                out.push(' ');
            }
        }
        out.push_str(&rendered);
    }

    Ok(out)
}

fn int_arg(v: &Value, conv: char) -> Result<i64, Panic> {
    match v {
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() && in_i64_range(*n) => Ok(*n as i64),
        other => Err(Panic::value_error(format!(
            "expected integer for %{conv}, got {}",
            describe(other)
        ))),
    }
}

fn float_arg(v: &Value, conv: char) -> Result<f64, Panic> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(Panic::value_error(format!(
            "expected number for %{conv}, got {}",
            describe(other)
        ))),
    }
}

#[inline]
fn in_i64_range(n: f64) -> bool {
    n >= -9_223_372_036_854_775_808.0 && n < 9_223_372_036_854_775_808.0
}

/// Render magnitude in a radix, restoring the sign manually so negative
/// inputs never print as two's-complement bit patterns.
fn radix(x: i64, f: impl Fn(u64) -> String) -> String {
    if x < 0 {
        format!("-{}", f(x.unsigned_abs()))
    } else {
        f(x as u64)
    }
}

/// C99-style hex-float (`0x1.8p+1`), with trailing zero nibbles trimmed
fn hex_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let raw_exp = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;

    if raw_exp == 0 && mantissa == 0 {
        return format!("{sign}0x0p+0");
    }

    // Subnormals keep the denormal exponent with a zero integer digit
    let (lead, exp) = if raw_exp == 0 { (0, -1022) } else { (1, raw_exp - 1023) };

    let mut digits = String::new();
    for i in 0..13 {
        let nibble = (mantissa >> (48 - 4 * i)) & 0xf;
        digits.push(char::from_digit(nibble as u32, 16).unwrap_or('0'));
    }
    let trimmed = digits.trim_end_matches('0');

    if trimmed.is_empty() {
        format!("{sign}0x{lead}p{exp:+}")
    } else {
        format!("{sign}0x{lead}.{trimmed}p{exp:+}")
    }
}
