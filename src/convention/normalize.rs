//! Positional normalizers - wraparound indices, half-open ranges, flags
//!
//! Layered on the typed accessors: each extracts through the generic
//! core first, then validates the position or shape against an explicit
//! length or alphabet, raising index/value panics that name the
//! positional role that was invalid.

use crate::panic::Panic;

use super::extract::Args;

/// Index with wraparound: a natural number taken modulo `len`.
///
/// Negative input fails through the natural-number path; an empty
/// container cannot be indexed at all.
pub fn ring_index(args: &Args<'_>, n: usize, len: usize) -> Result<usize, Panic> {
    let raw = args.nat(n)?;
    if len == 0 {
        return Err(Panic::index(format!(
            "bad slot #{n}, cannot wrap index {raw} into length 0"
        )));
    }
    Ok(raw as usize % len)
}

/// Half-open `[start, end)` range against an explicit length.
///
/// Negative components count from the end (`-1` denotes `len`, so
/// `[0, -1)` spans the whole sequence). The end slot may be absent or
/// nil, defaulting to `len`. Out-of-bounds components are rejected with
/// the role name; an inverted range is rejected outright.
pub fn half_range(
    args: &Args<'_>,
    start_slot: usize,
    end_slot: usize,
    len: usize,
) -> Result<(usize, usize), Panic> {
    let start = range_component(args, start_slot, "start", len, 0)?;
    let end = range_component(args, end_slot, "end", len, len as i64)?;
    if start > end {
        return Err(Panic::index(format!(
            "bad range [{start}, {end}), start exceeds end"
        )));
    }
    Ok((start, end))
}

fn range_component(
    args: &Args<'_>,
    slot: usize,
    role: &str,
    len: usize,
    default: i64,
) -> Result<usize, Panic> {
    let raw = args.opt::<i64>(slot, default)?;
    let norm = if raw < 0 { raw + len as i64 + 1 } else { raw };
    if norm < 0 || norm > len as i64 {
        return Err(Panic::index(format!(
            "bad {role} index {raw}, expected range [{}, {len}]",
            -(len as i64) - 1
        )));
    }
    Ok(norm as usize)
}

/// Decode a string of single-character flags against a permitted
/// alphabet into a bitmask (bit `i` set when `alphabet[i]` is present).
pub fn flags(args: &Args<'_>, n: usize, alphabet: &str) -> Result<u64, Panic> {
    debug_assert!(alphabet.chars().count() <= 64, "flag alphabet wider than the mask");
    let spec = args.string(n)?;
    let mut bits = 0u64;
    for c in spec.chars() {
        match alphabet.chars().position(|a| a == c) {
            Some(i) => bits |= 1 << i,
            None => {
                return Err(Panic::value_error(format!(
                    "unexpected flag {c}, expected one of \"{alphabet}\""
                )))
            }
        }
    }
    Ok(bits)
}
