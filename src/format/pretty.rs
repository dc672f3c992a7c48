//! Value rendering - the structural dump modes
//!
//! Four engines over one recursive renderer: `describe` (human-readable,
//! truncating), `to_string` (machine form), `pretty` (configurable
//! truncation, layout, and color), and `canonical` (lossless data
//! notation, which refuses cycles and opaque kinds).

use crate::panic::Panic;
use crate::value::Value;

/// Default recursion depth for pretty conversions without a precision
pub(crate) const DEFAULT_DEPTH: usize = 4;

/// Element cap applied by truncating modes
const TRUNCATE_ITEMS: usize = 8;
/// Character cap applied to strings by truncating modes
const TRUNCATE_CHARS: usize = 32;

const COLOR_NUMBER: &str = "\x1b[32m";
const COLOR_STRING: &str = "\x1b[33m";
const COLOR_KEYWORD: &str = "\x1b[35m";
const COLOR_OPAQUE: &str = "\x1b[36m";
const COLOR_RESET: &str = "\x1b[0m";

/// Rendering knobs for the pretty conversions
#[derive(Debug, Clone, Copy)]
pub struct PrettyOptions {
    /// Maximum container nesting rendered; deeper levels are elided
    pub depth: usize,
    /// One element per line with indentation instead of a single line
    pub multiline: bool,
    /// ANSI color on scalars and opaque markers
    pub color: bool,
    /// Cap container elements and string length
    pub truncate: bool,
}

impl PrettyOptions {
    /// Compact truncating form (the `%p` conversion)
    #[inline]
    pub fn single_line() -> Self {
        Self { depth: DEFAULT_DEPTH, multiline: false, color: false, truncate: true }
    }

    /// Full multi-line form (the `%P` conversion)
    #[inline]
    pub fn expanded() -> Self {
        Self { depth: DEFAULT_DEPTH, multiline: true, color: false, truncate: false }
    }

    #[inline]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    #[inline]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Render with explicit options
pub fn pretty(v: &Value, opts: &PrettyOptions) -> String {
    let mut out = String::new();
    let mut path = Vec::new();
    render(&mut out, v, opts, 0, &mut path);
    out
}

/// Human-readable dump: single line, truncating, strings quoted
pub fn describe(v: &Value) -> String {
    pretty(v, &PrettyOptions::single_line())
}

/// Machine dump: string-likes raw, everything else fully rendered
pub fn to_string(v: &Value) -> String {
    match v {
        Value::Str(s) => s.to_string(),
        Value::Buffer(b) => String::from_utf8_lossy(&b.borrow()).into_owned(),
        other => {
            let opts = PrettyOptions { multiline: false, ..PrettyOptions::expanded() };
            pretty(other, &opts)
        }
    }
}

/// Canonical data notation: deterministic, lossless, re-readable.
///
/// Fails with a value panic on cyclic structures, non-finite numbers,
/// and kinds with no lossless textual form.
pub fn canonical(v: &Value) -> Result<String, Panic> {
    let mut out = String::new();
    let mut path = Vec::new();
    canon(&mut out, v, &mut path)?;
    Ok(out)
}

/// Shortest form of a number: integral values without a fraction,
/// everything else via shortest-roundtrip notation.
pub(crate) fn fmt_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_992.0 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

fn scalar(out: &mut String, opts: &PrettyOptions, color: &str, text: &str) {
    if opts.color {
        out.push_str(color);
        out.push_str(text);
        out.push_str(COLOR_RESET);
    } else {
        out.push_str(text);
    }
}

fn quoted(s: &str, limit: Option<usize>) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut truncated = false;
    for (i, c) in s.chars().enumerate() {
        if let Some(max) = limit {
            if i >= max {
                truncated = true;
                break;
            }
        }
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    if truncated {
        out.push_str("...");
    }
    out.push('"');
    out
}

fn indent(out: &mut String, level: usize) {
    out.push('\n');
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn sorted_pairs<'a, I: Iterator<Item = (&'a String, &'a Value)>>(
    entries: I,
) -> Vec<(&'a String, &'a Value)> {
    let mut pairs: Vec<_> = entries.collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
}

fn render(out: &mut String, v: &Value, opts: &PrettyOptions, level: usize, path: &mut Vec<usize>) {
    match v {
        Value::Nil => scalar(out, opts, COLOR_KEYWORD, "nil"),
        Value::Bool(b) => scalar(out, opts, COLOR_KEYWORD, if *b { "true" } else { "false" }),
        Value::Number(n) => scalar(out, opts, COLOR_NUMBER, &fmt_number(*n)),
        Value::Str(s) => {
            let limit = opts.truncate.then_some(TRUNCATE_CHARS);
            scalar(out, opts, COLOR_STRING, &quoted(s, limit));
        }
        Value::Buffer(b) => {
            let limit = opts.truncate.then_some(TRUNCATE_CHARS);
            let text = String::from_utf8_lossy(&b.borrow()).into_owned();
            let mut rendered = String::from("@");
            rendered.push_str(&quoted(&text, limit));
            scalar(out, opts, COLOR_STRING, &rendered);
        }
        Value::Array(_) | Value::Table(_) | Value::Struct(_) => {
            render_container(out, v, opts, level, path)
        }
        Value::Function(f) => {
            scalar(out, opts, COLOR_OPAQUE, &format!("<function {}>", f.name));
        }
        Value::Fiber(_) => {
            let addr = v.shared_addr().unwrap_or(0);
            scalar(out, opts, COLOR_OPAQUE, &format!("<fiber 0x{addr:x}>"));
        }
        Value::Abstract(a) => {
            let addr = v.shared_addr().unwrap_or(0);
            scalar(out, opts, COLOR_OPAQUE, &format!("<abstract {} 0x{addr:x}>", a.type_name()));
        }
        Value::Pointer(p) => {
            scalar(out, opts, COLOR_OPAQUE, &format!("<pointer 0x{:x}>", *p as usize));
        }
    }
}

fn render_container(
    out: &mut String,
    v: &Value,
    opts: &PrettyOptions,
    level: usize,
    path: &mut Vec<usize>,
) {
    let kind = v.kind();
    let (open, close) = match v {
        Value::Array(_) => ("[", "]"),
        Value::Table(_) => ("@{", "}"),
        _ => ("{", "}"),
    };

    let addr = v.shared_addr().unwrap_or(0);
    if path.contains(&addr) {
        scalar(out, opts, COLOR_OPAQUE, &format!("<cycle {}>", kind.name()));
        return;
    }
    if level >= opts.depth {
        out.push_str(open);
        out.push_str("...");
        out.push_str(close);
        return;
    }

    // Struct is immutable and cannot cycle, but tracking it is harmless
    // and keeps the marker behavior uniform for shared subtrees.
    path.push(addr);
    out.push_str(open);
    match v {
        Value::Array(items) => {
            let items = items.borrow();
            let shown = if opts.truncate { items.len().min(TRUNCATE_ITEMS) } else { items.len() };
            for (i, item) in items.iter().take(shown).enumerate() {
                if opts.multiline {
                    indent(out, level + 1);
                } else if i > 0 {
                    out.push(' ');
                }
                render(out, item, opts, level + 1, path);
            }
            if shown < items.len() {
                if opts.multiline {
                    indent(out, level + 1);
                } else {
                    out.push(' ');
                }
                out.push_str("...");
            }
            if opts.multiline && !items.is_empty() {
                indent(out, level);
            }
        }
        Value::Table(entries) => {
            let entries = entries.borrow();
            let pairs = sorted_pairs(entries.iter());
            render_entries(out, &pairs, opts, level, path);
            if opts.multiline && !pairs.is_empty() {
                indent(out, level);
            }
        }
        Value::Struct(entries) => {
            let pairs = sorted_pairs(entries.iter());
            render_entries(out, &pairs, opts, level, path);
            if opts.multiline && !pairs.is_empty() {
                indent(out, level);
            }
        }
        _ => unreachable!("render_container called on a scalar"),
    }
    out.push_str(close);
    path.pop();
}

fn render_entries(
    out: &mut String,
    pairs: &[(&String, &Value)],
    opts: &PrettyOptions,
    level: usize,
    path: &mut Vec<usize>,
) {
    let shown = if opts.truncate { pairs.len().min(TRUNCATE_ITEMS) } else { pairs.len() };
    for (i, (key, value)) in pairs.iter().take(shown).enumerate() {
        if opts.multiline {
            indent(out, level + 1);
        } else if i > 0 {
            out.push(' ');
        }
        scalar(out, opts, COLOR_STRING, &quoted(key, None));
        out.push(' ');
        render(out, value, opts, level + 1, path);
    }
    if shown < pairs.len() {
        if opts.multiline {
            indent(out, level + 1);
        } else {
            out.push(' ');
        }
        out.push_str("...");
    }
}

fn canon(out: &mut String, v: &Value, path: &mut Vec<usize>) -> Result<(), Panic> {
    match v {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(Panic::value_error(format!(
                    "cannot losslessly represent {}",
                    fmt_number(*n)
                )));
            }
            out.push_str(&fmt_number(*n));
        }
        Value::Str(s) => out.push_str(&quoted(s, None)),
        Value::Buffer(b) => {
            out.push('@');
            out.push_str(&quoted(&String::from_utf8_lossy(&b.borrow()), None));
        }
        Value::Array(items) => {
            let addr = v.shared_addr().unwrap_or(0);
            if path.contains(&addr) {
                return Err(Panic::value_error("cycle detected in array"));
            }
            path.push(addr);
            out.push('[');
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                canon(out, item, path)?;
            }
            out.push(']');
            path.pop();
        }
        Value::Table(entries) => {
            let addr = v.shared_addr().unwrap_or(0);
            if path.contains(&addr) {
                return Err(Panic::value_error("cycle detected in table"));
            }
            path.push(addr);
            let entries = entries.borrow();
            out.push_str("@{");
            for (i, (key, value)) in sorted_pairs(entries.iter()).into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&quoted(key, None));
                out.push(' ');
                canon(out, value, path)?;
            }
            out.push('}');
            path.pop();
        }
        Value::Struct(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&quoted(key, None));
                out.push(' ');
                canon(out, value, path)?;
            }
            out.push('}');
        }
        other => {
            return Err(Panic::value_error(format!(
                "cannot losslessly represent {} value",
                other.kind().name()
            )));
        }
    }
    Ok(())
}
