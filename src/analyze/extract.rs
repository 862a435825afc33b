// src/analyze/extract.rs
//! Pulling a verdict out of free-form model output.
//!
//! Grammar: the verdict is the first *balanced* `{ ... }` substring of the text.
//! Braces inside JSON string literals (including escaped quotes) do not count
//! towards the balance. Text before and after the object is ignored. Output
//! over `MAX_MODEL_OUTPUT_BYTES` is refused outright.

use serde_json::{Map, Value};

use crate::analyze::ParseFailure;
use crate::signal::{EventKind, Sentiment, Signal, UnknownLabel, Verdict, UNKNOWN_STOCK};

/// Fields a model verdict must carry.
pub const REQUIRED_FIELDS: [&str; 6] = ["stock", "event", "sentiment", "signal", "confidence", "reason"];

/// Model output longer than this is rejected before extraction.
pub const MAX_MODEL_OUTPUT_BYTES: usize = 64 * 1024;

/// Return the first balanced brace-delimited substring, if any.
///
/// Single pass with a stack of open-brace offsets. The answer is the matched
/// pair with the smallest opening offset; once the stack drains, nothing later
/// can start earlier. Quotes only open string literals inside an open brace.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut best: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                let Some(start) = open.pop() else { continue };
                let end = i + c.len_utf8();
                if open.is_empty() {
                    return Some(&text[start..end]);
                }
                if !matches!(best, Some((b, _)) if b < start) {
                    best = Some((start, end));
                }
            }
            _ => {}
        }
    }
    best.map(|(start, end)| &text[start..end])
}

/// Parse and validate a verdict out of raw model output.
pub fn parse_verdict(text: &str) -> Result<Verdict, ParseFailure> {
    if text.len() > MAX_MODEL_OUTPUT_BYTES {
        return Err(ParseFailure::TooLarge(text.len()));
    }
    let raw = extract_json_object(text).ok_or(ParseFailure::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ParseFailure::InvalidJson("not an object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if matches!(obj.get(field), None | Some(Value::Null)) {
            return Err(ParseFailure::MissingField(field));
        }
    }

    let stock = string_field(obj, "stock")?.trim();
    let event = EventKind::from_label(string_field(obj, "event")?);
    let sentiment: Sentiment = string_field(obj, "sentiment")?
        .parse()
        .map_err(|e: UnknownLabel| ParseFailure::InvalidField {
            field: "sentiment",
            value: e.value,
        })?;
    let signal: Signal = string_field(obj, "signal")?
        .parse()
        .map_err(|e: UnknownLabel| ParseFailure::InvalidField {
            field: "signal",
            value: e.value,
        })?;
    let confidence = confidence_field(&obj["confidence"])?;
    let reason = sanitize_reason(string_field(obj, "reason")?);

    Ok(Verdict {
        stock: if stock.is_empty() {
            UNKNOWN_STOCK.to_string()
        } else {
            stock.to_string()
        },
        event,
        sentiment,
        signal,
        confidence,
        reason,
    })
}

fn string_field<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ParseFailure> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ParseFailure::InvalidField {
            field,
            value: other.to_string(),
        }),
        None => Err(ParseFailure::MissingField(field)),
    }
}

/// Integer, float (rounded) or numeric string within 0..=100.
fn confidence_field(v: &Value) -> Result<u8, ParseFailure> {
    let invalid = || ParseFailure::InvalidField {
        field: "confidence",
        value: v.to_string(),
    };
    let n = match v {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    let n = n.round();
    if !(0.0..=100.0).contains(&n) {
        return Err(invalid());
    }
    Ok(n as u8)
}

/// Ensure ASCII-only, single line, and <=160 chars. Collapses whitespace.
pub fn sanitize_reason(input: &str) -> String {
    let mut out = String::with_capacity(160);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 160 {
            break;
        }
    }
    out.trim().to_string()
}
