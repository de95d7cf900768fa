//! Parser for the command script language.
//!
//! ```text
//! script := stage ('->' stage)*
//! stage  := action ('+' action)*
//! action := name '(' args? ')' | name
//! args   := arg (',' arg)*
//! ```
//!
//! Separators only count at the top level: never inside parentheses,
//! brackets, braces or quoted strings.

use std::sync::LazyLock;

use regex::Regex;
use winnow::ModalResult;
use winnow::ascii::{float, hex_digit1};
use winnow::combinator::{alt, preceded};
use winnow::prelude::*;

use crate::ast::{Arg, ParsedAction, ParsedScript, Stage};
use crate::error::SyntaxError;
use crate::registry::Bindings;

/// Separates stages; stages run one after another.
pub const SEQUENTIAL: &str = "->";
/// Separates actions within a stage; they run concurrently.
pub const PARALLEL: &str = "+";

const USAGE_HINT: &str = "Use syntax: A(...) + B(...) -> C(...)";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("identifier regex is valid"));

/// A trimmed slice of the input and where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment<'a> {
    text: &'a str,
    offset: usize,
}

/// Scan `text` and cut it at every top-level occurrence of `separator`.
///
/// Segments are trimmed but empty ones are kept, so callers can report
/// dangling separators.
fn scan<'a>(text: &'a str, separator: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let (mut paren, mut bracket, mut brace) = (0usize, 0usize, 0usize);
    let mut in_string: Option<char> = None;
    let mut prev: Option<char> = None;
    let extra = separator.chars().count().saturating_sub(1);
    let mut chars = text.char_indices();

    while let Some((i, ch)) = chars.next() {
        if let Some(quote) = in_string {
            if ch == quote && prev != Some('\\') {
                in_string = None;
            }
            prev = Some(ch);
            continue;
        }

        match ch {
            '\'' | '"' | '`' => in_string = Some(ch),
            '(' => paren += 1,
            ')' => paren = paren.saturating_sub(1),
            '[' => bracket += 1,
            ']' => bracket = bracket.saturating_sub(1),
            '{' => brace += 1,
            '}' => brace = brace.saturating_sub(1),
            _ => {}
        }

        let at_top = paren == 0 && bracket == 0 && brace == 0 && in_string.is_none();
        if at_top && !separator.is_empty() && text[i..].starts_with(separator) {
            segments.push(trimmed(text, start, i));
            for _ in 0..extra {
                chars.next();
            }
            start = i + separator.len();
            prev = None;
            continue;
        }
        prev = Some(ch);
    }
    segments.push(trimmed(text, start, text.len()));
    segments
}

fn trimmed(text: &str, start: usize, end: usize) -> Segment<'_> {
    let raw = &text[start..end];
    let lead = raw.len() - raw.trim_start().len();
    Segment {
        text: raw.trim(),
        offset: start + lead,
    }
}

/// Split `text` on top-level occurrences of `separator`.
///
/// Returns trimmed, non-empty segments. Blank input yields no segments.
pub fn split_top_level<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    scan(text, separator)
        .into_iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| s.text)
        .collect()
}

/// Parse a whole script with no external bindings.
pub fn parse_script(script: &str) -> Result<ParsedScript, SyntaxError> {
    parse_script_with(script, &Bindings::default())
}

/// Parse a whole script, resolving bare identifiers against `bindings`.
pub fn parse_script_with(script: &str, bindings: &Bindings) -> Result<ParsedScript, SyntaxError> {
    if script.trim().is_empty() {
        return Err(SyntaxError::new(format!("No commands found. {}", USAGE_HINT)));
    }

    let raw_stages = scan(script, SEQUENTIAL);
    let last_stage = raw_stages.len() - 1;
    let mut stages = Vec::with_capacity(raw_stages.len());

    for (stage_index, stage) in raw_stages.iter().enumerate() {
        if stage.text.is_empty() {
            let message = if stage_index == last_stage {
                "Script cannot end with '->'. Add a stage after the arrow.".to_string()
            } else if stage_index == 0 {
                "Script cannot start with '->'.".to_string()
            } else {
                format!("Empty stage detected near '-> ->' at stage {}.", stage_index + 1)
            };
            return Err(SyntaxError::at(message, stage.offset));
        }

        let raw_actions = scan(stage.text, PARALLEL);
        let last_action = raw_actions.len() - 1;
        let mut actions = Vec::with_capacity(raw_actions.len());

        for (action_index, action) in raw_actions.iter().enumerate() {
            let offset = stage.offset + action.offset;
            if action.text.is_empty() {
                let message = if action_index == last_action {
                    format!(
                        "Stage {} cannot end with '+'. Add an action after '+'.",
                        stage_index + 1
                    )
                } else if action_index == 0 {
                    format!("Stage {} cannot start with '+'.", stage_index + 1)
                } else {
                    format!(
                        "Empty action detected near '+' at stage {}, action {}.",
                        stage_index + 1,
                        action_index + 1
                    )
                };
                return Err(SyntaxError::at(message, offset));
            }
            actions.push(parse_action_at(
                action.text,
                offset,
                stage_index,
                action_index,
                bindings,
            )?);
        }
        stages.push(Stage { actions });
    }

    Ok(ParsedScript { stages })
}

/// Parse one `name(args)` unit on its own.
pub fn parse_action(text: &str, bindings: &Bindings) -> Result<ParsedAction, SyntaxError> {
    let lead = text.len() - text.trim_start().len();
    parse_action_at(text.trim(), lead, 0, 0, bindings)
}

fn parse_action_at(
    text: &str,
    offset: usize,
    stage_index: usize,
    action_index: usize,
    bindings: &Bindings,
) -> Result<ParsedAction, SyntaxError> {
    let (name, args) = match text.find('(') {
        None => (text.trim(), Vec::new()),
        Some(open) => {
            let close = match text.rfind(')') {
                Some(close) if close > open => close,
                _ => {
                    return Err(SyntaxError::at(
                        format!("Unmatched parentheses in action \"{}\"", text),
                        offset + open,
                    ));
                }
            };
            let trailing = text[close + 1..].trim();
            if !trailing.is_empty() {
                return Err(SyntaxError::at(
                    format!("Unexpected text after ')' in action \"{}\"", text),
                    offset + close + 1,
                ));
            }
            let args = parse_args(&text[open + 1..close], bindings)
                .map_err(|e| e.shifted(offset + open + 1))?;
            (text[..open].trim(), args)
        }
    };

    if name.is_empty() {
        return Err(SyntaxError::at(
            format!("Missing action name in \"{}\"", text),
            offset,
        ));
    }

    Ok(ParsedAction {
        name: name.to_string(),
        args,
        stage_index,
        action_index,
        source_text: text.to_string(),
        offset,
    })
}

/// Parse a comma-separated argument list into typed values.
///
/// Offsets in returned errors are relative to `arg_text`.
pub fn parse_args(arg_text: &str, bindings: &Bindings) -> Result<Vec<Arg>, SyntaxError> {
    if arg_text.trim().is_empty() {
        return Ok(Vec::new());
    }
    scan(arg_text, ",")
        .into_iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| parse_primitive(s.text, bindings).map_err(|e| e.shifted(s.offset)))
        .collect()
}

/// Classify a single argument token.
///
/// Order matters: keywords, then numbers, then external bindings, then
/// quoted strings, then JSON, and finally the raw text.
fn parse_primitive(token: &str, bindings: &Bindings) -> Result<Arg, SyntaxError> {
    if token.is_empty() {
        return Ok(Arg::String(String::new()));
    }

    match token.to_ascii_lowercase().as_str() {
        "true" => return Ok(Arg::Bool(true)),
        "false" => return Ok(Arg::Bool(false)),
        "null" => return Ok(Arg::Null),
        _ => {}
    }

    if let Ok(n) = number_literal.parse(token)
        && n.is_finite()
    {
        return Ok(Arg::Number(n));
    }

    if IDENTIFIER.is_match(token)
        && let Some(value) = bindings.get(token)
    {
        return Ok(Arg::External {
            name: token.to_string(),
            value: value.clone(),
        });
    }

    if let Some(inner) = dequote(token) {
        return Ok(Arg::String(inner.to_string()));
    }

    let is_object = token.starts_with('{') && token.ends_with('}');
    let is_array = token.starts_with('[') && token.ends_with(']');
    if is_object || is_array {
        return serde_json::from_str(token)
            .map(Arg::Json)
            .map_err(|e| SyntaxError::at(format!("Invalid JSON argument: {} ({})", token, e), 0));
    }

    Ok(Arg::String(token.to_string()))
}

/// Strip a matching pair of quotes. Escapes are left as written.
fn dequote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if !matches!(first, '\'' | '"' | '`') || token.len() < 2 || !token.ends_with(first) {
        return None;
    }
    Some(&token[1..token.len() - 1])
}

/// Parser for a numeric literal: decimal/exponent floats or `0x` hex.
fn number_literal(input: &mut &str) -> ModalResult<f64> {
    alt((hex_literal, float)).parse_next(input)
}

fn hex_literal(input: &mut &str) -> ModalResult<f64> {
    preceded(alt(("0x", "0X")), hex_digit1)
        .try_map(|digits: &str| u64::from_str_radix(digits, 16).map(|v| v as f64))
        .parse_next(input)
}
