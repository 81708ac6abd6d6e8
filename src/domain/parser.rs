//! Message text parsing.
//!
//! Provides the quote-aware argument tokenizer used by the command router, the
//! content sanitizer used by the filter pipeline, and small argument parsers
//! (durations, user mentions) shared by moderation commands.

use std::time::Duration;

use crate::domain::error::{Result, WardenError};
use crate::domain::types::{ChannelId, UserId};

/// Longest duration accepted by [`parse_duration`].
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Formatting markers stripped before content matching.
const SANITIZE_MARKERS: &[&str] = &["||", "\\", "*", "_", "`"];

/// Split text into whitespace-delimited tokens.
///
/// Text between matching quotes is kept as part of one token, and the quote
/// characters themselves are dropped, so `user="alice bob"` becomes the single
/// token `user=alice bob`. Double quotes open a span anywhere. Single quotes
/// only open one at the start of a token, so apostrophes (`don't`) stay
/// literal. A quote of the other kind inside a quoted span is kept literally.
/// An unterminated quote runs to the end of the input. An empty quoted span
/// (`""`) produces an empty token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut saw_quote = false;

    for c in text.trim().chars() {
        match quote {
            Some(open) if c == open => {
                quote = None;
            }
            Some(_) => {
                current.push(c);
            }
            None => match c {
                '"' => {
                    quote = Some(c);
                    saw_quote = true;
                }
                '\'' if current.is_empty() && !saw_quote => {
                    quote = Some(c);
                    saw_quote = true;
                }
                c if c.is_whitespace() => {
                    if !current.is_empty() || saw_quote {
                        parts.push(std::mem::take(&mut current));
                    }
                    saw_quote = false;
                }
                _ => {
                    current.push(c);
                }
            },
        }
    }

    if !current.is_empty() || saw_quote {
        parts.push(current);
    }

    parts
}

/// Split a prefixed command invocation into its command name and arguments.
///
/// Returns `None` when `text` doesn't start with `prefix`, or when nothing
/// follows the prefix.
pub fn split_command(text: &str, prefix: &str) -> Option<(String, Vec<String>)> {
    let rest = text.strip_prefix(prefix)?;
    // "! ban" is not an invocation
    if rest.starts_with(char::is_whitespace) {
        return None;
    }

    let mut tokens = tokenize(rest);
    if tokens.is_empty() {
        return None;
    }

    let name = tokens.remove(0);
    if name.is_empty() {
        return None;
    }
    Some((name, tokens))
}

/// Strip markdown markers that could be used to dodge text matching.
pub fn sanitize_content(content: &str) -> String {
    let mut sanitized = content.to_string();
    for marker in SANITIZE_MARKERS {
        sanitized = sanitized.replace(marker, "");
    }
    sanitized
}

/// Parse a compact duration such as `1h30m`, `2d` or `45s`.
///
/// Supported units: `s`, `m`, `h`, `d`, `w`. A bare number is read as seconds.
/// Anything longer than [`MAX_DURATION`] is rejected.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WardenError::InvalidDuration {
            unit: String::new(),
        });
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }

        let mut unit = String::from(c);
        while let Some(next) = chars.peek() {
            if next.is_ascii_digit() {
                break;
            }
            unit.push(*next);
            chars.next();
        }

        if number.is_empty() {
            return Err(WardenError::InvalidDuration { unit });
        }

        let multiplier = unit_seconds(&unit).ok_or_else(|| WardenError::InvalidDuration {
            unit: unit.clone(),
        })?;
        let value: u64 = number
            .parse()
            .map_err(|_| WardenError::InvalidDuration { unit: unit.clone() })?;
        total = total.saturating_add(value.saturating_mul(multiplier));
        number.clear();
    }

    if !number.is_empty() {
        let value: u64 = number.parse().map_err(|_| WardenError::InvalidDuration {
            unit: String::new(),
        })?;
        total = total.saturating_add(value);
    }

    let duration = Duration::from_secs(total);
    if duration > MAX_DURATION {
        return Err(WardenError::DurationTooLong {
            max_days: MAX_DURATION.as_secs() / 86_400,
        });
    }
    Ok(duration)
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(60 * 60),
        "d" | "day" | "days" => Some(24 * 60 * 60),
        "w" | "week" | "weeks" => Some(7 * 24 * 60 * 60),
        _ => None,
    }
}

/// Format a duration as `H:MM:SS`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Parse a user reference: a mention (`<@123>` / `<@!123>`) or a raw id.
pub fn parse_user(text: &str) -> Option<UserId> {
    let inner = text
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(text);
    inner.parse::<u64>().ok().map(UserId)
}

/// Parse a channel reference: a mention (`<#123>`) or a raw id.
pub fn parse_channel(text: &str) -> Option<ChannelId> {
    let inner = text
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(text);
    inner.parse::<u64>().ok().map(ChannelId)
}
