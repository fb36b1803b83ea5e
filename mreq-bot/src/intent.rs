//! Intent parsing
//!
//! Turns raw chat text into one of:
//! - a song query (explicit command or natural-language lead-in),
//! - a numeric selection (only while a session is open),
//! - an empty command (command typed without a search term),
//! - no match (the message is not for this bot).
//!
//! Priority is fixed: numeric selection (open session only), then command
//! names in configured order, then trigger phrases in configured order.
//! The first matching pattern wins.

use mreq_common::config::BotConfig;
use mreq_common::{Error, Result};
use regex::Regex;

/// Suffixes stripped from natural-language terms ("来一首稻香的歌" → "稻香").
/// Longest first.
const TERM_SUFFIXES: [&str; 3] = ["的歌曲", "的音乐", "的歌"];

/// Which trigger class produced a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Command,
    Phrase,
}

/// Canonical song lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    pub raw_text: String,
    pub search_term: String,
    pub trigger: TriggerKind,
}

/// Numeric reply to a selection prompt (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionInput {
    pub index: usize,
}

/// Result of parsing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Query(QueryIntent),
    Selection(SelectionInput),
    /// Command recognised but no search term given
    EmptyCommand,
    NoMatch,
}

struct Trigger {
    pattern: Regex,
    kind: TriggerKind,
}

/// Stateless parser built once from the trigger tables in [`BotConfig`]
pub struct IntentParser {
    selection: Regex,
    triggers: Vec<Trigger>,
}

impl IntentParser {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let selection = Regex::new(r"^[0-9]+$")
            .map_err(|e| Error::Internal(format!("selection pattern: {}", e)))?;

        let commands = config.command_names.iter().map(|name| {
            (
                format!("{}{}", config.command_prefix, name.trim()),
                TriggerKind::Command,
            )
        });
        let phrases = config
            .trigger_phrases
            .iter()
            .map(|phrase| (phrase.trim().to_string(), TriggerKind::Phrase));

        let triggers = commands
            .chain(phrases)
            .map(|(lead_in, kind)| {
                Ok(Trigger {
                    pattern: lead_in_pattern(&lead_in)?,
                    kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selection,
            triggers,
        })
    }

    /// Classify `raw_text`.
    ///
    /// A bare positive integer is a selection only when `has_open_session` is
    /// true; otherwise it falls through and, matching no trigger, is `NoMatch`.
    pub fn parse(&self, raw_text: &str, has_open_session: bool) -> ParsedInput {
        let text = raw_text.trim();

        if has_open_session && self.selection.is_match(text) {
            if let Some(index) = parse_positive_index(text) {
                return ParsedInput::Selection(SelectionInput { index });
            }
        }

        for trigger in &self.triggers {
            let Some(captures) = trigger.pattern.captures(text) else {
                continue;
            };
            let rest = captures.name("term").map_or("", |m| m.as_str()).trim();

            return match trigger.kind {
                TriggerKind::Command if rest.is_empty() => ParsedInput::EmptyCommand,
                TriggerKind::Command => query(raw_text, rest, TriggerKind::Command),
                TriggerKind::Phrase => {
                    let term = strip_term_suffix(rest);
                    if term.is_empty() {
                        ParsedInput::NoMatch
                    } else {
                        query(raw_text, term, TriggerKind::Phrase)
                    }
                }
            };
        }

        ParsedInput::NoMatch
    }
}

fn query(raw_text: &str, term: &str, trigger: TriggerKind) -> ParsedInput {
    ParsedInput::Query(QueryIntent {
        raw_text: raw_text.to_string(),
        search_term: term.to_string(),
        trigger,
    })
}

/// Build `^lead-in<boundary><term>` for one command or phrase.
///
/// A lead-in ending in an ASCII letter or digit must be followed by whitespace
/// or the end of input, so `play` does not match `player`. Other lead-ins
/// (CJK) may run straight into the term.
fn lead_in_pattern(lead_in: &str) -> Result<Regex> {
    let needs_boundary = lead_in
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    let escaped = regex::escape(lead_in);
    let pattern = if needs_boundary {
        format!(r"(?s)^(?i:{})(?:\s+(?P<term>.*))?$", escaped)
    } else {
        format!(r"(?s)^(?i:{})\s*(?P<term>.*)$", escaped)
    };

    Regex::new(&pattern)
        .map_err(|e| Error::Config(format!("invalid trigger '{}': {}", lead_in, e)))
}

/// Digits only; zero is not a valid index. Values beyond `usize` saturate and
/// are rejected later as out of range.
fn parse_positive_index(digits: &str) -> Option<usize> {
    let index = digits.parse::<usize>().unwrap_or(usize::MAX);
    (index > 0).then_some(index)
}

fn strip_term_suffix(term: &str) -> &str {
    TERM_SUFFIXES
        .iter()
        .find_map(|suffix| term.strip_suffix(suffix))
        .unwrap_or(term)
        .trim()
}
