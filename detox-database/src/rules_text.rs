//! Text format administrators use to configure escalation ladders.
//!
//! A ladder is a JSON list of objects, one per tier:
//!
//! ```text
//! [{"warn": "careful, {score}% toxic", "reset_time": "1h"},
//!  {"warn": "muted", "delete": "1", "mute_time": "10m"}]
//! ```
//!
//! Chat clients like to "fix" quotes while typing, so smart quotes and the
//! `&quot;` entity are folded back to `"` before the JSON is read.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use detox_utils::formatting::format_shorthand_duration;
use detox_utils::parse::parse_duration_seconds;

use crate::model::rules::{Rule, RuleSet};

/// Why a ladder definition was rejected. Nothing is applied when parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("rules must be a JSON list of objects: {0}")]
    Syntax(String),
    #[error("rule #{index}: {message}")]
    Rule { index: usize, message: String },
}

// Typographic quotes plus the C1 controls left behind when cp1252 quotes are
// decoded as latin-1.
const QUOTE_VARIANTS: &[char] = &[
    '\u{0082}', '\u{0084}', '\u{008B}', '\u{0091}', '\u{0092}', '\u{0093}', '\u{0094}', '\u{009B}',
    '\u{00AB}', '\u{00BB}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}', '\u{201C}', '\u{201D}',
    '\u{201E}', '\u{201F}', '\u{2039}', '\u{203A}',
];

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleRecord {
    warn: Option<String>,
    delete: Option<FlagValue>,
    mute_time: Option<DurationValue>,
    ban_time: Option<DurationValue>,
    reset_time: Option<DurationValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Text(String),
}

/// Parse a ladder definition. Either every tier is valid or nothing is returned.
pub fn parse_rules(text: &str) -> Result<RuleSet, ParseError> {
    let canonical = canonicalize_quotes(text);

    let document: Value =
        serde_json::from_str(&canonical).map_err(|e| ParseError::Syntax(e.to_string()))?;
    let Value::Array(items) = document else {
        return Err(ParseError::Syntax("expected a list of rules".to_owned()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: RuleRecord = serde_json::from_value(item).map_err(|e| ParseError::Rule {
                index: index + 1,
                message: e.to_string(),
            })?;
            rule_from_record(record).map_err(|message| ParseError::Rule {
                index: index + 1,
                message,
            })
        })
        .collect()
}

/// Render a ladder back to the text format, listing only non-default fields.
///
/// `parse_rules(&render_rules(rules)) == rules` holds for every ladder.
pub fn render_rules(rules: &[Rule]) -> String {
    let items = rules.iter().map(rule_to_value).collect::<Vec<_>>();
    let json = Value::Array(items).to_string();

    // Escape what `parse_rules` would otherwise rewrite inside string values.
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch == '&' || QUOTE_VARIANTS.contains(&ch) {
            out.push_str(&format!("\\u{:04x}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

fn canonicalize_quotes(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|ch| if QUOTE_VARIANTS.contains(&ch) { '"' } else { ch })
        .collect();
    folded.replace("&quot;", "\"").replace("&quot", "\"")
}

fn rule_from_record(record: RuleRecord) -> Result<Rule, String> {
    Ok(Rule {
        warn: record.warn.unwrap_or_default(),
        delete: match record.delete {
            Some(flag) => flag_to_bool(flag)?,
            None => false,
        },
        mute_time: duration_field("mute_time", record.mute_time)?,
        ban_time: duration_field("ban_time", record.ban_time)?,
        reset_time: duration_field("reset_time", record.reset_time)?,
    })
}

fn flag_to_bool(flag: FlagValue) -> Result<bool, String> {
    match flag {
        FlagValue::Bool(value) => Ok(value),
        FlagValue::Number(0) => Ok(false),
        FlagValue::Number(1) => Ok(true),
        FlagValue::Text(text) if text.trim() == "0" => Ok(false),
        FlagValue::Text(text) if text.trim() == "1" => Ok(true),
        _ => Err("`delete` must be 0 or 1".to_owned()),
    }
}

fn duration_field(name: &str, value: Option<DurationValue>) -> Result<u64, String> {
    match value {
        None => Ok(0),
        Some(DurationValue::Seconds(seconds)) => Ok(seconds),
        Some(DurationValue::Text(text)) => parse_duration_seconds(&text).ok_or_else(|| {
            format!("`{name}` has invalid duration `{text}` (expected e.g. 1h30m0s, 10m, 45s)")
        }),
    }
}

fn rule_to_value(rule: &Rule) -> Value {
    let mut fields = Map::new();
    if !rule.warn.is_empty() {
        fields.insert("warn".to_owned(), Value::String(rule.warn.clone()));
    }
    if rule.delete {
        fields.insert("delete".to_owned(), Value::String("1".to_owned()));
    }

    let durations = [
        ("mute_time", rule.mute_time),
        ("ban_time", rule.ban_time),
        ("reset_time", rule.reset_time),
    ];
    for (name, seconds) in durations {
        if seconds > 0 {
            fields.insert(
                name.to_owned(),
                Value::String(format_shorthand_duration(seconds)),
            );
        }
    }

    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::{ParseError, parse_rules, render_rules};
    use crate::model::rules::Rule;

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule {
                warn: "careful, that was {score}% toxic".to_owned(),
                reset_time: 3_600,
                ..Rule::default()
            },
            Rule {
                warn: "“quoted” & 'single' \"escaped\" &quot; text".to_owned(),
                delete: true,
                mute_time: 600,
                reset_time: 86_400,
                ..Rule::default()
            },
            Rule {
                ban_time: 5_400,
                ..Rule::default()
            },
            Rule::default(),
        ]
    }

    #[test]
    fn render_then_parse_round_trips() {
        let rules = sample_rules();
        assert_eq!(parse_rules(&render_rules(&rules)), Ok(rules));
        assert_eq!(parse_rules(&render_rules(&[])), Ok(vec![]));
    }

    #[test]
    fn render_omits_default_fields() {
        let rendered = render_rules(&[
            Rule::warn("hi"),
            Rule {
                delete: true,
                mute_time: 5_400,
                ..Rule::default()
            },
            Rule::default(),
        ]);
        assert_eq!(
            rendered,
            r#"[{"warn":"hi"},{"delete":"1","mute_time":"1h30m"},{}]"#
        );
    }

    #[test]
    fn smart_quotes_parse_like_straight_quotes() {
        let straight = parse_rules(r#"[{"warn": "x", "delete": "1"}]"#);
        let smart = parse_rules("[{“warn”: “x”, “delete”: “1”}]");
        let mixed = parse_rules("[{&quot;warn&quot;: „x”, «delete»: ‘1’}]");

        assert_eq!(straight, Ok(vec![Rule {
            warn: "x".to_owned(),
            delete: true,
            ..Rule::default()
        }]));
        assert_eq!(smart, straight);
        assert_eq!(mixed, straight);
    }

    #[test]
    fn parses_durations_and_flags() {
        let rules = parse_rules(
            r#"[{"mute_time": "1h30m0s", "ban_time": 60, "reset_time": "2d", "delete": 0},
                {"delete": true, "reset_time": "10m"}]"#,
        )
        .unwrap();

        assert_eq!(rules[0].mute_time, 5_400);
        assert_eq!(rules[0].ban_time, 60);
        assert_eq!(rules[0].reset_time, 172_800);
        assert!(!rules[0].delete);
        assert!(rules[1].delete);
        assert_eq!(rules[1].reset_time, 600);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(parse_rules(""), Err(ParseError::Syntax(_))));
        assert!(matches!(parse_rules("{\"warn\": \"x\"}"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse_rules("[{\"warn\": \"x\"}"), Err(ParseError::Syntax(_))));
    }

    #[test]
    fn rejects_bad_rules_atomically() {
        let cases = [
            r#"[{"warn": "ok"}, {"mute": "10m"}]"#,
            r#"[{"warn": "ok"}, {"delete": "2"}]"#,
            r#"[{"warn": "ok"}, {"mute_time": "ten minutes"}]"#,
            r#"[{"warn": 5}]"#,
            r#"[{"warn": "ok"}, "not a rule"]"#,
            r#"[{"ban_time": -1}]"#,
        ];

        for input in cases {
            assert!(
                matches!(parse_rules(input), Err(ParseError::Rule { .. })),
                "input: {input}"
            );
        }

        assert_eq!(
            parse_rules(r#"[{"warn": "ok"}, {"delete": "2"}]"#),
            Err(ParseError::Rule {
                index: 2,
                message: "`delete` must be 0 or 1".to_owned(),
            })
        );
    }
}
