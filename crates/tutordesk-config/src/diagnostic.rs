// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment errors and validation failures both end up as [`ConfigError`]s.
//! Whenever the offending key can be found in one of the TOML sources the
//! diagnostic carries a span, including keys inside `[[escalation.shifts]]`
//! entries, which are addressed by their position in the file.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Array-of-tables holding the per-course shift windows.
pub const SHIFTS_TABLE: &str = "escalation.shifts";

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(tutordesk::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated valid keys of the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(tutordesk::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// Only shift entries have keys without defaults.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(tutordesk::config::missing_key),
        help("every [[escalation.shifts]] entry needs `course`, `start` and `end`")
    )]
    MissingKey { key: String },

    /// One `[[escalation.shifts]]` entry is unusable.
    #[error("escalation.shifts[{index}].{field}: {message}")]
    #[diagnostic(
        code(tutordesk::config::shift),
        help("shift windows are `HH:MM` local times, `days` are weekday names, `course` must be listed in roles.courses")
    )]
    InvalidShift {
        /// Position of the entry among the `[[escalation.shifts]]` tables.
        index: usize,
        field: &'static str,
        message: String,
        #[label("{message}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(tutordesk::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tutordesk::config::other))]
    Other(String),
}

impl ConfigError {
    /// A shift error not yet tied to a source location.
    pub fn shift(index: usize, field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::InvalidShift {
            index,
            field,
            message: message.into(),
            span: None,
            src: None,
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// The TOML table a key is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section<'a> {
    /// Keys before the first table header.
    Root,
    /// A `[name]` table.
    Table(&'a str),
    /// The `index`-th `[[name]]` table.
    Entry { name: &'a str, index: usize },
}

/// Byte offset of `field` inside `section` of a TOML document.
///
/// The search stops at the next table header, so a key of the same name in a
/// later section is never reported.
pub fn find_key_offset(content: &str, section: Section<'_>, field: &str) -> Option<usize> {
    let mut inside = section == Section::Root;
    let mut entries_seen = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if inside {
                return None;
            }
            inside = match section {
                Section::Root => false,
                Section::Table(name) => table_name(trimmed, "[", "]") == Some(name),
                Section::Entry { name, index } => {
                    if table_name(trimmed, "[[", "]]") == Some(name) {
                        entries_seen += 1;
                        entries_seen == index + 1
                    } else {
                        false
                    }
                }
            };
        } else if inside && key_matches(trimmed, field) {
            return Some(offset + (line.len() - line.trim_start().len()));
        }
        offset += line.len();
    }
    None
}

fn table_name<'l>(header: &'l str, open: &str, close: &str) -> Option<&'l str> {
    let inner = header.strip_prefix(open)?;
    let end = inner.find(close)?;
    // `[[x]]` must not be read as the plain table `[x]`.
    if open == "[" && inner.starts_with('[') {
        return None;
    }
    Some(inner[..end].trim())
}

fn key_matches(line: &str, field: &str) -> bool {
    line.strip_prefix(field)
        .and_then(|rest| rest.trim_start().strip_prefix('='))
        .is_some()
}

/// Length of the `key = value` text starting at `offset`, comments excluded.
fn entry_len(content: &str, offset: usize) -> usize {
    let line = content[offset..].lines().next().unwrap_or_default();
    let code = line.split(" #").next().unwrap_or(line);
    code.trim_end().len()
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error may carry several errors; each one becomes a diagnostic.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let suggestion = suggest_key(field, expected);
                let (span, src) = locate_unknown_key(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion,
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: qualified(&error.path, field),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

fn qualified(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// Pick the TOML source figment blames, or the only source when figment
/// names none (inline strings).
fn blamed_source<'s>(
    error: &figment::error::Error,
    toml_sources: &'s [(String, String)],
) -> Option<&'s (String, String)> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match file {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    }
}

fn locate_unknown_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((path, content)) = blamed_source(error, toml_sources) else {
        return (None, None);
    };

    let table = error.path.join(".");
    let offset = if table.is_empty() {
        find_key_offset(content, Section::Root, field)
    } else if table.starts_with(SHIFTS_TABLE) {
        // Figment does not say which entry; blame the first one using the key.
        (0..content.matches("[[").count()).find_map(|index| {
            find_key_offset(content, Section::Entry { name: SHIFTS_TABLE, index }, field)
        })
    } else {
        find_key_offset(content, Section::Table(&table), field)
    };

    match offset {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Point every [`ConfigError::InvalidShift`] at its `key = value` line.
///
/// Sources are tried in order; the first one holding the entry wins.
pub fn attach_shift_spans(errors: &mut [ConfigError], toml_sources: &[(String, String)]) {
    for error in errors.iter_mut() {
        let ConfigError::InvalidShift {
            index,
            field,
            span,
            src,
            ..
        } = error
        else {
            continue;
        };
        let section = Section::Entry {
            name: SHIFTS_TABLE,
            index: *index,
        };
        let found = toml_sources.iter().find_map(|(path, content)| {
            find_key_offset(content, section, field).map(|offset| (path, content, offset))
        });
        if let Some((path, content, offset)) = found {
            *span = Some(SourceSpan::new(offset.into(), entry_len(content, offset)));
            *src = Some(NamedSource::new(path, content.clone()));
        }
    }
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIFTS: &str = "\
[roles]
courses = [\"HardDE\"]

[[escalation.shifts]]
course = \"HardDE\"
start = \"09:00\"
end = \"18:00\"

[[escalation.shifts]]
course = \"HardDE\"
start = \"9am\" # typo
end = \"23:00\"

[service]
start = \"unrelated\"
";

    #[test]
    fn suggest_queue_key_for_typo() {
        let valid = &["queue_key", "tracked_statuses"];
        assert_eq!(suggest_key("queue_kye", valid), Some("queue_key".to_string()));
    }

    #[test]
    fn suggestion_picks_closest_key() {
        let valid = &["period_secs", "response_sla_secs", "retry_backoff_secs"];
        assert_eq!(
            suggest_key("respons_sla_secs", valid),
            Some("response_sla_secs".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_is_found_only_inside_its_table() {
        let content = "[service]\nlog_level = \"info\"\n[tracker]\nqueue_kye = \"X\"\n";
        let o = find_key_offset(content, Section::Table("tracker"), "queue_kye").unwrap();
        assert_eq!(&content[o..o + 9], "queue_kye");
        assert!(find_key_offset(content, Section::Table("service"), "queue_kye").is_none());
        assert!(find_key_offset(content, Section::Table("gateway"), "port").is_none());
    }

    #[test]
    fn array_entries_are_addressed_by_position() {
        let second = Section::Entry {
            name: SHIFTS_TABLE,
            index: 1,
        };
        let o = find_key_offset(SHIFTS, second, "start").unwrap();
        assert!(SHIFTS[o..].starts_with("start = \"9am\""));

        let first = Section::Entry {
            name: SHIFTS_TABLE,
            index: 0,
        };
        let o = find_key_offset(SHIFTS, first, "start").unwrap();
        assert!(SHIFTS[o..].starts_with("start = \"09:00\""));

        let missing = Section::Entry {
            name: SHIFTS_TABLE,
            index: 2,
        };
        assert!(find_key_offset(SHIFTS, missing, "start").is_none());
    }

    #[test]
    fn shift_errors_get_spans_without_trailing_comment() {
        let sources = vec![("tutordesk.toml".to_string(), SHIFTS.to_string())];
        let mut errors = vec![
            ConfigError::shift(1, "start", "`9am` is not a valid HH:MM time"),
            ConfigError::shift(5, "end", "out of range entry"),
        ];
        attach_shift_spans(&mut errors, &sources);

        let ConfigError::InvalidShift { span: Some(span), src: Some(_), .. } = &errors[0] else {
            panic!("expected a located shift error, got {:?}", errors[0]);
        };
        let start = span.offset();
        assert_eq!(&SHIFTS[start..start + span.len()], "start = \"9am\"");

        assert!(matches!(
            &errors[1],
            ConfigError::InvalidShift { span: None, src: None, .. }
        ));
    }

    #[test]
    fn shift_error_renders_with_source_line() {
        use miette::GraphicalReportHandler;

        let sources = vec![("tutordesk.toml".to_string(), SHIFTS.to_string())];
        let mut errors = vec![ConfigError::shift(1, "start", "not a valid HH:MM time")];
        attach_shift_spans(&mut errors, &sources);

        let mut buf = String::new();
        GraphicalReportHandler::new()
            .render_report(&mut buf, &errors[0])
            .unwrap();
        assert!(buf.contains("escalation.shifts[1].start"));
        assert!(buf.contains("9am"));
    }
}
