//! Per-line text processors applied to fetched source payloads.
//!
//! Processors are pure text-to-text transforms, composed left-to-right in
//! the order the source declares them. None of them may reorder lines;
//! ordering is the canonicalizers' job.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{FilterAction, FilterRule};
use crate::error::{Error, Result};

/// Named processor, validated at config load time so an unknown name is a
/// configuration error rather than a silent skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    RemoveCommentsAndEmpty,
    FormatYamlList,
    FormatPihole,
}

impl ProcessorKind {
    /// Apply this processor to a text block.
    pub fn apply(self, text: &str) -> String {
        match self {
            ProcessorKind::RemoveCommentsAndEmpty => remove_comments_and_empty(text),
            ProcessorKind::FormatYamlList => format_yaml_list(text),
            ProcessorKind::FormatPihole => format_pihole(text),
        }
    }
}

/// Apply a processor chain left-to-right.
pub fn apply_chain(processors: &[ProcessorKind], text: String) -> String {
    processors
        .iter()
        .fold(text, |acc, p| p.apply(&acc))
}

/// Drop lines that are empty after trimming or start with a `#` comment.
pub fn remove_comments_and_empty(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect();
    lines.join("\n")
}

/// Extract list items from a Clash-style `payload:` block.
///
/// Everything before the marker is discarded; list items after it are
/// stripped of their `- ` prefix and surrounding quotes. Extraction stops
/// at the first non-list line after the marker.
pub fn format_yaml_list(text: &str) -> String {
    let mut items: Vec<&str> = Vec::new();
    let mut in_payload = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if !in_payload {
            if trimmed.starts_with("payload:") {
                in_payload = true;
            }
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('-') {
            let item = rest
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .trim();
            if !item.is_empty() {
                items.push(item);
            }
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            // blank lines and comments inside the block are tolerated
            continue;
        } else {
            break;
        }
    }

    items.join("\n")
}

/// Convert bare hostnames to anchored-domain rules by prepending `+.`.
///
/// Lines that do not start with an alphanumeric character (comments,
/// already-anchored rules) pass through unchanged.
pub fn format_pihole(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            if line.chars().next().is_some_and(|c| c.is_alphanumeric()) {
                format!("+.{}", line)
            } else {
                line.to_string()
            }
        })
        .collect();
    lines.join("\n")
}

/// Apply a task's declarative include/exclude filters to merged lines.
///
/// If any include rule is present, a line must match at least one include
/// to survive; exclude rules then drop matching lines.
pub fn apply_filters(lines: Vec<String>, rules: &[FilterRule]) -> Result<Vec<String>> {
    if rules.is_empty() {
        return Ok(lines);
    }

    let mut includes: Vec<Regex> = Vec::new();
    let mut excludes: Vec<Regex> = Vec::new();
    for rule in rules {
        let re = Regex::new(&rule.pattern)
            .map_err(|e| Error::Config(format!("invalid filter pattern '{}': {e}", rule.pattern)))?;
        match rule.action {
            FilterAction::Include => includes.push(re),
            FilterAction::Exclude => excludes.push(re),
        }
    }

    Ok(lines
        .into_iter()
        .filter(|line| {
            if !includes.is_empty() && !includes.iter().any(|re| re.is_match(line)) {
                return false;
            }
            !excludes.iter().any(|re| re.is_match(line))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_comments_and_empty() {
        let input = "# header\n\nfoo.com\n   \n# tail\nbar.net\n";
        assert_eq!(remove_comments_and_empty(input), "foo.com\nbar.net");
    }

    #[test]
    fn test_remove_comments_keeps_inline_hash() {
        // only leading '#' marks a comment
        let input = "foo.com#fragment\n# real comment";
        assert_eq!(remove_comments_and_empty(input), "foo.com#fragment");
    }

    #[test]
    fn test_format_yaml_list_extracts_payload() {
        let input = "payload:\n  - 'foo.com'\n  - bar.com";
        assert_eq!(format_yaml_list(input), "foo.com\nbar.com");
    }

    #[test]
    fn test_format_yaml_list_discards_preamble_and_stops_at_block_end() {
        let input = "# generated\nrules: 2\npayload:\n  - \"a.com\"\n  - b.com\nfooter: true\n  - c.com";
        assert_eq!(format_yaml_list(input), "a.com\nb.com");
    }

    #[test]
    fn test_format_yaml_list_without_marker_is_empty() {
        assert_eq!(format_yaml_list("- a.com\n- b.com"), "");
    }

    #[test]
    fn test_format_pihole_anchors_hostnames() {
        let input = "ads.example.com\n# comment\n0.pool.ntp.org";
        assert_eq!(
            format_pihole(input),
            "+.ads.example.com\n# comment\n+.0.pool.ntp.org"
        );
    }

    #[test]
    fn test_format_pihole_leaves_anchored_lines() {
        let input = "+.already.com\n*.wild.com";
        assert_eq!(format_pihole(input), "+.already.com\n*.wild.com");
    }

    #[test]
    fn test_apply_chain_order() {
        // comments stripped first, then anchoring; reversing the chain
        // would anchor nothing since format_pihole skips nothing here
        let input = "# note\nfoo.com";
        let out = apply_chain(
            &[
                ProcessorKind::RemoveCommentsAndEmpty,
                ProcessorKind::FormatPihole,
            ],
            input.to_string(),
        );
        assert_eq!(out, "+.foo.com");
    }

    #[test]
    fn test_processors_never_reorder() {
        let input = "b.com\na.com\nc.com";
        assert_eq!(format_pihole(input), "+.b.com\n+.a.com\n+.c.com");
        assert_eq!(remove_comments_and_empty(input), input);
    }

    #[test]
    fn test_apply_filters_exclude() {
        let lines = vec!["ads.com".to_string(), "keep.net".to_string()];
        let rules = vec![FilterRule {
            action: FilterAction::Exclude,
            pattern: r"\.com$".to_string(),
        }];
        assert_eq!(apply_filters(lines, &rules).unwrap(), vec!["keep.net"]);
    }

    #[test]
    fn test_apply_filters_include_then_exclude() {
        let lines = vec![
            "a.example.com".to_string(),
            "b.example.com".to_string(),
            "other.net".to_string(),
        ];
        let rules = vec![
            FilterRule {
                action: FilterAction::Include,
                pattern: r"example\.com$".to_string(),
            },
            FilterRule {
                action: FilterAction::Exclude,
                pattern: r"^b\.".to_string(),
            },
        ];
        assert_eq!(apply_filters(lines, &rules).unwrap(), vec!["a.example.com"]);
    }

    #[test]
    fn test_apply_filters_empty_rules_identity() {
        let lines = vec!["x".to_string(), "y".to_string()];
        assert_eq!(apply_filters(lines.clone(), &[]).unwrap(), lines);
    }
}
