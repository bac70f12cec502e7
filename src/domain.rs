//! Hierarchy-aware deduplication of domain rule sets.
//!
//! A rule whose clean domain is covered by an already-kept ancestor (a
//! dot-label suffix of it) is redundant and dropped. The surviving set is
//! an antichain: no member's clean domain is a dot-suffix of another's.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{Error, Result};

/// Canonicalized domain rule set plus non-fatal diagnostics.
#[derive(Debug)]
pub struct DomainSet {
    /// Surviving rule lines, in canonical order
    pub lines: Vec<String>,
    /// Subdomain-sprawl warnings; informational only
    pub warnings: Vec<String>,
}

/// Strip any leading run of wildcard/anchor marker characters.
///
/// `+.foo.com`, `*.foo.com` and `.foo.com` all clean to `foo.com`.
pub fn clean_domain(rule: &str) -> &str {
    rule.trim_start_matches(['+', '*', '.'])
}

/// Canonicalize a merged domain rule list.
///
/// `suffix_warn_threshold` is the surviving-subdomain count per parent
/// suffix that triggers a sprawl warning (rules with at least four labels
/// only).
pub fn canonicalize(lines: &[String], suffix_warn_threshold: usize) -> Result<DomainSet> {
    let mut rules: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if rules.is_empty() {
        return Err(Error::Processing(
            "domain canonicalizer received no rules".to_string(),
        ));
    }

    // More general domains first; the sort is stable so rules with equal
    // label counts keep their source-declaration order.
    rules.sort_by_key(|rule| clean_domain(rule).split('.').count());

    let mut kept_roots: HashSet<&str> = HashSet::new();
    let mut survivors: Vec<String> = Vec::new();

    for rule in rules {
        let clean = clean_domain(rule);
        if covered_by(clean, &kept_roots) {
            debug!("Dropping redundant rule: {}", rule);
            continue;
        }
        kept_roots.insert(clean);
        survivors.push(rule.to_string());
    }

    let warnings = sprawl_warnings(&survivors, suffix_warn_threshold);

    Ok(DomainSet {
        lines: survivors,
        warnings,
    })
}

/// Test whether `clean` or any proper dot-separated suffix of it is an
/// already-kept root.
fn covered_by(clean: &str, kept_roots: &HashSet<&str>) -> bool {
    if kept_roots.contains(clean) {
        return true;
    }
    let mut rest = clean;
    while let Some(pos) = rest.find('.') {
        rest = &rest[pos + 1..];
        if kept_roots.contains(rest) {
            return true;
        }
    }
    false
}

/// Group surviving deep rules (>= 4 labels) by their parent suffix and
/// flag any suffix with at least `threshold` members. Signals likely
/// subdomain sprawl worth manual review; does not alter the output.
fn sprawl_warnings(survivors: &[String], threshold: usize) -> Vec<String> {
    let mut groups: HashMap<&str, usize> = HashMap::new();
    for rule in survivors {
        let clean = clean_domain(rule);
        if clean.split('.').count() < 4 {
            continue;
        }
        if let Some(pos) = clean.find('.') {
            *groups.entry(&clean[pos + 1..]).or_insert(0) += 1;
        }
    }

    let mut flagged: Vec<(&str, usize)> = groups
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    flagged.sort();

    flagged
        .into_iter()
        .map(|(suffix, count)| {
            format!(
                "{} rules share the suffix '{}'; consider a single covering rule",
                count, suffix
            )
        })
        .collect()
}
