//! Network-containment collapse of IP/CIDR rule sets.
//!
//! Collapsing merges equal-length sibling networks into their parent and
//! drops networks contained in another, repeated to a fixed point, so the
//! output covers exactly the input's address set with the fewest entries.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::IpAddr;
use tracing::debug;

use crate::error::{Error, Result};

/// Parse one rule line as a network.
///
/// Host-only notation becomes a /32 or /128. A prefix with non-zero host
/// bits is normalized down to the containing network. Returns `None` for
/// lines that parse as neither; stray non-IP lines from misclassified
/// sources are tolerated upstream.
pub fn parse_network(line: &str) -> Option<IpNet> {
    let trimmed = line.trim();
    if trimmed.contains('/') {
        trimmed.parse::<IpNet>().ok().map(|net| net.trunc())
    } else {
        trimmed.parse::<IpAddr>().ok().map(IpNet::from)
    }
}

/// Canonicalize a merged IP/CIDR rule list.
///
/// Unparseable lines are skipped (non-fatal). The result is partitioned
/// IPv4-block-then-IPv6-block, each block ascending by network address,
/// ties broken narrower-prefix-first.
pub fn canonicalize(lines: &[String]) -> Result<Vec<IpNet>> {
    let mut v4: Vec<Ipv4Net> = Vec::new();
    let mut v6: Vec<Ipv6Net> = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        match parse_network(line) {
            Some(IpNet::V4(net)) => v4.push(net),
            Some(IpNet::V6(net)) => v6.push(net),
            None => {
                if !line.trim().is_empty() {
                    debug!("Skipping unparseable network line: {}", line);
                    skipped += 1;
                }
            }
        }
    }

    if v4.is_empty() && v6.is_empty() {
        return Err(Error::Processing(format!(
            "ip canonicalizer received no parseable networks ({} lines skipped)",
            skipped
        )));
    }

    let mut collapsed_v4 = Ipv4Net::aggregate(&v4);
    let mut collapsed_v6 = Ipv6Net::aggregate(&v6);

    // Ascending by network address; narrower network first on the (in
    // practice unreachable) address tie.
    collapsed_v4.sort_by_key(|net| (net.network(), std::cmp::Reverse(net.prefix_len())));
    collapsed_v6.sort_by_key(|net| (net.network(), std::cmp::Reverse(net.prefix_len())));

    Ok(collapsed_v4
        .into_iter()
        .map(IpNet::V4)
        .chain(collapsed_v6.into_iter().map(IpNet::V6))
        .collect())
}

/// Render a canonical network set as rule lines.
pub fn to_lines(nets: &[IpNet]) -> Vec<String> {
    nets.iter().map(|net| net.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(input: &[&str]) -> Vec<String> {
        let lines: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        to_lines(&canonicalize(&lines).unwrap())
    }

    #[test]
    fn test_parse_host_becomes_host_network() {
        assert_eq!(
            parse_network("10.0.0.1"),
            Some("10.0.0.1/32".parse().unwrap())
        );
        assert_eq!(parse_network("2001:db8::1"), Some("2001:db8::1/128".parse().unwrap()));
    }

    #[test]
    fn test_parse_normalizes_host_bits() {
        assert_eq!(
            parse_network("192.168.1.77/24"),
            Some("192.168.1.0/24".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_network("ads.example.com"), None);
        assert_eq!(parse_network("300.1.2.3/8"), None);
        assert_eq!(parse_network("10.0.0.0/33"), None);
    }

    #[test]
    fn test_sibling_halves_merge() {
        let out = canon(&["1.0.0.0/25", "1.0.0.128/25", "10.0.0.1/32"]);
        assert_eq!(out, vec!["1.0.0.0/24", "10.0.0.1/32"]);
    }

    #[test]
    fn test_contained_network_dropped() {
        let out = canon(&["10.0.0.0/8", "10.1.2.0/24"]);
        assert_eq!(out, vec!["10.0.0.0/8"]);
    }

    #[test]
    fn test_cascading_merge_reaches_fixed_point() {
        // four /26 quarters collapse through /25 up to the /24
        let out = canon(&[
            "1.2.3.0/26",
            "1.2.3.64/26",
            "1.2.3.128/26",
            "1.2.3.192/26",
        ]);
        assert_eq!(out, vec!["1.2.3.0/24"]);
    }

    #[test]
    fn test_v4_block_precedes_v6_block() {
        let out = canon(&["2001:db8::/32", "9.9.9.9"]);
        assert_eq!(out, vec!["9.9.9.9/32", "2001:db8::/32"]);
    }

    #[test]
    fn test_v6_networks_collapse_independently() {
        let out = canon(&["2001:db8::/33", "2001:db8:8000::/33"]);
        assert_eq!(out, vec!["2001:db8::/32"]);
    }

    #[test]
    fn test_ascending_numeric_order() {
        let out = canon(&["200.0.0.0/24", "9.0.0.0/24", "100.0.0.0/24"]);
        assert_eq!(
            out,
            vec!["9.0.0.0/24", "100.0.0.0/24", "200.0.0.0/24"]
        );
    }

    #[test]
    fn test_garbage_lines_skipped_non_fatally() {
        let out = canon(&["not-an-ip", "10.0.0.0/24", "payload:"]);
        assert_eq!(out, vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_all_garbage_is_processing_error() {
        let lines = vec!["foo.com".to_string(), "bar.net".to_string()];
        assert!(matches!(canonicalize(&lines), Err(Error::Processing(_))));
    }

    #[test]
    fn test_idempotent() {
        let input: Vec<String> = vec![
            "1.0.0.0/25".to_string(),
            "1.0.0.128/25".to_string(),
            "2001:db8::/48".to_string(),
        ];
        let once = to_lines(&canonicalize(&input).unwrap());
        let twice = to_lines(&canonicalize(&once).unwrap());
        assert_eq!(once, twice);
    }
}
