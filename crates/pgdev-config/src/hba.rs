//! `pg_hba.conf` compilation.
//!
//! Built-in rules always come first, user rules follow verbatim. Nothing is
//! deduplicated; the server resolves rules first-match-wins.

use serde::{Deserialize, Serialize};

const HEADER: &str = "# Generated by pgdev\n# TYPE\tDATABASE\tUSER\tADDRESS\tMETHOD\n";

/// One host-based authentication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HbaRule {
    /// Connection type (`local`, `host`, `hostssl`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Database selector.
    pub database: String,
    /// User selector.
    pub user: String,
    /// Client address; empty for `local` rules.
    #[serde(default)]
    pub address: String,
    /// Authentication method.
    pub method: String,
}

impl HbaRule {
    /// Build a rule from its five columns.
    #[must_use]
    pub fn new(kind: &str, database: &str, user: &str, address: &str, method: &str) -> Self {
        Self {
            kind: kind.to_string(),
            database: database.to_string(),
            user: user.to_string(),
            address: address.to_string(),
            method: method.to_string(),
        }
    }

    /// Tab-separated line in `TYPE DATABASE USER ADDRESS METHOD` order.
    #[must_use]
    pub fn render_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.kind, self.database, self.user, self.address, self.method
        )
    }
}

/// Trust rules for the local socket and loopback, for regular and
/// replication connections.
#[must_use]
pub fn default_rules() -> [HbaRule; 6] {
    [
        HbaRule::new("local", "all", "all", "", "trust"),
        HbaRule::new("host", "all", "all", "127.0.0.1/32", "trust"),
        HbaRule::new("host", "all", "all", "::1/128", "trust"),
        HbaRule::new("local", "replication", "all", "", "trust"),
        HbaRule::new("host", "replication", "all", "127.0.0.1/32", "trust"),
        HbaRule::new("host", "replication", "all", "::1/128", "trust"),
    ]
}

/// Render the defaults followed by `user_rules`.
#[must_use]
pub fn compile(user_rules: &[HbaRule]) -> String {
    let mut rendered = String::from(HEADER);
    for rule in default_rules().iter().chain(user_rules) {
        rendered.push_str(&rule.render_line());
        rendered.push('\n');
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_lines(rendered: &str) -> Vec<&str> {
        rendered.lines().skip(2).collect()
    }

    #[test]
    fn header_has_two_comment_lines() {
        let rendered = compile(&[]);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("# Generated by pgdev"));
        assert_eq!(lines.next(), Some("# TYPE\tDATABASE\tUSER\tADDRESS\tMETHOD"));
    }

    #[test]
    fn defaults_precede_user_rules_in_order() {
        let user = vec![
            HbaRule::new("host", "app", "alice", "10.0.0.0/8", "md5"),
            HbaRule::new("host", "all", "all", "0.0.0.0/0", "reject"),
        ];
        let rendered = compile(&user);
        let lines = body_lines(&rendered);
        assert_eq!(lines.len(), 8);

        let defaults: Vec<String> = default_rules().iter().map(HbaRule::render_line).collect();
        assert_eq!(&lines[..6], defaults.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(lines[6], "host\tapp\talice\t10.0.0.0/8\tmd5");
        assert_eq!(lines[7], "host\tall\tall\t0.0.0.0/0\treject");
    }

    #[test]
    fn six_default_lines_regardless_of_user_rules() {
        for count in [0_usize, 1, 5] {
            let user: Vec<HbaRule> = (0..count)
                .map(|idx| HbaRule::new("host", &format!("db{idx}"), "all", "::1/128", "trust"))
                .collect();
            let rendered = compile(&user);
            let lines = body_lines(&rendered);
            assert_eq!(lines.len(), 6 + count);
            assert_eq!(lines[0], "local\tall\tall\t\ttrust");
            assert_eq!(lines[5], "host\treplication\tall\t::1/128\ttrust");
        }
    }

    #[test]
    fn duplicate_rules_pass_through() {
        let rule = default_rules()[0].clone();
        let rendered = compile(&[rule.clone(), rule]);
        let count = body_lines(&rendered)
            .iter()
            .filter(|line| **line == "local\tall\tall\t\ttrust")
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn rule_deserialises_type_field() {
        let rule: HbaRule = serde_json::from_str(
            r#"{"type":"local","database":"all","user":"all","method":"peer"}"#,
        )
        .expect("parse rule");
        assert_eq!(rule.kind, "local");
        assert!(rule.address.is_empty());
    }
}
