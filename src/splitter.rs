//! Multi-statement splitting.
//!
//! Divides a string of `;`-separated statements into individual statements
//! without breaking on semicolons inside single-quoted literals or at the
//! `END` of a `BEGIN ... END` compound body.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Lookahead for a semicolon that terminates a compound body: optional
    /// whitespace then the keyword END at a word boundary.
    static ref END_AHEAD: Regex = Regex::new(r"(?i)^\s*end\b").unwrap();
}

/// Split `sql` into its individual statements, in source order.
///
/// A string without any `;` is returned as-is (fast path). Empty fragments
/// are dropped; a non-empty final fragment without a trailing semicolon is
/// still a statement.
pub fn split_statements(sql: &str) -> Vec<String> {
    if !sql.contains(';') {
        return vec![sql.to_string()];
    }

    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    let mut in_literal = false;

    while idx < bytes.len() {
        let b = bytes[idx];
        if in_literal {
            match b {
                // Backslash escapes the next character, including \' and \\.
                b'\\' => idx += 1,
                b'\'' => {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // doubled quote stays inside the literal
                    } else {
                        in_literal = false;
                    }
                }
                _ => {}
            }
        } else {
            match b {
                b'\'' => in_literal = true,
                b';' => {
                    // `...; END` closes a BEGIN block; keep it in the
                    // current statement instead of splitting here.
                    if !END_AHEAD.is_match(&sql[idx + 1..]) {
                        push_fragment(&mut statements, &sql[start..idx]);
                        start = idx + 1;
                    }
                }
                _ => {}
            }
        }
        idx += 1;
    }

    push_fragment(&mut statements, &sql[start..]);
    statements
}

fn push_fragment(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_semicolon_is_returned_unchanged() {
        let sql = "SELECT * FROM t WHERE a = 1";
        assert_eq!(split_statements(sql), vec![sql.to_string()]);
    }

    #[test]
    fn splits_in_source_order() {
        let parts = split_statements("INSERT INTO t VALUES (1); INSERT INTO t VALUES (2);");
        assert_eq!(
            parts,
            vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2)"]
        );
    }

    #[test]
    fn quoted_semicolon_is_not_a_separator() {
        let parts = split_statements("INSERT INTO t VALUES ('a;b'); SELECT 1;");
        assert_eq!(
            parts,
            vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literals() {
        let parts = split_statements(r"INSERT INTO t VALUES ('it''s; here'); SELECT 1;");
        assert_eq!(parts.len(), 2);
        let parts = split_statements(r"INSERT INTO t VALUES ('a\'; b'); SELECT 1;");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], r"INSERT INTO t VALUES ('a\'; b')");
    }

    #[test]
    fn begin_end_body_stays_whole() {
        let sql = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN \
                   UPDATE t SET a = 1; END; SELECT 1;";
        let parts = split_statements(sql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("UPDATE t SET a = 1; END"));
        assert_eq!(parts[1], "SELECT 1");
    }

    #[test]
    fn end_keyword_is_case_insensitive_and_padded() {
        let sql = "BEGIN UPDATE t SET a = 1;   end; SELECT 2";
        let parts = split_statements(sql);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], "SELECT 2");
    }

    #[test]
    fn end_prefix_identifiers_do_not_suppress_splits() {
        // `endpoint` is not the END keyword.
        let parts = split_statements("SELECT 1; endpoint_update();");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn trailing_fragment_without_semicolon_is_kept() {
        let parts = split_statements("SELECT 1; SELECT 2");
        assert_eq!(parts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn empty_fragments_are_dropped() {
        let parts = split_statements("SELECT 1; ;  ;");
        assert_eq!(parts, vec!["SELECT 1"]);
    }
}
