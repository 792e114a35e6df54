//! Log analysis: top error patterns, a notable trace line and correlated request ids.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::{ErrorPattern, LogFinding};

pub const DEFAULT_TOP_N: usize = 5;
pub const MAX_CORRELATED_IDS: usize = 10;

static REQUEST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"request_id=([A-Za-z0-9\-_]+)").expect("valid request_id regex"));
static LEVEL_ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"level=ERROR").expect("valid level regex"));
static MSG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"msg="([^"]+)""#).expect("valid msg regex"));

/// Fields pulled out of a single raw log line.
#[derive(Debug, PartialEq, Eq)]
struct ParsedLine<'a> {
    request_id: Option<&'a str>,
    /// Classification text when the line is an error: the quoted message, else the raw line.
    error_text: Option<&'a str>,
}

fn parse_line(line: &str) -> ParsedLine<'_> {
    let request_id = REQUEST_ID_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    let error_text = LEVEL_ERROR_RE.is_match(line).then(|| {
        MSG_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map_or(line, |m| m.as_str())
    });

    ParsedLine {
        request_id,
        error_text,
    }
}

/// Frequency table that remembers first-seen order for tie-breaking.
#[derive(Default)]
struct ErrorCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, usize)>,
}

impl ErrorCounter {
    fn add(&mut self, text: &str) {
        match self.index.get(text) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(text.to_string(), self.counts.len());
                self.counts.push((text.to_string(), 1));
            }
        }
    }

    /// The `n` most frequent texts, count descending, first-seen order on ties.
    fn most_common(mut self, n: usize) -> Vec<ErrorPattern> {
        // stable sort keeps insertion order among equal counts
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts
            .into_iter()
            .take(n)
            .map(|(pattern, count)| ErrorPattern { pattern, count })
            .collect()
    }
}

/// Analyze raw log lines (most-recent-last). Empty input yields an empty finding.
pub fn analyze_logs<S: AsRef<str>>(lines: &[S], top_n: usize) -> LogFinding {
    let mut errors = ErrorCounter::default();
    let mut notable_trace: Option<String> = None;
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut correlated_ids: Vec<String> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        let parsed = parse_line(line);

        if let Some(rid) = parsed.request_id {
            if correlated_ids.len() < MAX_CORRELATED_IDS && seen_ids.insert(rid) {
                correlated_ids.push(rid.to_string());
            }
        }

        if let Some(text) = parsed.error_text {
            errors.add(text);
            if notable_trace.is_none() {
                notable_trace = Some(line.to_string());
            }
        }
    }

    LogFinding {
        top_errors: errors.most_common(top_n),
        notable_trace,
        correlated_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(level: &str, rid: &str, msg: &str) -> String {
        format!(
            r#"2026-01-20T12:00:00Z level={} service=orders-api request_id={} msg="{}""#,
            level, rid, msg
        )
    }

    #[test]
    fn test_empty_input() {
        let finding = analyze_logs::<String>(&[], DEFAULT_TOP_N);
        assert_eq!(finding, LogFinding::default());
    }

    #[test]
    fn test_parse_line_fields() {
        let raw = line("ERROR", "req-1001", "HTTP 500 Internal Server Error");
        let parsed = parse_line(&raw);
        assert_eq!(parsed.request_id, Some("req-1001"));
        assert_eq!(parsed.error_text, Some("HTTP 500 Internal Server Error"));

        let info_line = line("INFO", "req-1002", "GET /health 200");
        let info = parse_line(&info_line);
        assert_eq!(info.error_text, None);
    }

    #[test]
    fn test_error_without_message_uses_raw_line() {
        let raw = "2026-01-20T12:00:00Z level=ERROR panic in worker";
        let finding = analyze_logs(&[raw], DEFAULT_TOP_N);
        assert_eq!(finding.top_errors[0].pattern, raw);
        assert_eq!(finding.notable_trace.as_deref(), Some(raw));
        assert!(finding.correlated_ids.is_empty());
    }

    #[test]
    fn test_top_errors_ranked_with_first_seen_ties() {
        let lines = vec![
            line("ERROR", "r1", "B"),
            line("ERROR", "r2", "A"),
            line("INFO", "r3", "ok"),
            line("ERROR", "r4", "C"),
            line("ERROR", "r5", "C"),
            line("ERROR", "r6", "A"),
            line("ERROR", "r7", "B"),
            line("ERROR", "r8", "C"),
        ];
        let finding = analyze_logs(&lines, 2);
        let got: Vec<(&str, usize)> = finding
            .top_errors
            .iter()
            .map(|e| (e.pattern.as_str(), e.count))
            .collect();
        assert_eq!(got, vec![("C", 3), ("B", 2)]);
        assert_eq!(finding.notable_trace.as_deref(), Some(lines[0].as_str()));
    }

    #[test]
    fn test_counts_are_non_increasing() {
        let lines: Vec<String> = (0..50)
            .map(|i| line("ERROR", &format!("r{}", i), &format!("err-{}", i % 7)))
            .collect();
        let finding = analyze_logs(&lines, DEFAULT_TOP_N);
        assert!(finding.top_errors.len() <= DEFAULT_TOP_N);
        assert!(finding
            .top_errors
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_correlated_ids_deduplicated_and_capped() {
        let mut lines = vec![
            line("INFO", "req-1", "a"),
            line("INFO", "req-1", "a"),
            line("WARN", "req-2", "b"),
        ];
        for i in 3..20 {
            lines.push(line("INFO", &format!("req-{}", i), "c"));
        }
        let finding = analyze_logs(&lines, DEFAULT_TOP_N);
        assert_eq!(finding.correlated_ids.len(), MAX_CORRELATED_IDS);
        assert_eq!(finding.correlated_ids[0], "req-1");
        assert_eq!(finding.correlated_ids[1], "req-2");
        assert_eq!(finding.correlated_ids[9], "req-10");
        let unique: HashSet<&String> = finding.correlated_ids.iter().collect();
        assert_eq!(unique.len(), finding.correlated_ids.len());
        assert!(finding.top_errors.is_empty());
        assert!(finding.notable_trace.is_none());
    }
}
