//! Post-hoc safety audit of an assembled report.
//!
//! The whole report body is serialized to JSON and scanned for denylisted
//! keywords. This runs after every other stage, so it decides whether a
//! report is released or redacted; it does not stop content from being
//! generated in the first place.

use serde::Serialize;

use super::{ReportBody, SafetyVerdict};

pub const DEFAULT_DENYLIST: &[&str] = &[
    "rm -rf",
    "drop database",
    "delete",
    "format disk",
    "shutdown",
    "exfiltrate",
    "steal",
    "kill -9",
    "wipe",
];

pub const POLICY_NOTE: &str = "Policy: read-only; no destructive or automated execution is allowed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyPolicy {
    denylist: Vec<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            denylist: DEFAULT_DENYLIST.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SafetyPolicy {
    /// Default denylist plus `extra` keywords. Defaults can't be removed.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for kw in extra {
            let kw = kw.as_ref().trim().to_lowercase();
            if !kw.is_empty() && !policy.denylist.contains(&kw) {
                policy.denylist.push(kw);
            }
        }
        policy
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    /// Denylisted keywords found in `text`, case-insensitively, in denylist order.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let haystack = text.to_lowercase();
        self.denylist
            .iter()
            .filter(|kw| haystack.contains(kw.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Scan any serializable value and produce a verdict.
    pub fn check<T: Serialize>(&self, value: &T) -> SafetyVerdict {
        let mut notes = Vec::new();
        let blocked = match serde_json::to_string(value) {
            Ok(blob) => {
                let hits = self.matches(&blob);
                notes.extend(
                    hits.iter()
                        .map(|kw| format!("Blocked unsafe content keyword detected: '{}'", kw)),
                );
                !hits.is_empty()
            }
            Err(e) => {
                // a report we cannot inspect is not released
                notes.push(format!("Blocked: report could not be serialized for inspection ({})", e));
                true
            }
        };

        notes.push(POLICY_NOTE.to_string());
        SafetyVerdict { blocked, notes }
    }

    pub fn check_report(&self, body: &ReportBody) -> SafetyVerdict {
        self.check(body)
    }
}
