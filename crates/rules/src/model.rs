//! Rule data model: rules, severities and the findings a scan produces.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad a match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks the write up front and is re-audited when the session stops.
    Critical,
    /// Costs points, nothing more.
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::Warn => "warn",
        };
        f.pad(name)
    }
}

/// The lexical test behind a rule.
#[derive(Debug, Clone)]
pub enum Detector {
    /// Case-sensitive substring.
    Literal(&'static str),
    /// Regular expression; flags such as `(?i)` live in the pattern.
    Pattern(Regex),
}

impl Detector {
    pub fn is_match(&self, content: &str) -> bool {
        match self {
            Detector::Literal(needle) => content.contains(needle),
            Detector::Pattern(re) => re.is_match(content),
        }
    }
}

/// A single quality rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub cost: u32,
    pub severity: Severity,
    pub detector: Detector,
}

impl Rule {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn finding(&self) -> Finding {
        Finding {
            rule: self.name.to_string(),
            cost: self.cost,
            severity: self.severity,
        }
    }
}

/// One rule match in one content blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub cost: u32,
    pub severity: Severity,
}

impl Finding {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// The result of one scan: at most one finding per rule name.
///
/// Treat it as a set. Iteration order follows the table but nothing should
/// rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Findings(Vec<Finding>);

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding unless one for the same rule is already present.
    pub fn insert(&mut self, finding: Finding) -> bool {
        if self.contains(&finding.rule) {
            return false;
        }
        self.0.push(finding);
        true
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.0.iter().any(|f| f.rule == rule)
    }

    pub fn get(&self, rule: &str) -> Option<&Finding> {
        self.0.iter().find(|f| f.rule == rule)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.0.iter()
    }

    /// Total cost of every finding.
    pub fn sum_cost(&self) -> u32 {
        self.0.iter().map(|f| f.cost).sum()
    }

    pub fn has_critical(&self) -> bool {
        self.0.iter().any(Finding::is_critical)
    }

    pub fn critical(&self) -> impl Iterator<Item = &Finding> {
        self.0.iter().filter(|f| f.is_critical())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.0.iter().filter(|f| !f.is_critical())
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.rule.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Findings {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Finding> for Findings {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        let mut findings = Findings::new();
        for f in iter {
            findings.insert(f);
        }
        findings
    }
}
