//! The built-in rule table and the scanner that applies it.

use crate::model::{Detector, Findings, Rule, Severity};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Suffixes of files the scanner looks at.
const SOURCE_SUFFIXES: &[&str] = &[".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs"];

/// Path fragments that exempt a file: typings, test scaffolding, lint config.
const EXCEPTION_MARKERS: &[&str] = &[
    ".d.ts",
    "setup",
    "helper",
    "mock",
    "fixture",
    "eslint.config",
    ".eslintrc",
];

static BUILTIN: LazyLock<RuleTable> = LazyLock::new(|| {
    let pattern = |re: &str| Detector::Pattern(Regex::new(re).expect("built-in rule pattern"));
    RuleTable::new(vec![
        Rule {
            name: "as any",
            cost: 3,
            severity: Severity::Critical,
            detector: Detector::Literal("as any"),
        },
        Rule {
            name: "eslint-disable",
            cost: 5,
            severity: Severity::Critical,
            detector: pattern(r"(?i)eslint-disable"),
        },
        Rule {
            name: "@ts-ignore",
            cost: 5,
            severity: Severity::Critical,
            detector: Detector::Literal("@ts-ignore"),
        },
        Rule {
            name: "@ts-expect-error",
            cost: 3,
            severity: Severity::Warn,
            detector: Detector::Literal("@ts-expect-error"),
        },
        Rule {
            name: "@ts-nocheck",
            cost: 10,
            severity: Severity::Critical,
            detector: Detector::Literal("@ts-nocheck"),
        },
        Rule {
            name: "empty catch",
            cost: 5,
            severity: Severity::Critical,
            detector: pattern(r"catch\s*(\([^)]*\))?\s*\{\s*\}"),
        },
        Rule {
            name: ".toBeTruthy()/.toBeFalsy()",
            cost: 2,
            severity: Severity::Warn,
            detector: pattern(r"\.toBe(Truthy|Falsy)\(\s*\)"),
        },
        Rule {
            name: "expect(true/false)",
            cost: 5,
            severity: Severity::Warn,
            detector: pattern(r"expect\(\s*(true|false)\s*\)"),
        },
        Rule {
            name: "test.skip/it.skip/describe.skip",
            cost: 3,
            severity: Severity::Warn,
            detector: pattern(r"\b(test|it|describe)\.skip\b"),
        },
    ])
});

/// Whether the path has one of the scanned source suffixes.
pub fn is_source_file(path: &str) -> bool {
    SOURCE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// True when the scanner must ignore this path: not a source file, or a
/// typings/scaffolding/lint-config file.
pub fn should_skip(path: &str) -> bool {
    if !is_source_file(path) {
        return true;
    }
    let lower = path.to_lowercase();
    EXCEPTION_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// An immutable set of rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The shared nine-rule table.
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Evaluate every rule against `content` written to `path`.
    ///
    /// Skipped paths and empty content yield no findings. Each rule fires at
    /// most once however often its pattern recurs.
    pub fn scan(&self, content: &str, path: &str) -> Findings {
        if content.is_empty() || should_skip(path) {
            return Findings::new();
        }
        let findings = self.matching(content, |_| true);
        if !findings.is_empty() {
            debug!(path, rules = ?findings.names(), "Scan matched");
        }
        findings
    }

    /// Evaluate only the critical rules, with no path filter.
    pub fn scan_critical(&self, content: &str) -> Findings {
        if content.is_empty() {
            return Findings::new();
        }
        self.matching(content, Rule::is_critical)
    }

    fn matching(&self, content: &str, include: impl Fn(&Rule) -> bool) -> Findings {
        self.rules
            .iter()
            .filter(|&rule| include(rule) && rule.detector.is_match(content))
            .map(Rule::finding)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str, path: &str) -> Findings {
        RuleTable::builtin().scan(content, path)
    }

    #[test]
    fn builtin_has_nine_rules() {
        let table = RuleTable::builtin();
        assert_eq!(table.rules().len(), 9);
        assert_eq!(table.rules().iter().filter(|r| r.is_critical()).count(), 5);
    }

    #[test]
    fn as_any_is_critical_in_ts() {
        let findings = scan("const x = y as any;", "src/app.ts");
        let f = findings.get("as any").unwrap();
        assert_eq!(f.cost, 3);
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn repeated_pattern_counts_once() {
        let content = "a as any; b as any;\n// @ts-nocheck\n";
        let findings = scan(content, "a.ts");
        assert_eq!(findings.len(), 2);
        assert!(findings.contains("as any"));
        assert!(findings.contains("@ts-nocheck"));
        assert_eq!(findings.sum_cost(), 13);
    }

    #[test]
    fn eslint_disable_is_case_insensitive() {
        assert!(scan("/* ESLint-Disable */", "a.js").contains("eslint-disable"));
        assert!(scan("// eslint-disable-next-line", "a.tsx").contains("eslint-disable"));
    }

    #[test]
    fn ts_ignore_is_case_sensitive() {
        assert!(scan("// @ts-ignore", "a.ts").contains("@ts-ignore"));
        assert!(scan("// @TS-IGNORE", "a.ts").is_empty());
    }

    #[test]
    fn empty_catch_variants() {
        assert!(scan("try { x() } catch (e) {}", "a.ts").contains("empty catch"));
        assert!(scan("try { x() } catch (err) {\n    \n}", "a.ts").contains("empty catch"));
        assert!(scan("try { x() } catch {}", "a.ts").contains("empty catch"));
        assert!(!scan("try { x() } catch (e) { log(e) }", "a.ts").contains("empty catch"));
    }

    #[test]
    fn soft_test_smells() {
        let content = "expect(value).toBeTruthy();\nexpect(true).toBe(true);\nit.skip('later', () => {});";
        let findings = scan(content, "widget.test.ts");
        assert!(findings.contains(".toBeTruthy()/.toBeFalsy()"));
        assert!(findings.contains("expect(true/false)"));
        assert!(findings.contains("test.skip/it.skip/describe.skip"));
        assert!(!findings.has_critical());
        assert_eq!(findings.sum_cost(), 2 + 5 + 3);
    }

    #[test]
    fn skip_does_not_match_inside_identifiers() {
        assert!(scan("submit.skip = true", "a.ts").is_empty());
        assert!(scan("describe.skip('x', fn)", "a.ts").contains("test.skip/it.skip/describe.skip"));
    }

    #[test]
    fn ts_expect_error_is_warn() {
        let findings = scan("// @ts-expect-error", "a.ts");
        assert_eq!(findings.get("@ts-expect-error").unwrap().severity, Severity::Warn);
    }

    #[test]
    fn typings_and_mocks_are_skipped() {
        let content = "x as any // @ts-nocheck";
        assert!(scan(content, "types/global.d.ts").is_empty());
        assert!(scan(content, "src/__mocks__/api.ts").is_empty());
        assert!(scan(content, "test/setupTests.ts").is_empty());
        assert!(scan(content, "test/helpers/render.tsx").is_empty());
        assert!(scan(content, "test/fixtures/data.js").is_empty());
        assert!(scan(content, "eslint.config.mjs").is_empty());
        assert!(scan(content, "src/MockServer.ts").is_empty());
    }

    #[test]
    fn non_source_files_are_skipped() {
        assert!(should_skip("README.md"));
        assert!(should_skip("src/main.rs"));
        assert!(should_skip(""));
        assert!(!should_skip("src/index.ts"));
        assert!(!should_skip("lib/util.cjs"));
    }

    #[test]
    fn empty_content_yields_nothing() {
        assert!(scan("", "a.ts").is_empty());
        assert!(RuleTable::builtin().scan_critical("").is_empty());
    }

    #[test]
    fn scan_critical_ignores_warn_rules() {
        let content = "x as any; expect(true); it.skip('a')";
        let findings = RuleTable::builtin().scan_critical(content);
        assert_eq!(findings.names(), vec!["as any"]);
    }

    #[test]
    fn scan_critical_has_no_path_filter() {
        let table = RuleTable::builtin();
        assert!(table.scan("@ts-ignore", "notes.txt").is_empty());
        assert!(table.scan_critical("@ts-ignore").contains("@ts-ignore"));
    }

    #[test]
    fn custom_table_is_additive() {
        let mut rules = RuleTable::builtin().rules().to_vec();
        rules.push(Rule {
            name: "debugger",
            cost: 1,
            severity: Severity::Warn,
            detector: Detector::Literal("debugger;"),
        });
        let table = RuleTable::new(rules);
        let findings = table.scan("debugger; x as any", "a.ts");
        assert_eq!(findings.sum_cost(), 4);
    }
}
