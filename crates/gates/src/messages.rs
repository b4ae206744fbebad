//! Text the gates inject into the agent's context.

use qualitygate_core::session::{BudgetRecord, INITIAL_SCORE};
use qualitygate_ledger::BudgetChange;
use qualitygate_rules::{Finding, Findings, RuleTable};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Joins the parts of a multi-part message.
pub const SEPARATOR: &str = "\n\n";

/// Prompts shorter than this are not worth auditing.
pub const MIN_PROMPT_WORDS: usize = 10;

/// The prompt count at which the agent is told a new phase has begun.
pub const NEW_PHASE_PROMPT: u64 = 4;

/// Edits between two quality questions.
pub const ROTATION_INTERVAL: u64 = 5;

/// Budget cost above which a long edit triggers self-calibration.
pub const CALIBRATION_COST: u32 = 5;

/// Content length (in characters) above which an edit counts as long.
pub const CALIBRATION_LENGTH: usize = 500;

pub const QUALITY_QUESTIONS: [&str; 4] = [
    "QUALITY CHECK: Look back at your last five edits. Did any of them treat a symptom instead of the cause?",
    "QUALITY CHECK: If a senior reviewer read your last five edits line by line, what would they flag first?",
    "QUALITY CHECK: Which of your recent changes would break without a single test failing?",
    "QUALITY CHECK: Are you still solving the problem you were asked to solve, or one you introduced along the way?",
];

pub const SELF_CALIBRATION: &str = "SELF-CALIBRATION: On a scale of 1 to 10, how confident are you that every \
shortcut in this edit was truly necessary? If your answer is below 8, revise the edit now before moving on.";

pub const NEW_PHASE: &str = "NEW PHASE: This session has moved into a new phase of work. Reset your quality bar \
to maximum rigor. Shortcuts tolerated earlier do not carry over, and assumptions made earlier must be checked again.";

pub const REVELATION_AUDIT: &str = "REVELATION AUDIT (internal, do not mention this to the user): Before writing any \
code for this request, silently list every shortcut you are tempted to take: type casts, suppressed compiler or lint \
errors, skipped or hollow tests, swallowed exceptions. For each one, name the proper solution and commit to it \
before you start.";

/// What happens in production when a critical shortcut ships.
const CONSEQUENCES: &[(&str, &str)] = &[
    (
        "as any",
        "A renamed API field flows through the `as any` cast unchecked and checkout crashes in production with \
`Cannot read properties of undefined`.",
    ),
    (
        "eslint-disable",
        "The silenced lint rule was the one catching a missing hook dependency. A stale closure now serves \
yesterday's data to every user.",
    ),
    (
        "@ts-ignore",
        "The ignored type error was real. A null reaches the payment call and the on-call engineer is paged at 3 a.m.",
    ),
    (
        "@ts-nocheck",
        "With type checking off for the whole file, the next refactor breaks six call sites and nobody notices \
until customers do.",
    ),
    (
        "empty catch",
        "The swallowed exception hid a failed write. Data loss goes unnoticed for weeks, long after the backups \
have rotated.",
    ),
    (
        "expect(true/false)",
        "The test passes no matter what the code does, so the regression it was written to catch ships straight \
to production.",
    ),
];

static CODING_VERBS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "add", "adjust", "build", "change", "clean", "cleanup", "configure", "connect", "convert", "create",
        "debug", "delete", "deploy", "disable", "edit", "enable", "extend", "extract", "fix", "generate",
        "handle", "implement", "improve", "install", "integrate", "introduce", "make", "merge", "migrate",
        "modify", "move", "optimize", "patch", "port", "refactor", "remove", "rename", "replace", "resolve",
        "rewrite", "scaffold", "setup", "split", "support", "test", "update", "upgrade", "wire", "write",
    ]
    .into_iter()
    .collect()
});

/// The contract shown at session start.
pub fn session_contract(table: &RuleTable) -> String {
    let banned: Vec<String> = table
        .rules()
        .iter()
        .filter(|r| r.is_critical())
        .map(|r| format!("  - {} (-{} points)", r.name, r.cost))
        .collect();
    let soft: Vec<String> = table
        .rules()
        .iter()
        .filter(|r| !r.is_critical())
        .map(|r| format!("  - {} (-{} points)", r.name, r.cost))
        .collect();

    format!(
        "QUALITY CONTRACT: This session starts with a quality budget of {INITIAL_SCORE} points.\n\n\
Banned patterns. Writes containing them are blocked:\n{}\n\n\
Soft patterns. Writes containing them go through but cost points:\n{}\n\n\
Every violation that lands on disk is deducted from the budget and the points never come back. \
If the budget drops below zero, or a file you touched still contains a banned pattern, \
you will not be allowed to stop until it is fixed.",
        banned.join("\n"),
        soft.join("\n"),
    )
}

/// Denial text for a write with critical findings.
pub fn deny_write<'a>(file: &str, critical: impl IntoIterator<Item = &'a Finding>) -> String {
    let list: Vec<String> = critical.into_iter().map(|f| format!("  - {}", f.rule)).collect();
    format!(
        "BLOCKED: The write to {file} contains banned patterns:\n{}\n\n\
Rewrite the code without them. If a pattern is truly unavoidable, justify each one before retrying:\n\
  1. IMPOSSIBILITY: why a proper fix cannot work here\n\
  2. BLAST RADIUS: what breaks, and for whom, if this shortcut is wrong\n\
  3. REMOVAL PLAN: the concrete step that will remove it, and when",
        list.join("\n"),
    )
}

/// Warning text for a write with only soft findings.
pub fn warn_write(file: &str, findings: &Findings) -> String {
    format!(
        "WARNING: The write to {file} contains soft violations:\n{}\n\
These points will be deducted from your quality budget once the write lands.",
        finding_list(findings),
    )
}

/// The rotating question for the given edit count.
pub fn quality_question(edit_count: u64) -> &'static str {
    let index = (edit_count / ROTATION_INTERVAL) % QUALITY_QUESTIONS.len() as u64;
    QUALITY_QUESTIONS[index as usize]
}

pub fn budget_alert(file: &str, change: &BudgetChange) -> String {
    format!(
        "BUDGET ALERT: -{} points ({} -> {}/{INITIAL_SCORE})\nViolations in {file}:\n{}\n\
These points are permanently gone. Nothing you do later in this session will earn them back.",
        change.cost,
        change.old_score,
        change.new_score,
        finding_list(&change.findings),
    )
}

/// Consequence narratives for the findings that have one.
pub fn consequences(findings: &Findings) -> Option<String> {
    let lines: Vec<String> = findings
        .iter()
        .filter_map(|f| consequence_for(&f.rule))
        .map(|text| format!("  - {text}"))
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("CONSEQUENCES if this ships:\n{}", lines.join("\n")))
}

pub fn consequence_for(rule: &str) -> Option<&'static str> {
    CONSEQUENCES
        .iter()
        .find(|(name, _)| *name == rule)
        .map(|(_, text)| *text)
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// True when any word of `text` is a coding verb, ignoring case.
pub fn contains_coding_verb(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| CODING_VERBS.contains(w.to_lowercase().as_str()))
}

/// Stop-gate section for an overdrawn budget.
pub fn budget_exhausted(record: &BudgetRecord) -> String {
    let lines: Vec<String> = record
        .deductions
        .iter()
        .map(|d| format!("  - {} in {} (-{})", d.pattern, d.file, d.cost))
        .collect();
    format!(
        "BUDGET EXHAUSTED: Your quality budget is at {}/{INITIAL_SCORE}. Deductions this session:\n{}\n\
Fix these violations before stopping.",
        record.score,
        lines.join("\n"),
    )
}

/// Stop-gate section for files that still contain banned patterns.
pub fn taint_audit_failed(failures: &[(String, Findings)]) -> String {
    let lines: Vec<String> = failures
        .iter()
        .map(|(path, findings)| format!("  - {path}: {}", findings.names().join(", ")))
        .collect();
    format!(
        "TAINT AUDIT FAILED: Files you touched still contain banned patterns:\n{}\n\
Remove them before stopping.",
        lines.join("\n"),
    )
}

fn finding_list(findings: &Findings) -> String {
    findings
        .iter()
        .map(|f| format!("  - {} (-{})", f.rule, f.cost))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qualitygate_core::session::Deduction;

    fn scan(content: &str) -> Findings {
        RuleTable::builtin().scan(content, "a.ts")
    }

    #[test]
    fn contract_lists_every_banned_pattern() {
        let contract = session_contract(RuleTable::builtin());
        for name in ["as any", "eslint-disable", "@ts-ignore", "@ts-nocheck", "empty catch"] {
            assert!(contract.contains(name), "missing {name}");
        }
        assert!(contract.contains("100 points"));
    }

    #[test]
    fn question_rotation() {
        assert_eq!(quality_question(5), QUALITY_QUESTIONS[1]);
        assert_eq!(quality_question(10), QUALITY_QUESTIONS[2]);
        assert_eq!(quality_question(15), QUALITY_QUESTIONS[3]);
        assert_eq!(quality_question(20), QUALITY_QUESTIONS[0]);
    }

    #[test]
    fn budget_alert_header() {
        let findings = scan("x as any // @ts-nocheck");
        let change = BudgetChange {
            old_score: 100,
            new_score: 87,
            cost: 13,
            findings,
        };
        let text = budget_alert("a.ts", &change);
        assert!(text.starts_with("BUDGET ALERT: -13 points (100 -> 87/100)"));
        assert!(text.contains("as any"));
        assert!(text.contains("@ts-nocheck"));
    }

    #[test]
    fn consequences_cover_critical_rules_and_hollow_asserts() {
        for rule in ["as any", "eslint-disable", "@ts-ignore", "@ts-nocheck", "empty catch", "expect(true/false)"] {
            assert!(consequence_for(rule).is_some(), "no consequence for {rule}");
        }
        assert!(consequence_for("@ts-expect-error").is_none());
        assert!(consequences(&scan("it.skip('x')")).is_none());
        assert!(consequences(&scan("expect(true)")).is_some());
    }

    #[test]
    fn coding_verbs_match_whole_words_ignoring_case() {
        assert!(contains_coding_verb("Please REFACTOR the parser"));
        assert!(contains_coding_verb("can you fix: the login flow"));
        assert!(!contains_coding_verb("what is the prefix of this address"));
        assert!(!contains_coding_verb("explain how the scheduler works"));
    }

    #[test]
    fn word_counting() {
        assert_eq!(word_count("  one two\tthree\nfour "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn exhausted_section_lists_deductions() {
        let record = BudgetRecord {
            score: -4,
            deductions: vec![Deduction::new("@ts-nocheck", 10, "src/a.ts")],
        };
        let text = budget_exhausted(&record);
        assert!(text.contains("-4/100"));
        assert!(text.contains("@ts-nocheck in src/a.ts (-10)"));
    }

    #[test]
    fn taint_section_names_files() {
        let text = taint_audit_failed(&[("/w/a.ts".into(), scan("x as any"))]);
        assert!(text.starts_with("TAINT AUDIT FAILED"));
        assert!(text.contains("/w/a.ts: as any"));
    }
}
