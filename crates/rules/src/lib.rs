//! Quality rules: a fixed table of lexical detectors for shortcut patterns.
//!
//! The scanner looks at content an agent is about to write (or just wrote)
//! and reports which rules fired. There is no parsing: every rule is a
//! literal substring or a regex over raw text.
//!
//! # Rule table
//!
//! ```text
//! name                              cost  severity
//! as any                               3  critical
//! eslint-disable                       5  critical   (case-insensitive)
//! @ts-ignore                           5  critical
//! @ts-expect-error                     3  warn
//! @ts-nocheck                         10  critical
//! empty catch                          5  critical
//! .toBeTruthy()/.toBeFalsy()           2  warn
//! expect(true/false)                   5  warn
//! test.skip/it.skip/describe.skip      3  warn
//! ```
//!
//! Rules are data: adding one means adding a row to [`RuleTable::builtin`].

mod model;
mod table;

pub use model::{Detector, Finding, Findings, Rule, Severity};
pub use table::{RuleTable, is_source_file, should_skip};
