//! `qualitygate scan`: run the quality rules over files on disk.

use qualitygate_rules::{Findings, RuleTable};
use serde_json::json;

/// Scan every file. Returns `true` when any file has a banned pattern.
pub fn run(files: &[String], json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let table = RuleTable::builtin();
    let mut report = Vec::new();
    let mut critical = false;

    for path in files {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("⚠️  Skipping {path}: {e}");
                continue;
            }
        };
        let findings = table.scan(&content, path);
        critical |= findings.has_critical();
        report.push((path.as_str(), findings));
    }

    if json {
        let entries: Vec<_> = report
            .iter()
            .map(|(path, findings)| json!({ "file": path, "findings": findings }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_report(&report);
    }

    Ok(critical)
}

fn print_report(report: &[(&str, Findings)]) {
    let mut dirty = 0;
    for (path, findings) in report {
        if findings.is_empty() {
            continue;
        }
        dirty += 1;
        println!("{path}");
        for f in findings {
            let marker = if f.is_critical() { "❌" } else { "⚠️ " };
            println!("   {marker} {} ({}, -{})", f.rule, f.severity, f.cost);
        }
    }

    if dirty == 0 {
        println!("✅ {} file(s) clean", report.len());
    } else {
        println!("\n{dirty} of {} file(s) with findings", report.len());
    }
}
