//! `qualitygate rules`: list the rule table.

use qualitygate_rules::RuleTable;

pub fn run() {
    println!("{:<34} {:<9} {:>4}", "RULE", "SEVERITY", "COST");
    for rule in RuleTable::builtin().rules() {
        println!("{:<34} {:<9} {:>4}", rule.name, rule.severity, rule.cost);
    }
}
