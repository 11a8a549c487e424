//! Custom assertions for escape reports

use escapegraph_ir::{AllocDecision, EscapeReport, SiteId, VarId};

/// Run the analysis with a sequential custom configuration
pub fn analyze(program: &escapegraph_ir::Program, level: u8) -> EscapeReport {
    let config = escapegraph_ir::EscapeConfig::from_preset(escapegraph_ir::Preset::Custom)
        .diagnostic_level(level);
    escapegraph_ir::EscapeAnalysisService::new(config)
        .unwrap()
        .analyze(program)
        .unwrap()
}

pub fn assert_var_heap(report: &EscapeReport, var: VarId) {
    assert_eq!(
        report.var_decision(var),
        Some(AllocDecision::Heap),
        "expected {:?} on the heap, messages: {:?}",
        var,
        report.messages()
    );
}

pub fn assert_var_stack(report: &EscapeReport, var: VarId) {
    assert_eq!(
        report.var_decision(var),
        Some(AllocDecision::Stack),
        "expected {:?} on the stack, messages: {:?}",
        var,
        report.messages()
    );
}

pub fn assert_alloc(report: &EscapeReport, site: SiteId, expected: AllocDecision) {
    assert_eq!(
        report.alloc_decision(site),
        Some(expected),
        "allocation {:?}, messages: {:?}",
        site,
        report.messages()
    );
}

/// Assert a diagnostic with exactly this text was emitted
pub fn assert_has_message(report: &EscapeReport, message: &str) {
    assert!(
        report.messages().contains(&message),
        "expected message '{message}', got: {:?}",
        report.messages()
    );
}
