//! Integrity level rewriting exercised through full rule conversion.

mod helpers;

use helpers::convert_ok;

#[test]
fn test_symbolic_equality_becomes_numeric_range() {
    let query = convert_ok(
        r#"
title: High Integrity Shell
logsource:
    product: windows
    category: process_creation
detection:
    selection:
        Image|endswith: '\cmd.exe'
        IntegrityLevel: HIGH
    condition: selection
"#,
    );
    assert!(query.contains(
        "(action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384)"
    ));
    assert!(!query.contains(r#""HIGH""#));
}

#[test]
fn test_symbolic_membership_becomes_range_disjunction() {
    let query = convert_ok(
        r#"
title: Elevated Process
logsource:
    product: windows
    category: process_creation
detection:
    selection:
        IntegrityLevel:
            - LOW
            - HIGH
    condition: selection
"#,
    );
    assert!(query.contains(
        "((action_process_integrity_level gte 4096 and action_process_integrity_level lt 8192) \
         or (action_process_integrity_level gte 12288 and action_process_integrity_level lt 16384))"
    ));
    assert!(!query.contains("action_process_integrity_level in"));
}

#[test]
fn test_open_ended_levels() {
    let query = convert_ok(
        r#"
title: System Process
logsource:
    category: process_creation
detection:
    selection:
        IntegrityLevel: SYSTEM
    condition: selection
"#,
    );
    assert!(query.contains("action_process_integrity_level gte 16384"));
    assert!(!query.contains(" lt "));
}

#[test]
fn test_unknown_symbolic_value_left_in_place() {
    // A membership list mixing known and unknown literals never matches the
    // rewrite pattern, so it reaches the output untouched.
    let query = convert_ok(
        r#"
title: Mixed Levels
logsource:
    category: process_creation
detection:
    selection:
        IntegrityLevel:
            - LOW
            - PROTECTED
    condition: selection
"#,
    );
    assert!(query.contains(r#"action_process_integrity_level in ("LOW", "PROTECTED")"#));
}

#[test]
fn test_lowercase_symbolic_value_rewritten() {
    let query = convert_ok(
        r#"
title: Medium Integrity
logsource:
    category: process_creation
detection:
    selection:
        IntegrityLevel: medium
    condition: selection
"#,
    );
    assert!(query.contains(
        "(action_process_integrity_level gte 8192 and action_process_integrity_level lt 12288)"
    ));
}
