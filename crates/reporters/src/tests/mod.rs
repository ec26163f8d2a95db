use crate::{color_severity, fingerprint, render, write_report, Format, Severity, Stats, Warning};
use std::path::Path;

fn sample() -> (Stats, Vec<Warning>) {
    let stats = Stats {
        files: 3,
        classpath_entries: 2,
        compiled: 3,
        had_errors: true,
        duration_ms: 42,
    };
    let warnings = vec![
        Warning::new("UndefinedType", Severity::Error, "src/B.java", 4, 2, "Missing cannot be resolved to a type"),
        Warning::new("UnusedLocal", Severity::Warning, "src/A.java", 9, 13, "The value of x is not used"),
    ];
    (stats, warnings)
}

fn rendered(fmt: Format) -> String {
    let (stats, warnings) = sample();
    let mut buf = Vec::new();
    render(&mut buf, &stats, &warnings, fmt).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn severities_are_colored() {
    assert_eq!(color_severity(Severity::Info), "\x1b[32mINFO\x1b[0m");
    assert_eq!(color_severity(Severity::Warning), "\x1b[33mWARNING\x1b[0m");
    assert_eq!(color_severity(Severity::Error), "\x1b[31mERROR\x1b[0m");
}

#[test]
fn ids_are_stable_fingerprints() {
    let w = Warning::new("UnusedLocal", Severity::Warning, "src/A.java", 9, 13, "msg");
    let expected = blake3::hash(b"UnusedLocal:src/A.java:9:13").to_hex().to_string();
    assert_eq!(w.id, expected);
    assert_eq!(fingerprint("UnusedLocal", Path::new("src/A.java"), 9, 13), expected);
    assert_ne!(w.id, fingerprint("UnusedLocal", Path::new("src/A.java"), 9, 14));
}

#[test]
fn text_keeps_warning_order() {
    let text = rendered(Format::Text);
    assert!(text.contains("Source files              3"));
    assert!(text.contains("Errors                    yes"));
    let b = text.find("src/B.java:4:2 UndefinedType").unwrap();
    let a = text.find("src/A.java:9:13 UnusedLocal").unwrap();
    assert!(b < a);
    assert!(text.contains("Total: 2"));
}

#[test]
fn text_without_warnings() {
    let mut buf = Vec::new();
    render(&mut buf, &Stats::default(), &[], Format::Text).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("No problems reported"));
    assert!(!text.contains("Total:"));
}

#[test]
fn json_carries_stats_and_warnings() {
    let value: serde_json::Value = serde_json::from_str(&rendered(Format::Json)).unwrap();
    assert_eq!(value["total"], 2);
    assert_eq!(value["stats"]["had_errors"], true);
    assert_eq!(value["warnings"][0]["rule_id"], "UndefinedType");
    assert_eq!(value["warnings"][0]["severity"], "ERROR");
    assert_eq!(value["warnings"][1]["line"], 9);
}

#[test]
fn report_files_are_written() {
    let (stats, warnings) = sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.sarif");
    write_report(Some(&path), &stats, &warnings, Format::Sarif).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["runs"][0]["results"].as_array().unwrap().len(), 2);
}

#[test]
fn severity_names_parse() {
    assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
    assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
    assert!("fatal".parse::<Severity>().is_err());
    assert!(Severity::Error > Severity::Warning);
}
