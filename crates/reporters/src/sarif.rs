//! Conversion of warnings to SARIF 2.1.0.

use crate::{Severity, Warning};
use serde_sarif::sarif;

pub fn to_sarif(warnings: &[Warning]) -> sarif::Sarif {
    let results: Vec<sarif::Result> = warnings
        .iter()
        .map(|w| {
            let location = sarif::Location::builder()
                .physical_location(
                    sarif::PhysicalLocation::builder()
                        .artifact_location(
                            sarif::ArtifactLocation::builder()
                                .uri(w.file.display().to_string())
                                .build(),
                        )
                        .region(
                            sarif::Region::builder()
                                .start_line(w.line as i64)
                                .start_column(w.column as i64)
                                .build(),
                        )
                        .build(),
                )
                .build();

            let level = match w.severity {
                Severity::Info => sarif::ResultLevel::Note,
                Severity::Warning => sarif::ResultLevel::Warning,
                Severity::Error => sarif::ResultLevel::Error,
            };

            sarif::Result::builder()
                .rule_id(w.rule_id.clone())
                .message(sarif::Message::builder().text(w.message.clone()).build())
                .level(level)
                .locations(vec![location])
                .build()
        })
        .collect();

    sarif::Sarif::builder()
        .version(serde_json::json!("2.1.0"))
        .schema(sarif::SCHEMA_URL.to_string())
        .runs(vec![sarif::Run::builder()
            .tool(
                sarif::Tool::builder()
                    .driver(sarif::ToolComponent::builder().name("lintbridge").build())
                    .build(),
            )
            .results(results)
            .build()])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_carry_level_and_location() {
        let warnings = vec![
            Warning::new("UndefinedMethod", Severity::Error, "src/A.java", 10, 5, "f() is undefined"),
            Warning::new("UnusedLocal", Severity::Warning, "src/B.java", 3, 9, "x is never read"),
        ];
        let value = serde_json::to_value(to_sarif(&warnings)).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["name"], "lintbridge");
        let results = run["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "UndefinedMethod");
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["level"], "warning");
        let region = &results[0]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 10);
        assert_eq!(region["startColumn"], 5);
    }
}
