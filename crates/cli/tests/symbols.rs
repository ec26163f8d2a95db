use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn sources(dir: &std::path::Path) -> std::io::Result<()> {
    let app = dir.join("app");
    fs::create_dir_all(&app)?;
    fs::write(
        app.join("Base.java"),
        "package app;\npublic class Base {\n    public void run(int times) { }\n}\n",
    )?;
    fs::write(
        app.join("Impl.java"),
        "package app;\npublic class Impl extends Base implements Runnable {\n    static final int LIMIT = 2 * 4;\n    @Override\n    public void run(int times) { }\n    public void run() { }\n    class Inner { }\n}\n",
    )
}

#[test]
fn symbols_describe_hierarchy_and_members() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    sources(tmp.path())?;

    Command::cargo_bin("lintbridge")?
        .env("HOME", tmp.path())
        .args(["symbols", "--quiet", "--class", "app.Impl"])
        .arg(tmp.path().join("app"))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("class app.Impl extends app.Base implements java.lang.Runnable")
                .and(predicate::str::contains("field LIMIT: int = 8"))
                .and(predicate::str::contains("method run(int)"))
                .and(predicate::str::contains("overrides app.Base"))
                .and(predicate::str::contains("@java.lang.Override")),
        );
    Ok(())
}

#[test]
fn symbols_list_member_types_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    sources(tmp.path())?;

    let output = Command::cargo_bin("lintbridge")?
        .env("HOME", tmp.path())
        .args(["symbols", "--quiet", "--json"])
        .arg(tmp.path().join("app"))
        .output()?;
    assert!(output.status.success());
    let classes: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let names: Vec<&str> = classes
        .as_array()
        .ok_or("expected an array")?
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"app.Base"));
    assert!(names.contains(&"app.Impl"));
    assert!(names.contains(&"app.Impl.Inner"));
    Ok(())
}

#[test]
fn unknown_classes_fail() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    sources(tmp.path())?;

    Command::cargo_bin("lintbridge")?
        .env("HOME", tmp.path())
        .args(["symbols", "--quiet", "--class", "app.Nope"])
        .arg(tmp.path().join("app"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("class not found: app.Nope"));
    Ok(())
}
