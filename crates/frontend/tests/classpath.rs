use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use frontend::{
    Compiler, CompilerOptions, LookupEnvironment, NameEnvironment, ProblemId, ResultCollector,
    SourceUnit, StandardProcessor, UnitResult,
};
use tempfile::tempdir;

fn write_jar(path: &Path, entries: &[&str]) -> anyhow::Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(path)?);
    for entry in entries {
        zip.start_file(*entry, zip::write::FileOptions::default())?;
        zip.write_all(b"\xca\xfe\xba\xbe")?;
    }
    zip.finish()?;
    Ok(())
}

fn compile(
    classpath: &[PathBuf],
    sources: &[(&str, &str)],
) -> anyhow::Result<(Vec<UnitResult>, LookupEnvironment)> {
    let units: Vec<SourceUnit> = sources
        .iter()
        .map(|(path, text)| SourceUnit::new(*path, *text))
        .collect();
    let mut compiler = Compiler::new(CompilerOptions::default(), NameEnvironment::new(classpath));
    let mut collector = ResultCollector::default();
    compiler.compile(&units, &mut StandardProcessor, &mut collector)?;
    let (_, env) = compiler.into_environments();
    Ok((collector.results, env))
}

fn ids(result: &UnitResult) -> Vec<ProblemId> {
    result.problems.iter().map(|p| p.id).collect()
}

#[test]
fn imports_resolve_against_jars() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("lib.jar");
    write_jar(&jar, &["lib/Base.class", "lib/Base$Nested.class"])?;

    let (results, env) = compile(
        &[jar],
        &[(
            "p/A.java",
            "package p; import lib.Base; class A extends Base { void go() { inherited(); } }",
        )],
    )?;
    assert!(
        !ids(&results[0]).contains(&ProblemId::UNDEFINED_TYPE),
        "{:?}",
        results[0].problems
    );
    let base = env.get_type("lib.Base").unwrap();
    assert!(env.type_binding(base).unwrap().is_binary());
    // Members of binary types are unknown, so calls into them stay quiet.
    assert!(!ids(&results[0]).contains(&ProblemId::UNDEFINED_METHOD));
    Ok(())
}

#[test]
fn class_folders_and_missing_entries() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let classes = dir.path().join("classes");
    fs::create_dir_all(classes.join("dep"))?;
    fs::write(classes.join("dep/Helper.class"), b"\xca\xfe\xba\xbe")?;
    let missing = dir.path().join("nowhere.jar");

    let (results, env) = compile(
        &[missing, classes],
        &[(
            "A.java",
            "import dep.Helper; import dep.Absent; class A { Helper h; Absent a; }",
        )],
    )?;
    assert!(env.get_type("dep.Helper").is_some());
    assert!(env.get_type("dep.Absent").is_none());
    assert!(ids(&results[0]).contains(&ProblemId::UNDEFINED_TYPE));
    Ok(())
}

#[test]
fn sources_shadow_the_classpath() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("lib.jar");
    write_jar(&jar, &["p/Shared.class"])?;

    let (results, env) = compile(
        &[jar],
        &[
            ("p/Shared.java", "package p; public class Shared { public void own() {} }"),
            ("p/User.java", "package p; class User { void go(Shared s) { s.own(); } }"),
        ],
    )?;
    assert!(results.iter().all(|r| r.problems.is_empty()));
    let shared = env.get_type("p.Shared").unwrap();
    assert!(!env.type_binding(shared).unwrap().is_binary());
    Ok(())
}

#[test]
fn released_names_answer_nothing() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let jar = dir.path().join("lib.jar");
    write_jar(&jar, &["lib/Base.class"])?;
    let mut names = NameEnvironment::new(&[jar]);
    assert!(names.find_type("lib.Base").is_some());
    names.cleanup();
    names.cleanup();
    assert!(names.is_released());
    assert!(names.find_type("lib.Base").is_none());
    assert!(!names.is_package("lib"));
    Ok(())
}
