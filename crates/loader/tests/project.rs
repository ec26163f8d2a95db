use std::fs;

use loader::{assemble, java_sources, read_source, Encoding, ProjectMetadata};
use tempfile::tempdir;

#[test]
fn json_metadata_drives_classpath_and_sources() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("src/app"))?;
    fs::create_dir_all(root.join("build/classes"))?;
    fs::create_dir_all(root.join("lib"))?;
    fs::write(root.join("lib/rt.jar"), b"")?;
    fs::write(root.join("lib/guava.jar"), b"")?;
    fs::write(root.join("src/app/Main.java"), b"class Main {}")?;
    fs::write(
        root.join("project.json"),
        r#"{
            "name": "app",
            "encoding": "ISO-8859-1",
            "platform_jar": "lib/rt.jar",
            "source_folders": ["src"],
            "generated_folders": ["build/generated"],
            "class_folders": ["build/classes"],
            "libraries": ["lib/guava.jar", "lib/absent.jar"],
            "dependencies": [{ "name": "core", "libraries": ["lib/guava.jar"] }]
        }"#,
    )?;

    let meta = ProjectMetadata::load(&root.join("project.json"))?;
    assert_eq!(
        assemble(&meta),
        vec![
            root.join("lib/rt.jar"),
            root.join("build/classes"),
            root.join("lib/guava.jar"),
        ]
    );

    let sources = java_sources(&meta.source_roots())?;
    assert_eq!(sources, vec![root.join("src/app/Main.java")]);

    let encoding: Encoding = meta
        .encoding
        .as_deref()
        .unwrap_or("UTF-8")
        .parse()
        .map_err(anyhow::Error::msg)?;
    assert_eq!(encoding, Encoding::Latin1);
    assert_eq!(read_source(&sources[0], encoding)?, "class Main {}");
    Ok(())
}

#[test]
fn invalid_metadata_reports_the_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("project.yaml");
    fs::write(&path, "libraries: 12\n")?;
    let err = ProjectMetadata::load(&path).unwrap_err();
    assert!(err.downcast_ref::<serde_yaml::Error>().is_some());
    assert!(format!("{err:#}").contains("project.yaml"));
    Ok(())
}
