//! Packages read from an `ifql_pkgs` directory.
use std::fs;
use std::path::Path;

use ifqlc::{DisplayOptions, Options};
use insta::assert_snapshot;

fn write_package(dir: &Path, path: &str, files: &[(&str, &str)]) {
    let package_dir = dir.join("ifql_pkgs").join(path);
    fs::create_dir_all(&package_dir).unwrap();
    for (name, source) in files {
        fs::write(package_dir.join(name), source).unwrap();
    }
}

fn options(dir: &Path) -> Options {
    Options::default()
        .with_import_dir(dir)
        .with_display(DisplayOptions::Plain)
}

#[test]
fn test_import_package() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "stats",
        &[
            (
                "cpu.ifql",
                "package stats 1.0.0\ncpu = (db) => from(db:db).where(exp:{\"_measurement\" == \"cpu\"})",
            ),
            ("window.ifql", "package stats\nhourly = (t) => t.window(every:1h)"),
        ],
    );

    let spec = ifqlc::compile_with(
        "import \"stats\" \"^1.0\"\nstats.hourly(t: stats.cpu(db:\"telegraf\")).mean()",
        &options(dir.path()),
    )
    .unwrap();

    let ids: Vec<_> = spec.operations.iter().map(|op| op.id.to_string()).collect();
    assert_eq!(ids, vec!["from0", "where1", "window2", "mean3"]);
}

#[test]
fn test_import_alias_and_nested_path() {
    let dir = tempfile::tempdir().unwrap();
    write_package(dir.path(), "util/time", &[("lib.ifql", "package time\nhourAgo = -1h")]);

    let spec = ifqlc::compile_with(
        "import \"util/time\" as t\nfrom(db:\"a\").range(start: t.hourAgo)",
        &options(dir.path()),
    )
    .unwrap();
    assert_snapshot!(
        serde_json::to_string(&spec.operations[1].spec).unwrap(),
        @r#"{"start":"-1h","stop":"now"}"#
    );
}

#[test]
fn test_import_errors() {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "mixed",
        &[("a.ifql", "package a\nx = 1"), ("b.ifql", "package b\ny = 2")],
    );
    write_package(dir.path(), "anonymous", &[("a.ifql", "x = 1")]);

    let error = |source: &str| {
        let errors = ifqlc::compile_with(source, &options(dir.path())).unwrap_err();
        assert_eq!(errors.inner[0].code.as_deref(), Some("E0007"));
        errors.inner[0].reason.clone()
    };

    assert_snapshot!(
        error("import \"mixed\""),
        @r#"failed to import package "mixed": found conflicting package names ["a", "b"] declared in file "b.ifql""#
    );
    assert_snapshot!(
        error("import \"anonymous\""),
        @r#"failed to import package "anonymous": no package name declared in file "a.ifql""#
    );
    assert!(error("import \"missing\"").starts_with(r#"failed to import package "missing": could not find package "missing""#));
}
