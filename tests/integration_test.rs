use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const SETTINGS: &str = r#"{
    "alwaysShowOnStartup": true,
    "requiredPackages": [
        {"name": "Newtonsoft Json", "kind": "registry", "packageId": "com.unity.nuget.newtonsoft-json", "version": "3.2.1"},
        {"kind": "scoped_registry", "packageId": "com.foo.tools", "version": "1.0.0",
         "registry": {"name": "Foo", "url": "https://foo.reg", "scopes": ["com.foo"]}},
        {"kind": "registry", "packageId": "com.declared.only", "declarationOnly": true}
    ],
    "features": [
        {"label": "Internet", "kind": "toggle", "defines": ["CODESKETCH_INTERNET"]},
        {"label": "Ads", "kind": "options", "defaultIndex": 0, "options": [
            {"label": "None"},
            {"label": "AdMob", "define": "ADS_ADMOB",
             "packages": [{"kind": "registry", "packageId": "com.google.ads.mobile", "version": "9.2.0"}]}
        ]}
    ]
}"#;

fn project(manifest: &str) -> TempDir {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Packages")).unwrap();
    std::fs::write(dir.path().join("Packages/manifest.json"), manifest).unwrap();
    std::fs::create_dir_all(dir.path().join("Installer")).unwrap();
    std::fs::write(dir.path().join("Installer/settings.json"), SETTINGS).unwrap();
    dir
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn provisor(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("provisor"));
    cmd.arg("--project").arg(dir.path()).env_remove("PROVISOR_SETTINGS");
    cmd
}

#[test]
fn test_end_to_end_install_required() {
    let dir = project(
        r#"{
  "dependencies": {
    "com.unity.ugui": "2.0.0"
  },
  "scopedRegistries": [
    {"name": "Legacy", "url": "https://legacy.reg", "scopes": ["com.foo", "com.legacy"]}
  ],
  "testables": ["com.unity.ugui"]
}"#,
    );

    provisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ ] Newtonsoft Json (com.unity.nuget.newtonsoft-json)"))
        .stdout(predicate::str::contains("install-required"));

    provisor(&dir)
        .arg("install-required")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed com.foo.tools"));

    let manifest = read_json(&dir.path().join("Packages/manifest.json"));
    assert_eq!(manifest["dependencies"]["com.unity.ugui"], "2.0.0");
    assert_eq!(manifest["dependencies"]["com.unity.nuget.newtonsoft-json"], "3.2.1");
    assert_eq!(manifest["dependencies"]["com.foo.tools"], "1.0.0");
    assert_eq!(manifest["dependencies"]["com.declared.only"], "latest");
    assert_eq!(manifest["testables"][0], "com.unity.ugui");
    assert_eq!(manifest["scopedRegistries"][0]["scopes"], serde_json::json!(["com.legacy"]));
    assert_eq!(manifest["scopedRegistries"][1]["url"], "https://foo.reg");
    assert_eq!(manifest["scopedRegistries"][1]["scopes"], serde_json::json!(["com.foo"]));

    provisor(&dir)
        .arg("install-required")
        .assert()
        .success()
        .stdout(predicate::str::contains("All required packages are installed."));
}

#[test]
fn test_end_to_end_features() {
    let dir = project(r#"{"dependencies": {}}"#);

    provisor(&dir)
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("Internet: off"))
        .stdout(predicate::str::contains("[x] 0 None"));

    provisor(&dir).args(["feature", "Internet", "on"]).assert().success();
    provisor(&dir).args(["feature", "ads", "AdMob"]).assert().success();

    let defines = read_json(&dir.path().join("ProjectSettings/ScriptingDefines.json"));
    assert_eq!(
        defines["targets"]["Android"],
        serde_json::json!(["CODESKETCH_INTERNET", "ADS_ADMOB"])
    );
    let manifest = read_json(&dir.path().join("Packages/manifest.json"));
    assert_eq!(manifest["dependencies"]["com.google.ads.mobile"], "9.2.0");

    provisor(&dir)
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("Internet: on"))
        .stdout(predicate::str::contains("[x] 1 AdMob"));

    provisor(&dir)
        .args(["feature", "Ads", "AdMob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already"));
}

#[test]
fn test_unknown_feature_fails() {
    let dir = project(r#"{"dependencies": {}}"#);

    provisor(&dir)
        .args(["feature", "Analytics", "on"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feature named 'Analytics'"));
}

#[test]
fn test_install_framework_and_status() {
    let dir = project(r#"{"dependencies": {}}"#);

    provisor(&dir).arg("install-framework").assert().success();

    let manifest = read_json(&dir.path().join("Packages/manifest.json"));
    assert_eq!(
        manifest["dependencies"]["CodeSketch"],
        "https://github.com/CodeSketch-dev/CodeSketch.git#main"
    );

    provisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] CodeSketch (CodeSketch)"));
}

#[test]
fn test_init_then_startup() {
    let dir = tempdir().unwrap();

    provisor(&dir).arg("init").assert().success();
    provisor(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    provisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Always show on startup: on"));

    provisor(&dir).args(["startup", "off"]).assert().success();
    let settings = read_json(&dir.path().join("Installer/settings.json"));
    assert_eq!(settings["alwaysShowOnStartup"], false);
    assert_eq!(settings["framework"]["kind"], "git");

    provisor(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Always show on startup: off"))
        .stdout(predicate::str::contains("No package manifest"));
}

#[test]
fn test_settings_override_via_env() {
    let dir = project(r#"{"dependencies": {}}"#);
    let other = dir.path().join("other-settings.json");
    std::fs::write(&other, r#"{"features": []}"#).unwrap();

    Command::new(cargo::cargo_bin!("provisor"))
        .arg("features")
        .env("PROVISOR_PROJECT", dir.path())
        .env("PROVISOR_SETTINGS", &other)
        .assert()
        .success()
        .stdout(predicate::str::contains("No features configured."));
}

#[test]
fn test_git_requirement_is_installed_once() {
    let dir = project(r#"{"dependencies": {}}"#);
    std::fs::write(
        dir.path().join("Installer/settings.json"),
        r#"{"requiredPackages": [{"kind": "git", "packageId": "com.owner.kit", "url": "https://host/kit.git#v1"}]}"#,
    )
    .unwrap();

    provisor(&dir)
        .arg("install-required")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed com.owner.kit"));
    provisor(&dir)
        .arg("install-required")
        .assert()
        .success()
        .stdout(predicate::str::contains("All required packages are installed."));

    let manifest = read_json(&dir.path().join("Packages/manifest.json"));
    assert_eq!(manifest["dependencies"]["com.owner.kit"], "https://host/kit.git#v1");
}

#[test]
fn test_broken_manifest_is_reported() {
    let dir = project("{ not json");

    provisor(&dir)
        .arg("install-required")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}
