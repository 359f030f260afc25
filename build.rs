use std::{
    env,
    process::Command,
    time::{SystemTime, UNIX_EPOCH},
};

/// Packagers building outside a git checkout can pin the version here.
const VERSION_OVERRIDE: &str = "PROVISOR_BUILD_VERSION";

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed={}", VERSION_OVERRIDE);

    let version = env::var(VERSION_OVERRIDE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_version)
        .unwrap_or_else(|| format!("{}-unknown-{}", env!("CARGO_PKG_VERSION"), timestamp()));

    println!("cargo:rustc-env=PROVISOR_VERSION={}", version);
}

/// `git describe` output without the tag's `v`; dirty trees get a build stamp.
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    let version = described.strip_prefix('v').unwrap_or(described);
    match version {
        "" => None,
        v if v.ends_with("-dirty") => Some(format!("{}-{}", v, timestamp())),
        v => Some(v.to_string()),
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
