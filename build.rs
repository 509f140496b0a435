use std::process::Command;

fn git_output(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
}

fn main() {
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap();

    // ARBOR_VERSION: release builds report the bare package version, dev builds
    // append the short commit hash when one is available.
    let version = if std::env::var("ARBOR_BUILD_RELEASE").is_ok() {
        pkg_version
    } else {
        match git_output(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{pkg_version} (dev {hash})"),
            None => pkg_version,
        }
    };

    println!("cargo:rustc-env=ARBOR_VERSION={version}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=ARBOR_BUILD_RELEASE");
}
