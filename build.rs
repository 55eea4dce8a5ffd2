use std::process::Command;

/// Short commit hash from git, falling back to `GIT_SHA` for builds outside a checkout
fn git_sha() -> Option<String> {
    let from_git = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    from_git
        .or_else(|| std::env::var("GIT_SHA").ok())
        .filter(|sha| !sha.is_empty())
}

fn main() {
    let version = env!("CARGO_PKG_VERSION");
    let nightly = matches!(
        std::env::var("TELEMIRROR_NIGHTLY").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("True")
    );

    let app_version = match (nightly, git_sha()) {
        (false, _) => version.to_string(),
        (true, Some(sha)) => format!("{version}-nightly+{sha}"),
        (true, None) => format!("{version}-nightly"),
    };
    println!("cargo:rustc-env=APP_VERSION={app_version}");

    for var in ["TELEMIRROR_NIGHTLY", "GIT_SHA"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
}
