// Kept in its own test binary: it mutates the process environment
use std::fs;
use telemirror::config::{Config, PASSWORD_ENV};

#[test]
fn password_env_overrides_file_value() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("telemirror.yaml");
    fs::write(
        &path,
        "account:\n  username: driver@example.com\n  password: from-file\n",
    )
    .unwrap();

    // SAFETY: the only test in this binary, no other thread reads the environment
    unsafe { std::env::set_var(PASSWORD_ENV, "") };
    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.account.password, "from-file");

    unsafe { std::env::set_var(PASSWORD_ENV, "from-env") };
    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.account.username, "driver@example.com");
    assert_eq!(cfg.account.password, "from-env");

    unsafe { std::env::remove_var(PASSWORD_ENV) };
    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.account.password, "from-file");
}
