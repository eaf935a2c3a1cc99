use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const REMOTES: &str = "remotes:\n  - {name: a, user: u, pass: p, ip: 10.0.0.1, port: 22}\n";

fn run_with_config(text: &str) -> assert_cmd::assert::Assert {
    let dir = tempdir().unwrap();
    let config = dir.path().join("ssh-exec.yml");
    std::fs::write(&config, text).unwrap();
    Command::cargo_bin("ssh-exec")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .assert()
}

#[test]
fn default_config_path_is_used() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("ssh-exec")
        .unwrap()
        .current_dir(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ssh-exec.yml"));
}

#[test]
fn invalid_yaml_exits_1() {
    run_with_config("remotes: [\n").code(1);
}

#[test]
fn remotes_error_exits_2() {
    run_with_config(
        "remotes:\n  - {name: a, user: u, ip: 10.0.0.1, port: 22}\n  - {name: a, user: u, ip: 10.0.0.2, port: 22}\n",
    )
    .code(2)
    .stderr(predicate::str::contains("remote name is not unique: name=`a`"));
}

#[test]
fn invalid_address_exits_2() {
    run_with_config("remotes:\n  - {name: a, user: u, ip: 10.0.0.1, port: 0}\n")
        .code(2)
        .stderr(predicate::str::contains("remote ip or port is invalid"));
}

#[test]
fn no_remotes_exits_3() {
    run_with_config("remotes: []\nexec: 42\n")
        .code(3)
        .stderr(predicate::str::contains("no root remotes"));
}

#[test]
fn exec_error_exits_4() {
    run_with_config(&format!(
        "{REMOTES}exec:\n  - copy:\n      - files:\n          - {{from: /tmp/x}}\n"
    ))
    .code(4)
    .stderr(predicate::str::contains("malformed config: `exec/copy/files`"));
}

#[test]
fn repeated_key_exits_4() {
    run_with_config(&format!(
        "{REMOTES}exec:\n  - copy:\n      - files:\n          - {{from: a, from: b, to: c}}\n"
    ))
    .code(4)
    .stderr(predicate::str::contains(
        "malformed config: `exec/copy/files/from`",
    ));
}

#[test]
fn no_commands_exits_5() {
    run_with_config(&format!("{REMOTES}exec: []\n"))
        .code(5)
        .stderr(predicate::str::contains("no commands to execute"));
}

#[test]
fn quiet_suppresses_errors() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("ssh-exec.yml");
    std::fs::write(&config, "remotes: []\n").unwrap();
    Command::cargo_bin("ssh-exec")
        .unwrap()
        .arg("-q")
        .arg("-c")
        .arg(&config)
        .assert()
        .code(3)
        .stderr(predicate::str::is_empty());
}

#[test]
fn dry_run_prints_plan_without_credentials() {
    run_with_config(&format!(
        "{REMOTES}exec:\n  - copy:\n      - settings:\n          flags: [allow-next-target-files-overwrite]\n      - files:\n          - {{from: /tmp/x, to: /etc/x}}\n"
    ))
    .success()
    .stdout(predicate::str::contains("\"from\": \"/tmp/x\""))
    .stdout(predicate::str::contains("\"settings\": 1"))
    .stdout(predicate::str::contains("\"pass\"").not());
}

#[test]
fn unreachable_remote_does_not_fail_the_run() {
    // grab a free port, then close it so connecting is refused
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let dir = tempdir().unwrap();
    let source = dir.path().join("app.conf");
    std::fs::write(&source, "x").unwrap();
    let config = dir.path().join("ssh-exec.yml");
    std::fs::write(
        &config,
        format!(
            "remotes:\n  - {{name: a, user: u, ip: 127.0.0.1, port: {port}}}\nexec:\n  - copy:\n      - files:\n          - {{from: \"{}\", to: /tmp/app.conf}}\n",
            source.display()
        ),
    )
    .unwrap();
    Command::cargo_bin("ssh-exec")
        .unwrap()
        .arg("--summary")
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("remotes failed: 1"));
}
