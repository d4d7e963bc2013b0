//! Integration tests for scaffolder

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Binary with an isolated home directory
    fn scaffolder(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("scaffolder");
        cmd.env("HOME", home.path())
            .env("USERPROFILE", home.path())
            .env_remove("CLI_HOME")
            .env_remove("CLI_TARGET_PATH")
            .env_remove("LOG_LEVEL");
        cmd
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        scaffolder(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("project scaffolding"))
            .stdout(predicate::str::contains("init"))
            .stdout(predicate::str::contains("worker").not());
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        scaffolder(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("scaffolder 1.0.7"));
    }

    #[test]
    fn no_command_prints_help() {
        let home = TempDir::new().unwrap();
        scaffolder(&home)
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage"));
    }

    #[test]
    fn unknown_command_lists_available() {
        let home = TempDir::new().unwrap();
        scaffolder(&home)
            .arg("publish")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown command: publish"))
            .stderr(predicate::str::contains("Available commands: init"));

        assert!(!home.path().join(".scaffolder").exists());
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let home = TempDir::new().unwrap();
        let cli_home = home.path().join(".scaffolder");
        std::fs::create_dir_all(&cli_home).unwrap();
        std::fs::write(cli_home.join("config.toml"), "registry = 3").unwrap();

        scaffolder(&home)
            .arg("publish")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn malformed_dotenv_is_logged() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(".env"), "not a valid line\n").unwrap();

        scaffolder(&home)
            .args(["--debug", "publish"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Skipping malformed line"))
            .stdout(predicate::str::contains("CLI home:"));
    }

    #[test]
    fn worker_missing_request() {
        let home = TempDir::new().unwrap();
        scaffolder(&home)
            .args(["worker", "/definitely/not/a/request.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn worker_rejects_old_cli_version() {
        let home = TempDir::new().unwrap();
        let request = home.path().join("request.json");
        std::fs::write(
            &request,
            r#"{"command":"init","args":[],"options":{},"cliVersion":"0.1.0"}"#,
        )
        .unwrap();

        scaffolder(&home)
            .arg("worker")
            .arg(&request)
            .assert()
            .failure()
            .stderr(predicate::str::contains("too old"));
    }

    #[test]
    fn init_with_target_path_without_manifest() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        std::fs::create_dir_all(&local).unwrap();

        scaffolder(&home)
            .arg("init")
            .arg("--target-path")
            .arg(&local)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No entry point found"));
    }
}

#[cfg(unix)]
mod dispatch_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn scaffolder(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("scaffolder");
        cmd.env("HOME", home.path())
            .env_remove("CLI_HOME")
            .env_remove("CLI_TARGET_PATH")
            .env_remove("LOG_LEVEL");
        cmd
    }

    /// Local command package whose `bin/init` runs `body`
    fn script_package(dir: &Path, body: &str) {
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(dir.join("package.json"), r#"{"name":"@scaffolder/init","main":"bin/init"}"#)
            .unwrap();
        let script = dir.join("bin/init");
        fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Local command package whose entry copies the request and exits
    fn local_package(dir: &Path, output: &Path, exit_code: i32) {
        script_package(
            dir,
            &format!(
                "cp \"$1\" \"{}\"\necho dispatched\nexit {}\n",
                output.display(),
                exit_code
            ),
        );
    }

    const ECHO_ENV: &str =
        "echo \"CHILD LOG_LEVEL=[$LOG_LEVEL] CLI_TARGET_PATH=[$CLI_TARGET_PATH]\"\n";

    #[test]
    fn init_forwards_arguments_to_local_package() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        let output = home.path().join("request.json");
        local_package(&local, &output, 0);

        scaffolder(&home)
            .args(["init", "project-name", "--force", "--targetPath"])
            .arg(&local)
            .assert()
            .success()
            .stdout(predicate::str::contains("dispatched"));

        let request: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(request["command"], "init");
        assert_eq!(request["args"], serde_json::json!(["project-name"]));
        assert_eq!(request["options"], serde_json::json!({"force": true}));
        assert_eq!(request["cliVersion"], "1.0.7");
    }

    #[test]
    fn target_path_from_environment() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        let output = home.path().join("request.json");
        local_package(&local, &output, 0);

        scaffolder(&home)
            .arg("init")
            .env("CLI_TARGET_PATH", &local)
            .assert()
            .success();

        assert!(output.is_file());
    }

    #[test]
    fn child_exit_code_is_propagated() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        let output = home.path().join("request.json");
        local_package(&local, &output, 3);

        scaffolder(&home)
            .arg("init")
            .arg("--target-path")
            .arg(&local)
            .assert()
            .code(3);
    }

    #[test]
    fn debug_and_target_path_reach_the_child() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        script_package(&local, ECHO_ENV);

        scaffolder(&home)
            .args(["--debug", "init", "--targetPath"])
            .arg(&local)
            .assert()
            .success()
            .stdout(predicate::str::contains("LOG_LEVEL=[verbose]"))
            .stdout(predicate::str::contains(format!(
                "CLI_TARGET_PATH=[{}]",
                local.display()
            )));
    }

    #[test]
    fn child_stays_at_info_without_debug() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("local-init");
        script_package(&local, ECHO_ENV);

        scaffolder(&home)
            .arg("init")
            .arg("--target-path")
            .arg(&local)
            .assert()
            .success()
            .stdout(predicate::str::contains("LOG_LEVEL=[]"));
    }

    #[test]
    fn spawn_failure_is_reported_once() {
        let home = TempDir::new().unwrap();
        let local = home.path().join("broken");
        script_package(&local, "exit 0\n");
        // Present but not executable
        fs::set_permissions(local.join("bin/init"), fs::Permissions::from_mode(0o644)).unwrap();

        scaffolder(&home)
            .arg("init")
            .arg("--target-path")
            .arg(&local)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:").count(1))
            .stdout(predicate::str::contains("ERROR").not());
    }
}
