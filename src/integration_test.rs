use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::{TempDir, tempdir};

use crate::{
    config::Config,
    core::{domain::ExecutionResult, orchestrator::Orchestrator},
    get_available_languages, health_check, run_code_in_language,
};

fn native_orchestrator(timeout: Duration) -> (Orchestrator, TempDir) {
    let work_dir = tempdir().expect("Failed to create work dir");
    let config = Config::default()
        .with_timeout(timeout)
        .with_work_dir(work_dir.path());
    (Orchestrator::native(config), work_dir)
}

/// Toolchains are host dependent; a missing one skips the test.
fn installed(orchestrator: &Orchestrator, language: &str) -> bool {
    let available = orchestrator
        .available_languages()
        .iter()
        .any(|id| *id == language);
    if !available {
        println!("Skipping: {} toolchain is not installed", language);
    }
    available
}

fn assert_clean(dir: &Path) {
    let leftovers: Vec<_> = fs::read_dir(dir)
        .expect("Work dir should still exist")
        .flatten()
        .map(|entry| entry.path())
        .collect();
    assert!(leftovers.is_empty(), "Leftover artifacts: {:?}", leftovers);
}

const PYTHON_ECHO: &str = "print(input())";

const C_HELLO: &str = r#"
#include <stdio.h>

int main(void) {
    char name[64];
    if (scanf("%63s", name) != 1) return 1;
    printf("Hello, %s!\n", name);
    return 0;
}
"#;

const CPP_SYNTAX_ERROR: &str = r#"
#include <iostream>
int main() {
    std::cout << "Hello, World!" << std::endl
    return 0;
}"#;

const JAVA_HELLO: &str = r#"
import java.util.Scanner;

public class Main {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        int a = in.nextInt();
        int b = in.nextInt();
        System.out.println(a + b);
    }
}
"#;

#[tokio::test]
async fn test_unsupported_language_touches_nothing() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));

    let result = orchestrator.run("print(1)", "", "fortran").await;

    assert_eq!(result, ExecutionResult::failure("Language fortran not supported."));
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_default_entry_point_rejects_unknown_language() {
    let result = run_code_in_language("", "", "unsupported-id").await;
    assert_eq!(
        result,
        ExecutionResult::failure("Language unsupported-id not supported.")
    );
}

#[test]
fn test_health_report_lists_available_languages() {
    let report = health_check();
    assert_eq!(report.status, "healthy");
    assert_eq!(report.available_languages, get_available_languages());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["available_languages"].is_array());
}

#[tokio::test]
async fn test_python_echo_round_trip() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "python") {
        return;
    }

    let result = orchestrator.run(PYTHON_ECHO, "hello\n", "python").await;

    assert_eq!(result, ExecutionResult::Success("hello\n".to_string()));
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_python_empty_code_and_stdin() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "python") {
        return;
    }

    let result = orchestrator.run("", "", "python").await;

    assert_eq!(result, ExecutionResult::Success(String::new()));
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_python_reads_until_eof() {
    let (orchestrator, _work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "python") {
        return;
    }

    let code = "import sys\nprint(len(sys.stdin.read()))";
    let result = orchestrator.run(code, "", "python").await;

    assert_eq!(result, ExecutionResult::Success("0\n".to_string()));
}

#[tokio::test]
async fn test_python_runtime_error() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "python") {
        return;
    }

    let result = orchestrator.run("print('before')\n1 / 0", "", "python").await;

    match result {
        ExecutionResult::Failure(msg) => assert!(msg.contains("ZeroDivisionError"), "{msg}"),
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_repeated_runs_are_independent() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "c") {
        return;
    }

    let first = orchestrator.run(C_HELLO, "Ferris", "c").await;
    let second = orchestrator.run(C_HELLO, "Ferris", "c").await;

    assert_eq!(first, ExecutionResult::Success("Hello, Ferris!\n".to_string()));
    assert_eq!(first, second);
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_cpp_compile_error() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(30));
    if !installed(&orchestrator, "cpp") {
        return;
    }

    let result = orchestrator.run(CPP_SYNTAX_ERROR, "", "cpp").await;

    match result {
        ExecutionResult::Failure(msg) => assert!(msg.contains("error"), "{msg}"),
        other => panic!("Expected compile failure, got {:?}", other),
    }
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_java_compile_and_run() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(30));
    if !installed(&orchestrator, "java") {
        return;
    }

    let result = orchestrator.run(JAVA_HELLO, "2 40\n", "java").await;

    assert_eq!(result, ExecutionResult::Success("42\n".to_string()));
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_javascript_echo() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "javascript") {
        return;
    }

    let code = "process.stdin.on('data', d => process.stdout.write(d.toString().toUpperCase()));";
    let result = orchestrator.run(code, "shout\n", "javascript").await;

    assert_eq!(result, ExecutionResult::Success("SHOUT\n".to_string()));
    assert_clean(work_dir.path());
}

#[tokio::test]
async fn test_concurrent_runs_do_not_interfere() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(10));
    if !installed(&orchestrator, "python") {
        return;
    }

    let first = "import time\ntime.sleep(0.2)\nprint('first', input())";
    let second = "print('second', input())";
    let (a, b) = tokio::join!(
        orchestrator.run(first, "a\n", "python"),
        orchestrator.run(second, "b\n", "python"),
    );

    assert_eq!(a, ExecutionResult::Success("first a\n".to_string()));
    assert_eq!(b, ExecutionResult::Success("second b\n".to_string()));
    assert_clean(work_dir.path());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timeout_kills_process_tree() {
    let (orchestrator, work_dir) = native_orchestrator(Duration::from_secs(1));
    if !installed(&orchestrator, "python") {
        return;
    }

    // Pids are written outside the work dir so the cleanup check stays exact.
    let pid_dir = tempdir().unwrap();
    let pid_file = pid_dir.path().join("pids");
    let code = format!(
        r#"
import os, subprocess, time
child = subprocess.Popen(["sleep", "30"])
with open({path:?}, "w") as f:
    f.write("%d %d" % (os.getpid(), child.pid))
time.sleep(30)
"#,
        path = pid_file.display().to_string()
    );

    let result = orchestrator.run(&code, "", "python").await;

    assert_eq!(result, ExecutionResult::failure("Execution timed out."));
    assert_clean(work_dir.path());

    let pids = fs::read_to_string(&pid_file).expect("Program should have written its pids");
    for pid in pids.split_whitespace() {
        let pid: u32 = pid.parse().unwrap();
        assert!(wait_until_gone(pid).await, "Process {} is still running", pid);
    }
}

/// A process counts as gone once it no longer exists or is a zombie
/// waiting for its reaper.
#[cfg(target_os = "linux")]
async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..50 {
        let running = match fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z" && state != "X"),
            Err(_) => false,
        };
        if !running {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
