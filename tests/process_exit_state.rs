// tests/process_exit_state.rs
//
// Everything lives in one test so this binary has a single reaper owner.

#![cfg(unix)]

mod common;

use std::time::Duration;

use simcheck::exec::{ExitState, ProcessManager};

use crate::common::{init_tracing, wait_until};

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn reaper_ownership_and_exit_states() {
    init_tracing();

    let owner = ProcessManager::new();
    assert!(owner.is_reaping());

    // Only one manager may own the SIGCHLD handler.
    let degraded = ProcessManager::new();
    assert!(!degraded.is_reaping());
    drop(degraded);

    owner.spawn("ok", &argv(&["true"]), &[]).unwrap();
    owner.spawn("bad", &argv(&["sh", "-c", "exit 3"]), &[]).unwrap();
    owner
        .spawn(
            "env",
            &argv(&["sh", "-c", "test \"$SIMCHECK_TEST_VAR\" = hello"]),
            &["SIMCHECK_TEST_VAR=hello".to_string()],
        )
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        ["ok", "bad", "env"]
            .iter()
            .all(|n| owner.exit_state(n).is_some())
    }));
    assert_eq!(owner.exit_state("ok"), Some(ExitState::Exited(0)));
    assert_eq!(owner.exit_state("bad"), Some(ExitState::Exited(3)));
    assert_eq!(owner.exit_state("env"), Some(ExitState::Exited(0)));
    assert!(ExitState::Exited(0).success());
    assert!(!ExitState::Exited(3).success());

    // Failed execs leave no exit state behind for a reused pid to pick up.
    for _ in 0..50 {
        assert!(owner.spawn("broken", &argv(&["/nonexistent/dir/prog"]), &[]).is_err());
    }
    assert_eq!(owner.stray_exits(), 0);
    assert!(!owner.names().contains(&"broken".to_string()));

    // Children we never spawned are reaped too, and forgotten on stop.
    let foreign = std::process::Command::new("true").spawn().unwrap();
    assert!(wait_until(Duration::from_secs(5), || owner.stray_exits() >= 1));
    drop(foreign);

    // Interrupted processes report the signal.
    owner.spawn("long", &argv(&["sleep", "30"]), &[]).unwrap();
    let records = owner.stop();
    assert_eq!(records.len(), 4);
    let long = records.iter().find(|r| r.name == "long").unwrap();
    assert_eq!(long.state, ExitState::Signaled(nix::libc::SIGINT));
    let bad = records.iter().find(|r| r.name == "bad").unwrap();
    assert_eq!(bad.state, ExitState::Exited(3));
    assert_eq!(owner.stray_exits(), 0);

    // Ownership is released on drop.
    drop(owner);
    let next = ProcessManager::new();
    assert!(next.is_reaping());
}
