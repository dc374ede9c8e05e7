#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

#[allow(unused_imports)]
pub use simcheck_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Write `contents` to a temporary `.toml` file.
pub fn scenario_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Poll `f` every 20ms until it returns true or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    f()
}
