#![allow(dead_code)]

use std::time::Duration;

pub use launchdog_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Give timers and launcher tasks time to run (and to prove that nothing
/// else happens).
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
