use std::path::Path;
use std::time::Duration;

use proptest::prelude::*;

use launchdog::build::{LaunchTarget, SpawnOptions};
use launchdog::engine::{Decision, IdleReason, Session, SessionState};
use launchdog::types::Mode;

const DELAY: Duration = Duration::from_millis(1);

fn session(mode: Mode, retries: u32) -> Session {
    let target = LaunchTarget::for_script(
        "node",
        &[],
        &SpawnOptions::default(),
        Path::new("/dir/test.bundle.js"),
    );
    Session::new(1, mode, target, retries)
}

/// Run one attempt to completion. `healthy` decides whether it reaches the
/// minimum uptime before exiting with `code`.
fn run_attempt(s: &mut Session, healthy: bool, code: i32) -> Decision {
    let attempt = s.attempt().id;
    assert!(s.on_started(attempt));
    if healthy {
        assert!(s.on_min_up_time(attempt));
    }
    s.on_exit(attempt, code, DELAY)
        .expect("exit of the live attempt must produce a decision")
}

proptest! {
    /// Crashing before the minimum uptime every time yields exactly
    /// `retries + 1` attempts.
    #[test]
    fn crash_loop_stops_after_retries_plus_one_attempts(
        retries in 0u32..8,
        codes in proptest::collection::vec(1i32..=255, 16),
    ) {
        let mut s = session(Mode::Watch, retries);
        let mut attempts = 0u32;
        for code in codes {
            attempts += 1;
            match run_attempt(&mut s, false, code) {
                Decision::Retry { after } => {
                    prop_assert_eq!(after, DELAY);
                    prop_assert!(s.begin_retry().is_some());
                }
                Decision::Idle(IdleReason::Exhausted) => break,
                other => prop_assert!(false, "unexpected decision {:?}", other),
            }
        }
        prop_assert_eq!(attempts, retries + 1);
        prop_assert_eq!(s.state(), SessionState::Idle(IdleReason::Exhausted));
    }

    /// Whatever the mix of healthy and unhealthy runs, the budget stays
    /// within `[-1, retries]` and a crash after a healthy run is always
    /// retried.
    #[test]
    fn budget_stays_bounded_and_healthy_crashes_retry(
        retries in 0u32..6,
        runs in proptest::collection::vec(any::<bool>(), 1..32),
    ) {
        let mut s = session(Mode::Watch, retries);
        let mut unhealthy_streak = 0u32;

        for healthy in runs {
            let decision = run_attempt(&mut s, healthy, 1);
            let remaining = s.budget().remaining();
            prop_assert!(remaining >= -1);
            prop_assert!(remaining <= i64::from(s.budget().configured()));

            if healthy {
                unhealthy_streak = 0;
                prop_assert!(matches!(decision, Decision::Retry { .. }), "expected Decision::Retry, got {:?}", decision);
            } else {
                unhealthy_streak += 1;
            }

            match decision {
                Decision::Retry { .. } => {
                    prop_assert!(unhealthy_streak <= retries);
                    prop_assert!(s.begin_retry().is_some());
                }
                Decision::Idle(IdleReason::Exhausted) => {
                    prop_assert_eq!(unhealthy_streak, retries + 1);
                    break;
                }
                other => prop_assert!(false, "unexpected decision {:?}", other),
            }
        }
    }

    /// Run mode never retries: any exit code is handed to the host.
    #[test]
    fn run_mode_always_propagates(
        retries in 0u32..8,
        healthy in any::<bool>(),
        code in -1i32..=255,
    ) {
        let mut s = session(Mode::Run, retries);
        let decision = run_attempt(&mut s, healthy, code);
        prop_assert_eq!(decision, Decision::Propagate(code));
        prop_assert!(s.begin_retry().is_none());
    }
}
