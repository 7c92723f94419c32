//! Property tests for the per-conversation invariants.
//!
//! Random interleavings of messages, reads and scans across a few
//! conversations must never leave a record in an inconsistent state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use nudge_core::{
    EscalationAnchor, MemoryStateStore, NotificationEngine, NotificationsConfig,
    RecordingNotifier, StateStore,
};
use proptest::prelude::*;

const TOKENS: [&str; 3] = ["alpha", "beta", "gamma"];

#[derive(Debug, Clone)]
enum Op {
    Message { token: usize, advance_secs: i64 },
    Read { token: usize },
    Scan { advance_secs: i64 },
    FailNotifier { token: usize, fail: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..TOKENS.len(), 0i64..600).prop_map(|(token, advance_secs)| Op::Message { token, advance_secs }),
        1 => (0..TOKENS.len()).prop_map(|token| Op::Read { token }),
        3 => (0i64..900).prop_map(|advance_secs| Op::Scan { advance_secs }),
        1 => (0..TOKENS.len(), any::<bool>()).prop_map(|(token, fail)| Op::FailNotifier { token, fail }),
    ]
}

fn anchor_strategy() -> impl Strategy<Value = EscalationAnchor> {
    prop_oneof![
        Just(EscalationAnchor::EpisodeStart),
        Just(EscalationAnchor::LastReminder),
    ]
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

proptest! {
    #[test]
    fn prop_state_invariants_hold(
        ops in prop::collection::vec(op_strategy(), 1..80),
        max_repeats in 0u32..5,
        anchor in anchor_strategy(),
    ) {
        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let mut config = NotificationsConfig::default();
        config.max_repeats = max_repeats;
        config.escalation_anchor = anchor;
        let engine = NotificationEngine::new(store.clone(), notifier.clone(), config);
        let scheduler = engine.scheduler();

        let mut now = t0();
        for op in ops {
            match op {
                Op::Message { token, advance_secs } => {
                    now += Duration::seconds(advance_secs);
                    let before = store.get(TOKENS[token]).unwrap();
                    let outcome = engine.on_message_received(TOKENS[token], "m", now).unwrap();
                    let after = store.get(TOKENS[token]).unwrap();

                    prop_assert_eq!(outcome.new_episode, !before.is_unread);
                    if outcome.new_episode {
                        prop_assert_eq!(after.repeat_count, 0);
                        prop_assert_eq!(after.unread_since, Some(now));
                    } else {
                        prop_assert_eq!(after.unread_since, before.unread_since);
                        prop_assert_eq!(after.repeat_count, before.repeat_count);
                    }
                    prop_assert_eq!(after.last_audible_signal_at, Some(now));
                }
                Op::Read { token } => {
                    engine.on_conversation_read(TOKENS[token]).unwrap();
                    prop_assert!(!store.get(TOKENS[token]).unwrap().is_unread);
                }
                Op::Scan { advance_secs } => {
                    now += Duration::seconds(advance_secs);
                    let before = store.list_all().unwrap();
                    scheduler.scan(now).unwrap();
                    // an immediate rescan never issues anything, whatever the anchor
                    prop_assert_eq!(scheduler.scan(now).unwrap().reminded, 0);
                    for old in before {
                        let new = store.get(&old.token).unwrap();
                        prop_assert!(new.repeat_count <= old.repeat_count + 1);
                    }
                }
                Op::FailNotifier { token, fail } => {
                    if fail {
                        notifier.fail_for(TOKENS[token]);
                    } else {
                        notifier.recover(TOKENS[token]);
                    }
                }
            }

            for state in store.list_all().unwrap() {
                prop_assert!(state.repeat_count <= max_repeats);
                prop_assert_eq!(state.unread_since.is_some(), state.is_unread);
                if !state.is_unread {
                    prop_assert_eq!(state.repeat_count, 0);
                    prop_assert!(state.last_reminder_at.is_none());
                }
            }
        }
    }

    #[test]
    fn prop_burst_inside_window_is_audible_once(
        gaps in prop::collection::vec(0i64..=180, 1..40),
    ) {
        let engine = NotificationEngine::new(
            Arc::new(MemoryStateStore::new()),
            Arc::new(RecordingNotifier::new()),
            NotificationsConfig::default(),
        );

        let mut now = t0();
        prop_assert!(engine.on_message_received("room", "m", now).unwrap().audible);
        for gap in gaps {
            now += Duration::seconds(gap);
            prop_assert!(!engine.on_message_received("room", "m", now).unwrap().audible);
        }
        now += Duration::seconds(181);
        prop_assert!(engine.on_message_received("room", "m", now).unwrap().audible);
    }
}
