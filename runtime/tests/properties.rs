//! Property tests for snapshot sequences

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use proptest::prelude::*;
use reactive_xhr_core::{ChannelTag, Direction, ProgressEvent, Snapshot};
use reactive_xhr_runtime::{Session, skip_duplicates};
use reactive_xhr_testing::MockConnection;
use reactive_xhr_testing::properties::{arb_event_script, arb_status};
use std::sync::Arc;

fn play(script: &[(Direction, ProgressEvent)]) -> (Arc<MockConnection>, Vec<Snapshot<MockConnection>>) {
    let connection = Arc::new(MockConnection::new());
    let session = Session::new(Arc::clone(&connection));
    let stream = session.subscribe();
    for (direction, event) in script {
        connection.dispatch(*direction, event);
    }
    connection.dispatch(Direction::Down, &ProgressEvent::load_end());
    // Events after completion must not reach anyone.
    connection.dispatch(Direction::Down, &ProgressEvent::progress(1, 1));
    let snapshots = tokio_test::block_on(stream.collect());
    (connection, snapshots)
}

proptest! {
    #[test]
    fn test_one_emission_per_event_ending_in_one_terminal(script in arb_event_script(24)) {
        let (connection, snapshots) = play(&script);

        prop_assert_eq!(snapshots.len(), script.len() + 1);
        prop_assert!(snapshots.last().unwrap().is_terminal());
        prop_assert_eq!(snapshots.iter().filter(|s| s.is_terminal()).count(), 1);
        prop_assert_eq!(connection.listener_count(), 0);
        prop_assert_eq!(connection.abort_count(), 0);
    }

    #[test]
    fn test_channel_tags_are_monotonic(script in arb_event_script(24)) {
        let (_, snapshots) = play(&script);

        for direction in Direction::BOTH {
            let tags: Vec<ChannelTag> = snapshots.iter().map(|s| s.channel(direction).tag()).collect();
            for pair in tags.windows(2) {
                prop_assert!(pair[0].rank() <= pair[1].rank());
                if pair[0].is_terminal() {
                    prop_assert_eq!(pair[0], pair[1]);
                }
            }
        }
    }

    #[test]
    fn test_skip_duplicates_never_repeats(values in proptest::collection::vec(arb_status(), 0..32)) {
        let deduped: Vec<u16> = tokio_test::block_on(
            skip_duplicates(futures::stream::iter(values.clone())).collect(),
        );

        prop_assert!(deduped.windows(2).all(|pair| pair[0] != pair[1]));
        let mut expected = values;
        expected.dedup();
        prop_assert_eq!(deduped, expected);
    }
}
