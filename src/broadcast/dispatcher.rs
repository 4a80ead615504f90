use std::time::Duration;

use tokio::time::sleep;

use crate::broadcast::outbound::OutboundClient;
use crate::broadcast::types::{DeliveryOutcome, Destination, DispatchReport, Payload, SendMode};

/// Minimum pause between consecutive sends. Part of the contract with
/// Telegram's flood control; removing it risks the bot being rate-limited or
/// banned mid-batch.
pub const SEND_INTERVAL: Duration = Duration::from_millis(50);

/// Delivers `payload` to every destination in `targets`, one at a time.
///
/// Individual failures are classified and counted, never fatal to the batch.
/// The loop takes no operator input once started: cancellation during
/// dispatch is not honored, an interrupted process simply loses the run.
pub async fn run_broadcast<C: OutboundClient + ?Sized>(
    client: &C,
    targets: &[Destination],
    payload: &Payload,
    mode: SendMode,
) -> DispatchReport {
    let mut success = 0;
    let mut failed = 0;

    for destination in targets {
        let result = match mode {
            SendMode::Copy => client.send_copy(destination.chat_id, payload).await,
            SendMode::Forward => client.send_forward(destination.chat_id, payload).await,
        };

        let outcome = match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => e.outcome(),
        };

        if outcome.is_success() {
            success += 1;
        } else {
            log::warn!(
                "Broadcast delivery to {} ({}) failed: {:?}",
                destination.chat_id,
                destination.title,
                outcome
            );
            failed += 1;
        }

        sleep(SEND_INTERVAL).await;
    }

    DispatchReport {
        total: targets.len(),
        success,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::outbound::SendError;
    use crate::broadcast::types::{ChatCategory, PayloadKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedClient {
        failures: HashMap<i64, SendError>,
        calls: Mutex<Vec<(i64, SendMode)>>,
    }

    impl ScriptedClient {
        fn new(failures: HashMap<i64, SendError>) -> Self {
            ScriptedClient {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(&self, destination: i64, mode: SendMode) -> Result<(), SendError> {
            self.calls.lock().unwrap().push((destination, mode));
            match self.failures.get(&destination) {
                Some(err) => Err(*err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl OutboundClient for ScriptedClient {
        async fn send_copy(&self, destination: i64, _payload: &Payload) -> Result<(), SendError> {
            self.respond(destination, SendMode::Copy)
        }

        async fn send_forward(
            &self,
            destination: i64,
            _payload: &Payload,
        ) -> Result<(), SendError> {
            self.respond(destination, SendMode::Forward)
        }
    }

    fn targets(ids: &[i64]) -> Vec<Destination> {
        ids.iter()
            .map(|&chat_id| Destination {
                chat_id,
                category: ChatCategory::Group,
                title: format!("chat {chat_id}"),
                username: None,
            })
            .collect()
    }

    fn payload() -> Payload {
        Payload {
            source_chat: 42,
            message_id: 7,
            kind: PayloadKind::Text,
            snippet: Some("hello".into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tally_invariant_holds_with_mixed_outcomes() {
        let client = ScriptedClient::new(HashMap::from([(-102, SendError::Denied)]));
        let targets = targets(&[-101, -102, -103]);

        let report = run_broadcast(&client, &targets, &payload(), SendMode::Copy).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.success + report.failed, report.total);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_never_abort_the_batch() {
        let client = ScriptedClient::new(HashMap::from([
            (-1, SendError::Denied),
            (-2, SendError::Unreachable),
            (-3, SendError::TimedOut),
            (-4, SendError::Malformed),
        ]));
        let targets = targets(&[-1, -2, -3, -4, -5]);

        let report = run_broadcast(&client, &targets, &payload(), SendMode::Forward).await;

        assert_eq!(report.total, 5);
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, 4);
        // Every destination was attempted despite the failures.
        assert_eq!(client.calls.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_is_passed_through_to_the_client() {
        let client = ScriptedClient::new(HashMap::new());
        let targets = targets(&[-1]);

        run_broadcast(&client, &targets, &payload(), SendMode::Forward).await;

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(-1, SendMode::Forward)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_target_set_reports_zero_without_sends() {
        let client = ScriptedClient::new(HashMap::new());

        let report = run_broadcast(&client, &[], &payload(), SendMode::Copy).await;

        assert_eq!(
            report,
            DispatchReport {
                total: 0,
                success: 0,
                failed: 0
            }
        );
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_delay_runs_between_sends() {
        let client = ScriptedClient::new(HashMap::new());
        let targets = targets(&[-1, -2, -3]);

        let started = tokio::time::Instant::now();
        run_broadcast(&client, &targets, &payload(), SendMode::Copy).await;

        assert!(started.elapsed() >= SEND_INTERVAL * 3);
    }
}
