//! Work request polling
//!
//! Asynchronous GoldenGate operations answer with the id of a work request.
//! [`wait_for_work_request`] polls it until it reaches a terminal status and
//! returns the identifier of the resource it created, updated or deleted.

use std::time::Duration;

use carina_core::waiter::StateChangeConf;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{OciError, OciResult};
use crate::golden_gate::WorkRequestApi;
use crate::golden_gate::models::{ActionType, OperationStatus, WorkRequest};
use crate::retry::{OperationResponse, RetryPolicy, default_should_retry};

/// Timeout and refresh interval of a work request wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub timeout: Duration,
    /// Fixed interval between refreshes; backs off from 100ms to 10s when unset
    pub poll_interval: Option<Duration>,
}

impl WaitSettings {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Derive the polling policy from the caller's policy.
///
/// Besides the default retry rules (measured from the start of the wait),
/// a successful GetWorkRequest whose `timeFinished` is still unset is
/// fetched again. Nothing is retried once the timeout has passed.
fn polling_policy(policy: &RetryPolicy, timeout: Duration) -> RetryPolicy {
    let start = Instant::now();
    let base = default_should_retry(false, policy.windows);

    policy.with_should_retry(move |response: &OperationResponse<'_>| {
        if Instant::now() > start + timeout {
            return false;
        }
        let from_start = OperationResponse {
            started: start,
            ..*response
        };
        if base(&from_start) {
            return true;
        }
        response.operation == "GetWorkRequest"
            && response.is_success()
            && response
                .body
                .is_some_and(|body| body.get("timeFinished").is_none_or(Value::is_null))
    })
}

/// Whether `work_request` touched an entity of `entity_type` with `action`.
///
/// Entity types compare case-insensitively by substring, so a filter of
/// "deployment" matches "GoldenGateDeployment".
fn affected_identifier<'a>(
    work_request: &'a WorkRequest,
    entity_type: &str,
    action: &ActionType,
) -> Option<&'a str> {
    let filter = entity_type.to_lowercase();
    work_request
        .resources
        .iter()
        .find(|r| r.entity_type.to_lowercase().contains(&filter) && &r.action_type == action)
        .map(|r| r.identifier.as_str())
}

/// Wait for a work request to finish and return the affected identifier.
///
/// Anything other than a successful work request that reports `action` on
/// an entity of `entity_type` is an error carrying every message the
/// service recorded for the work request.
pub async fn wait_for_work_request<A>(
    api: &A,
    work_request_id: &str,
    entity_type: &str,
    action: ActionType,
    settings: WaitSettings,
    policy: &RetryPolicy,
) -> OciResult<String>
where
    A: WorkRequestApi + ?Sized,
{
    let policy = &polling_policy(policy, settings.timeout);

    let mut conf = StateChangeConf::new(
        [OperationStatus::InProgress, OperationStatus::Accepted].map(|s| s.to_string()),
        [
            OperationStatus::Succeeded,
            OperationStatus::Failed,
            OperationStatus::Canceled,
        ]
        .map(|s| s.to_string()),
        settings.timeout,
    );
    if let Some(interval) = settings.poll_interval {
        conf = conf.with_poll_interval(interval);
    }

    let work_request = conf
        .wait_for_state(|| async move {
            let work_request = api.get_work_request(work_request_id, policy).await?;
            let status = work_request.status.to_string();
            Ok::<_, OciError>((work_request, status))
        })
        .await?;

    if work_request.status == OperationStatus::Succeeded
        && let Some(identifier) = affected_identifier(&work_request, entity_type, &action)
    {
        log::info!(
            "work request {} finished: {} {}",
            work_request_id,
            action,
            identifier
        );
        return Ok(identifier.to_string());
    }

    log::warn!(
        "work request {} ended with status {} and no {} {} entry",
        work_request_id,
        work_request.status,
        action,
        entity_type
    );
    Err(work_request_failure(api, work_request_id, entity_type, action, policy).await)
}

/// Collect the service's error messages for a work request
async fn work_request_failure<A>(
    api: &A,
    work_request_id: &str,
    entity_type: &str,
    action: ActionType,
    policy: &RetryPolicy,
) -> OciError
where
    A: WorkRequestApi + ?Sized,
{
    match api.list_work_request_errors(work_request_id, policy).await {
        Ok(errors) => OciError::WorkRequestFailed {
            work_request_id: work_request_id.to_string(),
            entity_type: entity_type.to_string(),
            action,
            message: errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        },
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGoldenGate, affected, fake_work_request};
    use carina_core::waiter::WaitError;

    const WR: &str = "ocid1.goldengateworkrequest.oc1..wr";
    const DEPLOYMENT: &str = "ocid1.goldengatedeployment.oc1..d";

    fn policy() -> RetryPolicy {
        RetryPolicy::new(None, Duration::from_secs(1), Duration::from_secs(10), false)
    }

    fn settings() -> WaitSettings {
        WaitSettings::new(Duration::from_secs(20 * 60))
            .with_poll_interval(Some(Duration::from_secs(5)))
    }

    async fn wait(fake: &FakeGoldenGate, action: ActionType) -> OciResult<String> {
        wait_for_work_request(fake, WR, "deployment", action, settings(), &policy()).await
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_returns_matching_identifier() {
        let fake = FakeGoldenGate::new();
        fake.script_work_request(vec![
            fake_work_request(WR, OperationStatus::Accepted, vec![]),
            fake_work_request(WR, OperationStatus::InProgress, vec![]),
            fake_work_request(
                WR,
                OperationStatus::Succeeded,
                vec![
                    affected("GoldenGateConnection", ActionType::Related, "other"),
                    affected("GoldenGateDeployment", ActionType::Created, DEPLOYMENT),
                ],
            ),
        ]);

        let id = wait(&fake, ActionType::Created).await.unwrap();

        assert_eq!(id, DEPLOYMENT);
        assert_eq!(fake.count("ListWorkRequestErrors"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unfinished_work_requests_are_refetched_by_the_policy() {
        let fake = FakeGoldenGate::new();
        let mut finishing = fake_work_request(
            WR,
            OperationStatus::Succeeded,
            vec![affected("Deployment", ActionType::Updated, DEPLOYMENT)],
        );
        finishing.time_finished = None;
        fake.script_work_request(vec![
            finishing,
            fake_work_request(
                WR,
                OperationStatus::Succeeded,
                vec![affected("Deployment", ActionType::Updated, DEPLOYMENT)],
            ),
        ]);

        let id = wait(&fake, ActionType::Updated).await.unwrap();

        assert_eq!(id, DEPLOYMENT);
        assert_eq!(fake.count("GetWorkRequest"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_and_canceled_join_error_messages() {
        for status in [OperationStatus::Failed, OperationStatus::Canceled] {
            let fake = FakeGoldenGate::new();
            fake.script_work_request(vec![fake_work_request(
                WR,
                status.clone(),
                vec![affected("GoldenGateDeployment", ActionType::Failed, DEPLOYMENT)],
            )]);
            fake.set_work_request_errors(WR, &["subnet is full", "quota exceeded"]);

            let err = wait(&fake, ActionType::Created).await.unwrap_err();

            match err {
                OciError::WorkRequestFailed {
                    work_request_id,
                    entity_type,
                    action,
                    message,
                } => {
                    assert_eq!(work_request_id, WR);
                    assert_eq!(entity_type, "deployment");
                    assert_eq!(action, ActionType::Created);
                    assert_eq!(message, "subnet is full\nquota exceeded");
                }
                other => panic!("Expected WorkRequestFailed for {}, got {:?}", status, other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_error_listing_is_returned() {
        let fake = FakeGoldenGate::new();
        fake.script_work_request(vec![fake_work_request(WR, OperationStatus::Failed, vec![])]);
        fake.fail_next("ListWorkRequestErrors", 401, "NotAuthenticated");

        let err = wait(&fake, ActionType::Created).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(!matches!(err, OciError::WorkRequestFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn success_without_matching_entry_is_a_failure() {
        let fake = FakeGoldenGate::new();
        fake.script_work_request(vec![fake_work_request(
            WR,
            OperationStatus::Succeeded,
            vec![
                affected("GoldenGateDeployment", ActionType::Updated, DEPLOYMENT),
                affected("GoldenGateConnection", ActionType::Created, "other"),
            ],
        )]);
        fake.set_work_request_errors(WR, &["nothing was created"]);

        let err = wait(&fake, ActionType::Created).await.unwrap_err();

        assert!(matches!(
            err,
            OciError::WorkRequestFailed { ref message, .. } if message == "nothing was created"
        ));
        assert_eq!(fake.count("ListWorkRequestErrors"), 1);
    }

    #[test]
    fn entity_type_matches_by_substring_ignoring_case() {
        let wr = fake_work_request(
            WR,
            OperationStatus::Succeeded,
            vec![affected("Deployment", ActionType::Created, "a")],
        );
        assert_eq!(affected_identifier(&wr, "deployment", &ActionType::Created), Some("a"));
        assert_eq!(affected_identifier(&wr, "DEPLOYMENT", &ActionType::Created), Some("a"));
        assert_eq!(affected_identifier(&wr, "deployment", &ActionType::Deleted), None);

        let wr = fake_work_request(
            WR,
            OperationStatus::Succeeded,
            vec![affected("SubDeploymentThing", ActionType::Created, "b")],
        );
        assert_eq!(affected_identifier(&wr, "deployment", &ActionType::Created), Some("b"));
        assert_eq!(affected_identifier(&wr, "connection", &ActionType::Created), None);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_while_in_progress() {
        let fake = FakeGoldenGate::new();
        fake.script_work_request(vec![fake_work_request(
            WR,
            OperationStatus::InProgress,
            vec![],
        )]);
        let start = Instant::now();
        let settings = WaitSettings::new(Duration::from_secs(60));

        let err = wait_for_work_request(
            &fake,
            WR,
            "deployment",
            ActionType::Created,
            settings,
            &policy(),
        )
        .await
        .unwrap_err();

        match err {
            OciError::Wait(inner) => {
                assert!(matches!(
                    *inner,
                    WaitError::Timeout { ref last_state, .. } if last_state == "IN_PROGRESS"
                ));
            }
            other => panic!("Expected a wait timeout, got {:?}", other),
        }
        // Bounded by the timeout plus at most one backoff step
        assert!(start.elapsed() <= Duration::from_secs(60 + 10));
        assert_eq!(fake.count("ListWorkRequestErrors"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let fake = FakeGoldenGate::new();
        fake.script_work_request(vec![fake_work_request(
            WR,
            OperationStatus::Succeeded,
            vec![affected("GoldenGateDeployment", ActionType::Deleted, DEPLOYMENT)],
        )]);
        fake.fail_next("GetWorkRequest", 429, "TooManyRequests");
        fake.fail_next("GetWorkRequest", 503, "ServiceUnavailable");

        let id = wait(&fake, ActionType::Deleted).await.unwrap();

        assert_eq!(id, DEPLOYMENT);
        assert_eq!(fake.count("GetWorkRequest"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_end_the_wait() {
        let fake = FakeGoldenGate::new();
        fake.fail_next("GetWorkRequest", 400, "InvalidParameter");

        let err = wait(&fake, ActionType::Created).await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(fake.count("GetWorkRequest"), 1);
    }
}
