//! Submission coordinator
//!
//! Drives a tutor's course answer from selection to submission or
//! cancellation. Every operation for one tutor runs under that tutor's lock,
//! so a submit can't interleave with a cancel or a new selection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::announcement::decode_option_value;
use crate::api::{CourseApi, ForwardRequest, ForwardStatus};
use crate::credentials::{Authorized, CredentialProvider, with_credential_refresh};
use crate::error::{ApiError, LedgerError};
use crate::id::TutorId;
use crate::ledger::{PendingResponse, ResponseLedger};

pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Submit,
    Cancel,
}

/// What happened to a tutor's request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Recorded { response: PendingResponse },
    AlreadyPending { existing: PendingResponse },
    Accepted { labels: Vec<String> },
    Taken { labels: Vec<String> },
    Cancelled { labels: Vec<String> },
    NothingPending { action: PendingAction },
    ServerError,
    StorageUnavailable,
    InvalidSelection { reason: String },
}

impl From<LedgerError> for Outcome {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::AlreadyPending { existing } => Self::AlreadyPending {
                existing: *existing,
            },
            LedgerError::InvalidSelection { reason } => Self::InvalidSelection { reason },
            LedgerError::StorageUnavailable { .. } => {
                error!("Response ledger unavailable: {}", error);
                Self::StorageUnavailable
            }
        }
    }
}

pub struct SubmissionCoordinator {
    ledger: Arc<ResponseLedger>,
    api: Arc<dyn CourseApi>,
    credentials: Arc<dyn CredentialProvider>,
    forward_timeout: Duration,
    tutor_locks: DashMap<TutorId, Arc<tokio::sync::Mutex<()>>>,
}

impl fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("ledger", &self.ledger)
            .field("api", &self.api)
            .field("forward_timeout", &self.forward_timeout)
            .field("active_tutors", &self.tutor_locks.len())
            .finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    pub fn new(
        ledger: Arc<ResponseLedger>,
        api: Arc<dyn CourseApi>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            ledger,
            api,
            credentials,
            forward_timeout: DEFAULT_FORWARD_TIMEOUT,
            tutor_locks: DashMap::new(),
        }
    }

    pub fn with_forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = timeout;
        self
    }

    pub fn ledger(&self) -> &Arc<ResponseLedger> {
        &self.ledger
    }

    /// Run `op` while holding the tutor's lock
    async fn serialized<F, Fut>(&self, tutor_id: &TutorId, op: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let lock = self.tutor_locks.entry(tutor_id.clone()).or_default().clone();
        let outcome = {
            let _guard = lock.lock().await;
            op().await
        };
        drop(lock);

        // Only the map holds it now, nobody is waiting
        self.tutor_locks
            .remove_if(tutor_id, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    /// Record the options a tutor picked from an announcement menu
    ///
    /// Each raw value is `announcementId,optionId[,label]`; all of them must
    /// belong to the same announcement.
    pub async fn on_options_selected(&self, tutor_id: &TutorId, raw_values: &[String]) -> Outcome {
        let decoded = match raw_values
            .iter()
            .map(|raw| decode_option_value(raw))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(decoded) => decoded,
            Err(e) => return e.into(),
        };

        let Some(announcement_id) = decoded.first().map(|d| d.announcement_id.clone()) else {
            return LedgerError::invalid_selection("no options selected").into();
        };
        if decoded.iter().any(|d| d.announcement_id != announcement_id) {
            return LedgerError::invalid_selection("options from more than one announcement")
                .into();
        }

        let (option_ids, labels) = decoded
            .into_iter()
            .map(|d| (d.option_id, d.label))
            .unzip();
        let response = PendingResponse::new(tutor_id.clone(), announcement_id, option_ids, labels);

        self.serialized(tutor_id, || async {
            match self.ledger.record_selection(response).await {
                Ok(response) => Outcome::Recorded { response },
                Err(e) => e.into(),
            }
        })
        .await
    }

    /// Forward the tutor's pending response upstream
    pub async fn on_submit(&self, tutor_id: &TutorId) -> Outcome {
        self.serialized(tutor_id, || self.submit_locked(tutor_id)).await
    }

    async fn submit_locked(&self, tutor_id: &TutorId) -> Outcome {
        let pending = match self.ledger.find_pending(tutor_id).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                return Outcome::NothingPending {
                    action: PendingAction::Submit,
                };
            }
            Err(e) => return e.into(),
        };

        let forward = ForwardRequest {
            announcement_id: pending.announcement_id.clone(),
            tutor_id: tutor_id.clone(),
            selected_option_ids: pending.selected_option_ids.clone(),
        };

        let status = with_credential_refresh(self.credentials.as_ref(), |credential| {
            let api = self.api.clone();
            let forward = forward.clone();
            let timeout = self.forward_timeout;
            async move {
                let call = api.forward_response(&forward, &credential);
                let status = tokio::time::timeout(timeout, call)
                    .await
                    .map_err(|_| ApiError::Timeout {
                        endpoint: format!("/tutor_demand/{}", forward.announcement_id),
                        seconds: timeout.as_secs(),
                    })??;
                Ok(match status {
                    ForwardStatus::CredentialExpired => Authorized::Expired,
                    status => Authorized::Done(status),
                })
            }
        })
        .await;

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Forwarding response of tutor {} for {} failed: {}",
                    tutor_id, pending.announcement_id, e
                );
                return Outcome::ServerError;
            }
        };

        let resolved = match status {
            ForwardStatus::Accepted | ForwardStatus::Taken => status,
            _ => {
                warn!(
                    "Course API refused the response of tutor {} for {}, keeping it",
                    tutor_id, pending.announcement_id
                );
                return Outcome::ServerError;
            }
        };

        let labels = match self.ledger.clear(tutor_id).await {
            Ok(Some(cleared)) => cleared.selected_labels,
            Ok(None) => pending.selected_labels,
            Err(e) => return e.into(),
        };

        info!(
            "Response of tutor {} for {} resolved as {:?}",
            tutor_id, pending.announcement_id, resolved
        );
        if resolved == ForwardStatus::Accepted {
            Outcome::Accepted { labels }
        } else {
            Outcome::Taken { labels }
        }
    }

    /// Drop the tutor's pending response without sending it
    pub async fn on_cancel(&self, tutor_id: &TutorId) -> Outcome {
        self.serialized(tutor_id, || async {
            match self.ledger.clear(tutor_id).await {
                Ok(Some(cleared)) => Outcome::Cancelled {
                    labels: cleared.selected_labels,
                },
                Ok(None) => Outcome::NothingPending {
                    action: PendingAction::Cancel,
                },
                Err(e) => e.into(),
            }
        })
        .await
    }

    /// The tutor's pending response, read-only
    pub async fn pending(
        &self,
        tutor_id: &TutorId,
    ) -> Result<Option<PendingResponse>, LedgerError> {
        self.ledger.find_pending(tutor_id).await
    }
}
