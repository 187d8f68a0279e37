//! Scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{CourseApi, ForwardRequest, ForwardStatus, PrivateMessage};
use crate::class_requests::{ClassRequest, TutorClass};
use crate::credentials::{Authorized, Credential, CredentialProvider};
use crate::error::{ApiError, CredentialError, LedgerError};
use crate::id::TutorId;
use crate::ledger::{LedgerStore, PendingResponse};

/// How the fake answers one forward
#[derive(Debug, Clone)]
pub enum ForwardScript {
    Status(ForwardStatus),
    /// Answer Accepted, but only after this long
    Hang(Duration),
    /// Transport failure
    Fail,
}

fn unscripted(endpoint: &str) -> ApiError {
    ApiError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "unscripted".to_string(),
    }
}

/// Course API fake answering from per-endpoint queues
///
/// An empty queue answers with a transport-style failure.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    forwards: Mutex<VecDeque<ForwardScript>>,
    course_requests: Mutex<VecDeque<Authorized<Vec<serde_json::Value>>>>,
    private_messages: Mutex<VecDeque<Authorized<Vec<PrivateMessage>>>>,
    classes: Mutex<VecDeque<Authorized<Vec<TutorClass>>>>,
    class_statuses: Mutex<VecDeque<Authorized<u16>>>,
    forwarded: Mutex<Vec<(ForwardRequest, Credential)>>,
    class_requests: Mutex<Vec<ClassRequest>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_forward(&self, script: ForwardScript) {
        self.forwards.lock().push_back(script);
    }

    pub fn push_course_requests(&self, answer: Authorized<Vec<serde_json::Value>>) {
        self.course_requests.lock().push_back(answer);
    }

    pub fn push_private_messages(&self, answer: Authorized<Vec<PrivateMessage>>) {
        self.private_messages.lock().push_back(answer);
    }

    pub fn push_classes(&self, answer: Authorized<Vec<TutorClass>>) {
        self.classes.lock().push_back(answer);
    }

    pub fn push_class_status(&self, answer: Authorized<u16>) {
        self.class_statuses.lock().push_back(answer);
    }

    pub fn forwarded(&self) -> Vec<ForwardRequest> {
        self.forwarded
            .lock()
            .iter()
            .map(|(forward, _)| forward.clone())
            .collect()
    }

    pub fn forward_tokens(&self) -> Vec<String> {
        self.forwarded
            .lock()
            .iter()
            .map(|(_, credential)| credential.token().to_string())
            .collect()
    }

    pub fn class_requests(&self) -> Vec<ClassRequest> {
        self.class_requests.lock().clone()
    }
}

#[async_trait]
impl CourseApi for ScriptedApi {
    async fn forward_response(
        &self,
        forward: &ForwardRequest,
        credential: &Credential,
    ) -> Result<ForwardStatus, ApiError> {
        self.forwarded
            .lock()
            .push((forward.clone(), credential.clone()));
        let script = self.forwards.lock().pop_front();

        match script {
            Some(ForwardScript::Status(status)) => Ok(status),
            Some(ForwardScript::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(ForwardStatus::Accepted)
            }
            Some(ForwardScript::Fail) | None => Err(unscripted("/tutor_demand")),
        }
    }

    async fn fetch_course_requests(
        &self,
        _credential: &Credential,
    ) -> Result<Authorized<Vec<serde_json::Value>>, ApiError> {
        let answer = self.course_requests.lock().pop_front();
        answer.ok_or_else(|| unscripted("/new_course_requests"))
    }

    async fn fetch_private_messages(
        &self,
        _credential: &Credential,
    ) -> Result<Authorized<Vec<PrivateMessage>>, ApiError> {
        let answer = self.private_messages.lock().pop_front();
        answer.ok_or_else(|| unscripted("/private_messages"))
    }

    async fn fetch_tutor_classes(
        &self,
        _tutor_id: &TutorId,
        _credential: &Credential,
    ) -> Result<Authorized<Vec<TutorClass>>, ApiError> {
        let answer = self.classes.lock().pop_front();
        answer.ok_or_else(|| unscripted("/tutor_classes"))
    }

    async fn submit_class_request(
        &self,
        request: &ClassRequest,
        _credential: &Credential,
    ) -> Result<Authorized<u16>, ApiError> {
        self.class_requests.lock().push(request.clone());
        let answer = self.class_statuses.lock().pop_front();
        answer.ok_or_else(|| unscripted(request.endpoint()))
    }
}

/// Credential provider that never fails, numbering each refresh
#[derive(Debug, Default)]
pub struct CountingCredentials {
    refreshes: AtomicUsize,
}

impl CountingCredentials {
    fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingCredentials {
    async fn current(&self) -> Result<Credential, CredentialError> {
        Ok(Credential::new(format!("token-{}", self.refreshes())))
    }

    async fn refresh(&self) -> Result<Credential, CredentialError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(format!("token-{}", n)))
    }
}

pub fn static_credentials() -> Arc<dyn CredentialProvider> {
    Arc::new(CountingCredentials::default())
}

/// Ledger store whose reads or writes can be made to fail
#[derive(Debug, Default)]
pub struct FailingStore {
    rows: Mutex<Vec<PendingResponse>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl FailingStore {
    pub fn unreadable() -> Self {
        let store = Self::default();
        store.fail_loads.store(true, Ordering::SeqCst);
        store
    }

    /// Readable store holding `rows` whose writes all fail
    pub fn read_only(rows: Vec<PendingResponse>) -> Self {
        let store = Self::default();
        *store.rows.lock() = rows;
        store.fail_saves.store(true, Ordering::SeqCst);
        store
    }

    pub fn rows(&self) -> Vec<PendingResponse> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    fn location(&self) -> String {
        "failing".to_string()
    }

    async fn load(&self) -> Result<Vec<PendingResponse>, LedgerError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(LedgerError::unavailable(
                "read",
                self.location(),
                std::io::Error::other("device not ready"),
            ));
        }
        Ok(self.rows.lock().clone())
    }

    async fn save(&self, rows: &[PendingResponse]) -> Result<(), LedgerError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::unavailable(
                "write",
                self.location(),
                std::io::Error::other("disk full"),
            ));
        }
        *self.rows.lock() = rows.to_vec();
        Ok(())
    }
}
