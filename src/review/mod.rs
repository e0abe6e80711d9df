use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use reqwest::Method;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

pub mod api;
pub mod keys;

pub use api::{
    ApiReply,
    ReviewTransport,
    WaniKaniClient,
};
pub use keys::{
    ApiKeyStore,
    JsonKeyStore,
    KeyPrompt,
    MemoryKeyStore,
};

use crate::{
    core::CompanionError,
    render::{
        Presenter,
        PresenterUpdate,
    },
};

pub const BUTTON_LABEL: &str = "Move to Review";
pub const BUTTON_CLASS: &str = "wk-button wk-button--default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub subject_id: u64,
}

#[derive(Debug, Deserialize)]
struct AssignmentResource {
    id: u64,
    data: AssignmentData,
}

#[derive(Debug, Deserialize)]
struct AssignmentData {
    subject_id: u64,
}

#[derive(Debug, Deserialize)]
struct AssignmentCollection {
    data: Vec<AssignmentResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewButton {
    pub label: String,
    pub class: String,
    pub assignment_id: u64,
}

/// Review API calls with the stored key and the re-entry prompt on refusal.
pub struct ReviewApi {
    transport: Arc<dyn ReviewTransport>,
    keys: Arc<dyn ApiKeyStore>,
    prompt: Arc<dyn KeyPrompt>,
}

impl ReviewApi {
    pub fn new(
        transport: Arc<dyn ReviewTransport>,
        keys: Arc<dyn ApiKeyStore>,
        prompt: Arc<dyn KeyPrompt>,
    ) -> Self {
        Self { transport, keys, prompt }
    }

    /// Sends the request; a non-200 reply offers one retry with a new key.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<serde_json::Value, CompanionError> {
        let key = self.keys.load();
        let reply = self.transport.send(method.clone(), path, key.as_deref()).await?;
        if reply.status == 200 {
            return Ok(serde_json::from_str(&reply.body)?);
        }

        warn!("Review API answered {} {} for {}", reply.status, reply.status_text, path);
        let refused = || CompanionError::Unauthorized {
            status: reply.status,
            reason: reply.status_text.clone(),
        };

        if !self.prompt.confirm_reentry(reply.status, &reply.status_text) {
            return Err(refused());
        }
        let Some(new_key) = self.prompt.request_key() else {
            return Err(refused());
        };
        self.keys.save(&new_key)?;

        let retry = self.transport.send(method, path, Some(&new_key)).await?;
        if retry.status != 200 {
            return Err(CompanionError::Unauthorized {
                status: retry.status,
                reason: retry.status_text,
            });
        }
        Ok(serde_json::from_str(&retry.body)?)
    }

    pub async fn lesson_assignments(&self) -> Result<Vec<Assignment>, CompanionError> {
        let value =
            self.request(Method::GET, "/assignments?immediately_available_for_lessons=true").await?;
        let collection: AssignmentCollection = serde_json::from_value(value)?;

        Ok(collection
            .data
            .into_iter()
            .map(|r| Assignment { id: r.id, subject_id: r.data.subject_id })
            .collect())
    }

    pub async fn start_assignment(&self, id: u64) -> Result<serde_json::Value, CompanionError> {
        self.request(Method::PUT, &format!("/assignments/{id}/start")).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverState {
    Unresolved,
    Eligible(Assignment),
}

#[derive(Debug)]
struct MoverInner {
    subject_id: Option<u64>,
    state: MoverState,
}

/// Offers to start the lesson for the subject on screen.
pub struct ReviewMover {
    api: ReviewApi,
    inner: Mutex<MoverInner>,
}

fn is_truthy(value: &serde_json::Value) -> bool {
    !matches!(value, serde_json::Value::Null | serde_json::Value::Bool(false))
}

impl ReviewMover {
    pub fn new(api: ReviewApi) -> Self {
        Self { api, inner: Mutex::new(MoverInner { subject_id: None, state: MoverState::Unresolved }) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MoverInner>, CompanionError> {
        self.inner.lock().map_err(|e| CompanionError::Custom(format!("mover state poisoned: {e}")))
    }

    pub fn state(&self) -> MoverState {
        self.lock().map(|inner| inner.state).unwrap_or(MoverState::Unresolved)
    }

    pub fn button(&self) -> Option<ReviewButton> {
        match self.state() {
            MoverState::Eligible(assignment) => Some(ReviewButton {
                label: BUTTON_LABEL.to_string(),
                class: BUTTON_CLASS.to_string(),
                assignment_id: assignment.id,
            }),
            MoverState::Unresolved => None,
        }
    }

    /// Called whenever an item page renders. Looks the subject up once per
    /// subject id; a lookup finishing after the page moved on is dropped.
    pub async fn show_subject(&self, subject_id: u64) -> Result<Option<ReviewButton>, CompanionError> {
        {
            let mut inner = self.lock()?;
            if inner.subject_id == Some(subject_id) {
                drop(inner);
                return Ok(self.button());
            }
            inner.subject_id = Some(subject_id);
            inner.state = MoverState::Unresolved;
        }

        let assignments = self.api.lesson_assignments().await?;
        let found = assignments.into_iter().find(|a| a.subject_id == subject_id);
        debug!("Subject {} lesson assignment: {:?}", subject_id, found);

        {
            let mut inner = self.lock()?;
            if inner.subject_id != Some(subject_id) {
                return Ok(None);
            }
            if let Some(assignment) = found {
                inner.state = MoverState::Eligible(assignment);
            }
        }

        Ok(self.button())
    }

    /// Renders the button for `subject_id` through the presenter.
    pub async fn present_subject(
        &self,
        subject_id: u64,
        presenter: &dyn Presenter,
    ) -> Result<(), CompanionError> {
        let button = self.show_subject(subject_id).await?;
        if self.lock()?.subject_id != Some(subject_id) {
            debug!("Subject {} was replaced before its lookup finished", subject_id);
            return Ok(());
        }
        presenter.present(PresenterUpdate::ReviewButton { subject_id, button });
        Ok(())
    }

    /// Starts the eligible assignment and reloads on a truthy answer.
    pub async fn click(&self, presenter: &dyn Presenter) -> Result<bool, CompanionError> {
        let MoverState::Eligible(assignment) = self.state() else {
            return Ok(false);
        };

        let result = self.api.start_assignment(assignment.id).await?;
        if !is_truthy(&result) {
            return Ok(false);
        }

        info!("Started assignment {} for subject {}", assignment.id, assignment.subject_id);
        presenter.reload();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicBool,
        AtomicUsize,
        Ordering,
    };

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        valid_key: String,
        assignments: serde_json::Value,
        calls: Mutex<Vec<(Method, String, Option<String>)>>,
        hold_first: bool,
        entered: Notify,
        release: Notify,
    }

    impl FakeTransport {
        fn new(valid_key: &str) -> Self {
            Self {
                valid_key: valid_key.to_string(),
                assignments: json!({
                    "object": "collection",
                    "data": [
                        { "id": 80463006, "object": "assignment", "data": { "subject_id": 2467 } },
                        { "id": 80463007, "object": "assignment", "data": { "subject_id": 2468 } }
                    ]
                }),
                ..Self::default()
            }
        }

        /// Parks the first request until `release` is notified.
        fn holding_first(valid_key: &str) -> Self {
            Self { hold_first: true, ..Self::new(valid_key) }
        }

        fn calls(&self) -> Vec<(Method, String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReviewTransport for FakeTransport {
        async fn send(
            &self,
            method: Method,
            path: &str,
            api_key: Option<&str>,
        ) -> Result<ApiReply, CompanionError> {
            self.calls.lock().unwrap().push((
                method.clone(),
                path.to_string(),
                api_key.map(str::to_string),
            ));

            let first = self.calls.lock().unwrap().len() == 1;
            if self.hold_first && first {
                self.entered.notify_one();
                self.release.notified().await;
            }

            if api_key != Some(self.valid_key.as_str()) {
                return Ok(ApiReply {
                    status: 401,
                    status_text: "Unauthorized".to_string(),
                    body: r#"{"error":"Unauthorized","code":401}"#.to_string(),
                });
            }

            let body = if method == Method::PUT {
                json!({ "id": 80463006, "data": { "started_at": "2026-10-19T00:00:00Z" } })
            } else {
                self.assignments.clone()
            };
            Ok(ApiReply { status: 200, status_text: "OK".to_string(), body: body.to_string() })
        }
    }

    struct ScriptedPrompt {
        confirm: bool,
        key: Option<String>,
        asked: AtomicUsize,
    }

    impl ScriptedPrompt {
        fn new(confirm: bool, key: Option<&str>) -> Self {
            Self { confirm, key: key.map(str::to_string), asked: AtomicUsize::new(0) }
        }
    }

    impl KeyPrompt for ScriptedPrompt {
        fn confirm_reentry(&self, _status: u16, _status_text: &str) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.confirm
        }

        fn request_key(&self) -> Option<String> {
            self.key.clone()
        }
    }

    #[derive(Default)]
    struct ReloadPresenter {
        reloaded: AtomicBool,
        updates: Mutex<Vec<PresenterUpdate>>,
    }

    impl Presenter for ReloadPresenter {
        fn present(&self, update: PresenterUpdate) {
            self.updates.lock().unwrap().push(update);
        }

        fn reload(&self) {
            self.reloaded.store(true, Ordering::SeqCst);
        }
    }

    fn mover(
        transport: Arc<FakeTransport>,
        keys: Arc<MemoryKeyStore>,
        prompt: Arc<ScriptedPrompt>,
    ) -> ReviewMover {
        ReviewMover::new(ReviewApi::new(transport, keys, prompt))
    }

    #[tokio::test]
    async fn test_no_assignment_no_button() {
        let transport = Arc::new(FakeTransport::new("good"));
        let mover = mover(
            transport.clone(),
            Arc::new(MemoryKeyStore::with_key("good")),
            Arc::new(ScriptedPrompt::new(false, None)),
        );

        assert_eq!(mover.show_subject(9999).await.unwrap(), None);
        assert_eq!(mover.state(), MoverState::Unresolved);

        // Same subject again: no second lookup
        mover.show_subject(9999).await.unwrap();
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_button_and_click_reload() {
        let transport = Arc::new(FakeTransport::new("good"));
        let mover = mover(
            transport.clone(),
            Arc::new(MemoryKeyStore::with_key("good")),
            Arc::new(ScriptedPrompt::new(false, None)),
        );
        let presenter = ReloadPresenter::default();

        mover.present_subject(2467, &presenter).await.unwrap();
        let button = mover.button().unwrap();
        assert_eq!(button.assignment_id, 80463006);
        assert_eq!(button.label, BUTTON_LABEL);
        assert_eq!(
            presenter.updates.lock().unwrap()[0],
            PresenterUpdate::ReviewButton { subject_id: 2467, button: Some(button) }
        );

        assert!(mover.click(&presenter).await.unwrap());
        assert!(presenter.reloaded.load(Ordering::SeqCst));

        let calls = transport.calls();
        assert_eq!(calls[0].1, "/assignments?immediately_available_for_lessons=true");
        assert_eq!(
            calls[1],
            (Method::PUT, "/assignments/80463006/start".to_string(), Some("good".to_string()))
        );
    }

    #[tokio::test]
    async fn test_subject_change_resets_state() {
        let transport = Arc::new(FakeTransport::new("good"));
        let mover = mover(
            transport,
            Arc::new(MemoryKeyStore::with_key("good")),
            Arc::new(ScriptedPrompt::new(false, None)),
        );

        assert!(mover.show_subject(2467).await.unwrap().is_some());
        assert!(mover.show_subject(1).await.unwrap().is_none());
        assert_eq!(mover.state(), MoverState::Unresolved);

        let presenter = ReloadPresenter::default();
        assert!(!mover.click(&presenter).await.unwrap());
        assert!(!presenter.reloaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_replaced_subject_lookup_is_not_presented() {
        let transport = Arc::new(FakeTransport::holding_first("good"));
        let mover = mover(
            transport.clone(),
            Arc::new(MemoryKeyStore::with_key("good")),
            Arc::new(ScriptedPrompt::new(false, None)),
        );
        let presenter = ReloadPresenter::default();

        let (stale, current) = tokio::join!(mover.present_subject(2467, &presenter), async {
            transport.entered.notified().await;
            let current = mover.show_subject(2468).await;
            transport.release.notify_one();
            current
        });

        stale.unwrap();
        assert_eq!(current.unwrap().map(|b| b.assignment_id), Some(80463007));
        assert!(presenter.updates.lock().unwrap().is_empty());
        assert_eq!(mover.button().map(|b| b.assignment_id), Some(80463007));
    }

    #[tokio::test]
    async fn test_bad_key_prompts_and_retries_once() {
        let transport = Arc::new(FakeTransport::new("good"));
        let keys = Arc::new(MemoryKeyStore::with_key("stale"));
        let prompt = Arc::new(ScriptedPrompt::new(true, Some("good")));
        let mover = mover(transport.clone(), keys.clone(), prompt.clone());

        assert!(mover.show_subject(2467).await.unwrap().is_some());
        assert_eq!(keys.load().as_deref(), Some("good"));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_second_refusal_is_not_retried() {
        let transport = Arc::new(FakeTransport::new("good"));
        let prompt = Arc::new(ScriptedPrompt::new(true, Some("also-wrong")));
        let mover = mover(
            transport.clone(),
            Arc::new(MemoryKeyStore::with_key("stale")),
            prompt.clone(),
        );

        let result = mover.show_subject(2467).await;
        assert!(matches!(result, Err(CompanionError::Unauthorized { status: 401, .. })));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_declining_aborts() {
        let transport = Arc::new(FakeTransport::new("good"));
        let keys = Arc::new(MemoryKeyStore::default());
        let mover = mover(transport.clone(), keys.clone(), Arc::new(ScriptedPrompt::new(false, None)));

        let result = mover.show_subject(2467).await;
        assert!(matches!(result, Err(CompanionError::Unauthorized { .. })));
        assert_eq!(keys.load(), None);
        assert_eq!(transport.calls().len(), 1);
    }
}
