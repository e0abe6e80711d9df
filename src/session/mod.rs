use std::{
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::mpsc,
    time::sleep,
};
use tracing::{
    debug,
    info,
};

mod context;
pub mod store;

pub use context::SessionContext;
pub use store::{
    current_item_key,
    ItemStore,
    MemoryStore,
    StoreEvent,
};

use crate::{
    anki::{
        self,
        NoteBridge,
    },
    core::{
        tasks::{
            CancelToken,
            TaskHandle,
        },
        CompanionError,
        CurrentItem,
        Sentence,
        SessionMode,
    },
    immersion::{
        self,
        ExampleLookup,
    },
    render::{
        compose,
        stylesheet,
        AutoplayTracker,
        Presenter,
        PresenterUpdate,
    },
    settings::Settings,
};

/// Everything a resolution task needs; cheap to clone into each task.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn ItemStore>,
    pub bridge: Option<Arc<dyn NoteBridge>>,
    pub lookup: Option<Arc<dyn ExampleLookup>>,
    pub presenter: Arc<dyn Presenter>,
    pub settings: Arc<Settings>,
}

/// Per-item state: the sentences gathered so far and the chains started.
struct ItemSession {
    ctx: SessionContext,
    sentences: Vec<Sentence>,
    tracker: AutoplayTracker,
}

impl ItemSession {
    fn new(ctx: SessionContext) -> Self {
        Self { ctx, sentences: Vec::new(), tracker: AutoplayTracker::new() }
    }

    fn render(&mut self, settings: &Settings, presenter: &dyn Presenter) {
        if !self.ctx.is_current() {
            return;
        }

        let item = self.ctx.item();
        let composition =
            compose(item, &self.sentences, settings, &mut self.tracker, &mut rand::rng());

        if let Some(chain) = composition.autoplay {
            presenter.present(PresenterUpdate::Autoplay { item_id: item.id, chain });
        }
        presenter.present(PresenterUpdate::Sentences { item_id: item.id, model: composition.model });
    }
}

/// Runs both sentence sources for one item, rendering after each.
async fn resolve_item(deps: SessionDeps, ctx: SessionContext) {
    let settings = deps.settings.clone();
    let mut session = ItemSession::new(ctx.clone());

    if let Some(bridge) = &deps.bridge {
        match anki::resolver::resolve_sentences(bridge.as_ref(), &ctx, &settings).await {
            Ok(sentences) if !sentences.is_empty() => {
                session.sentences.extend(sentences);
                session.render(&settings, deps.presenter.as_ref());
            }
            Ok(_) => {}
            Err(CompanionError::Cancelled) => return,
            Err(e) => debug!("AnkiConnect lookup for {} failed: {}", ctx.item().word, e),
        }
    }

    if let Some(lookup) = &deps.lookup {
        match immersion::resolve_sentences(lookup.as_ref(), &ctx, &settings).await {
            Ok(sentences) => {
                session.sentences.extend(sentences);
                session.render(&settings, deps.presenter.as_ref());
            }
            Err(CompanionError::Cancelled) => {}
            Err(e) => debug!("ImmersionKit lookup for {} failed: {}", ctx.item().word, e),
        }
    }
}

/// Watches the store for item changes and drives one resolution task per item.
pub struct AutoplayController {
    deps: SessionDeps,
    mode: SessionMode,
    current: Option<TaskHandle>,
}

impl AutoplayController {
    pub fn new(deps: SessionDeps, mode: SessionMode) -> Self {
        Self { deps, mode, current: None }
    }

    /// Supersedes the running item and schedules a fresh read of the store.
    pub fn on_new_item(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.deps.presenter.present(PresenterUpdate::Clear);

        let token = CancelToken::new();
        let deps = self.deps.clone();
        let mode = self.mode;
        let task_token = token.clone();

        let join_handle = tokio::spawn(async move {
            // Give the host page time to finish its own update
            sleep(Duration::from_millis(deps.settings.debounce_ms)).await;
            if task_token.is_cancelled() {
                return;
            }

            let key = current_item_key(mode, deps.store.as_ref());
            let Some(item) = deps.store.get(key).as_ref().and_then(CurrentItem::from_store_value)
            else {
                debug!("No vocabulary item under {}", key);
                return;
            };

            info!(id = item.id, word = %item.word, "New vocabulary item");
            let ctx = SessionContext::with_token(Arc::new(item), task_token);
            resolve_item(deps, ctx).await;
        });

        self.current = Some(TaskHandle::new(token, join_handle));
    }

    /// Handles store events until the channel closes, then waits for the last
    /// item's task.
    pub async fn run(mut self, mut events: mpsc::Receiver<StoreEvent>) {
        if !self.mode.runs_autoplay() {
            debug!("Autoplay is not active in {:?} mode", self.mode);
            return;
        }

        self.deps.presenter.present(PresenterUpdate::Stylesheet { css: stylesheet() });
        self.on_new_item();
        while let Some(event) = events.recv().await {
            if event.is_item_change() {
                self.on_new_item();
            }
        }

        if let Some(handle) = self.current.take() {
            handle.join().await;
        }
    }
}
