use serde::Serialize;

use super::{
    AutoplayChain,
    RenderModel,
};
use crate::review::ReviewButton;

/// What the presentation layer is asked to do. It mirrors the page-injection
/// contract: content is appended under the reading section, `Sentences` with
/// `model: None` removes the insertion point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "update", rename_all = "snake_case")]
pub enum PresenterUpdate {
    /// Page stylesheet, sent once before the first item.
    Stylesheet { css: String },
    /// A new item is coming: remove rendered sentences and hidden chains.
    Clear,
    Sentences { item_id: u64, model: Option<RenderModel> },
    Autoplay { item_id: u64, chain: AutoplayChain },
    ReviewButton { subject_id: u64, button: Option<ReviewButton> },
}

pub trait Presenter: Send + Sync {
    fn present(&self, update: PresenterUpdate);

    /// Reloads the page after a lesson has been moved to review.
    fn reload(&self) {}
}
