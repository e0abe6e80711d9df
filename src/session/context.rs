use std::sync::Arc;

use crate::core::{
    tasks::CancelToken,
    CompanionError,
    CurrentItem,
};

/// The item a resolution task was started for, plus the token that marks it
/// superseded. Resolvers check it after every await before touching state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    item: Arc<CurrentItem>,
    token: CancelToken,
}

impl SessionContext {
    pub fn new(item: Arc<CurrentItem>) -> Self {
        Self::with_token(item, CancelToken::new())
    }

    pub fn with_token(item: Arc<CurrentItem>, token: CancelToken) -> Self {
        Self { item, token }
    }

    pub fn item(&self) -> &CurrentItem {
        &self.item
    }

    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn ensure_current(&self) -> Result<(), CompanionError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(CompanionError::Cancelled)
        }
    }
}
