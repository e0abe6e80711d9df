mod handle;

pub use handle::{
    CancelToken,
    TaskHandle,
};
