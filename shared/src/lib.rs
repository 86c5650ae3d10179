pub mod logging;
pub mod storage;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
