//! Connection-guarded retry and fallback machinery.
//!
//! Layers, leaves first: [`guard`] tracks the session, [`classifier`] turns
//! raw failures into an [`ErrorKind`], [`retry`] applies the [`RetryPolicy`],
//! and [`fallback`] collapses every outcome into a typed value.
pub mod classifier;
pub mod fallback;
pub mod guard;
pub mod policy;
pub mod retry;

pub use classifier::{classify, ErrorKind};
pub use fallback::{
    normalize, normalize_with_reason, FallbackReason, FallbackReport, OperationResult,
};
pub use guard::{ConnectionGuard, SessionLease};
pub use policy::RetryPolicy;
pub use retry::RetryExecutor;
