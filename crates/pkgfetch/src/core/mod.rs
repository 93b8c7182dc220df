//! Pure decisions for a fetch call.
//!
//! Response classification, mirror cursoring and URL rebasing, retry
//! accounting and redirect origin checks. None of these functions perform
//! I/O, so the orchestrator's control flow can be tested without a network.

mod classify;
mod retry;
mod selector;
mod validation;

pub use classify::{Disposition, classify, is_success};
pub use retry::{RetryBudget, retry_delay};
pub use selector::{MirrorCursor, MirrorSelector, rebase_url, service_name, strip_scheme_prefix};
pub use validation::is_same_origin;
