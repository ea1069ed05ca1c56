//! Unsubscribe workflow.
//!
//! # State Machine
//! ```text
//! token absent            → NoToken
//! verify fails            → Invalid | Expired
//! no (id, email) match    → UserNotFound
//! user.unsubscribed       → AlreadyUnsubscribed
//! confirm=no              → Declined
//! confirm absent          → AwaitingConfirmation
//! confirm=yes             → flag user, append log, mark token used → Confirmed
//! ```
//!
//! Every state is terminal for a single request. A storage fault at any
//! step is a `WorkflowError`, kept apart from the outcomes above.

pub mod engine;
pub mod outcome;

pub use engine::{UnsubscribeRequest, UnsubscribeWorkflow};
pub use outcome::{Confirmation, Outcome, StorageOperation, WorkflowError};
