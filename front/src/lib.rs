//! Client for the todos resource.
//!
//! [`TodosClient`] performs the HTTP calls and reports every successful,
//! validated outcome as a [`TodoEvent`]; callers build their own view state
//! from the event stream.

pub mod cancel;
pub mod client;
pub mod error;
pub mod events;

pub use cancel::AnyOf;
pub use client::{ListQuery, TodoPatch, TodosClient};
pub use error::ClientError;
pub use events::{EventBus, TodoEvent};
