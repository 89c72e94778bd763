//! Request-scoped context store.
//!
//! Associates an opaque request identifier with a bag of named values so
//! that decoupled stages of a request pipeline can share ancillary data
//! (auth results, timers, parsed payloads) without extra parameters.
//!
//! The store is an explicit object shared through `Arc`. Bags are created
//! lazily on the first `set` and live until `clear` is called for their
//! request id; [`RequestScope`] and [`ClearHandler`] make that call
//! automatic.

pub mod config;
pub mod dump;
pub mod error;
pub mod handler;
pub mod scope;
pub mod store;

pub use config::StoreConfig;
pub use dump::{DumpEntry, DumpSink, TracingSink, WriterSink};
pub use error::StoreError;
pub use handler::{ClearHandler, RequestHandler};
pub use scope::RequestScope;
pub use store::{Bag, RequestContextStore};

/// Values stored in a bag. `Value::Null` is the null-like value.
pub use serde_json::Value;
