/*
[INPUT]:  Auth outcomes, wallet events, refresh failures
[OUTPUT]: Persisted session state and application-wide signals
[POS]:    Session layer - shared state and notifications
[UPDATE]: When session state shape or global events change
*/

pub mod events;
pub mod persist;
pub mod store;

pub use events::{Notice, Notifier, SessionEvent, SessionEvents};
pub use persist::{PERSIST_KEY, SessionFile};
pub use store::{SessionSnapshot, SessionStore};
