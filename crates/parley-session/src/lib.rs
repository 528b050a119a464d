//! # Parley Session Store
//!
//! Ordered, append-only conversation history keyed by
//! `(app_id, user_id, session_id)`.
//!
//! Sessions are independent of each other. Within one session every append
//! goes through a per-key lock, so a turn that holds a [`SessionGuard`] sees
//! and produces a totally ordered history while turns on other sessions run
//! concurrently.
//!
//! ```rust
//! use parley_core::{Message, SessionKey};
//! use parley_session::InMemorySessionStore;
//!
//! # tokio_test::block_on(async {
//! let store = InMemorySessionStore::new();
//! let key = SessionKey::parse("weather_app", "user_1", "session_001").unwrap();
//!
//! store.create_session(&key).unwrap();
//! store.append(&key, Message::user("Hello there!")).await.unwrap();
//!
//! let history = store.history(&key).await.unwrap();
//! assert_eq!(history[0].text(), "Hello there!");
//! # });
//! ```

pub mod session;
pub mod store;

pub use session::Session;
pub use store::{InMemorySessionStore, SessionGuard};
