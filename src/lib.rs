//! ElimuBuddy client session library.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal's authentication session: who is signed in, which tokens they
//! hold, and how those survive restarts. [`session::SessionManager`] owns the
//! state; [`api`] talks to the backend; [`storage`] is the durable mirror.

pub mod api;
pub mod config;
pub mod language;
pub mod models;
pub mod navigation;
pub mod session;
pub mod storage;

pub use api::http::HttpAuthApi;
pub use api::{ApiError, AuthApi, LoginGrant};
pub use config::ClientConfig;
pub use language::{Language, LanguagePreference};
pub use models::{Session, StudentInfo, TokenPair, UserProfile};
pub use navigation::{LogNavigator, Navigator, Route};
pub use session::{SessionError, SessionManager};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
