//! Client-side session and data synchronisation for the notes service.
//!
//! * [`session`]: auth token lifecycle, persistence and hydration
//! * [`api`]: HTTP gateway with bearer-token middleware
//! * [`query`]: the coalescing, invalidation-driven notes cache
//! * [`flows`]: validated mutations and sign-in/sign-up

pub mod api;
pub mod app;
pub mod config;
pub mod flows;
pub mod query;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

pub use app::AppState;
pub use config::Config;
pub use notes_types::{Note, NoteDraft, User};
