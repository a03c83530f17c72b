//! Client core of the eFi Navigator portfolio simulator dashboard.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Profiles   │────►│  DemoStore   │────►│   Metrics    │
//! │  (registry)  │     │  (reducer)   │     │  (pure fns)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │ NavigatorApi │◄───►│  Transcript  │
//!                      │ (HTTP, chat) │     │   (SQLite)   │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The store is the only mutation path. Metrics are recomputed from whatever
//! the store holds; the remote simulator is optional and may be slow or absent.

pub mod api;
pub mod chat;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod profiles;
pub mod store;
pub mod transcript;
