//! Gateway client: transport, session, directories and query lifecycle.

pub mod client;
pub mod cookies;
pub mod directory;
pub mod http;
pub mod logging;
pub mod models;
pub mod query;
pub mod session;

pub use client::{ClientOptions, DEFAULT_API_PREFIX, TlsOptions, UsageClient};
pub use cookies::{Cookie, SessionStore};
pub use directory::{Collectors, Orchestrators};
pub use http::Transport;
pub use models::{Orchestrator, QueryStatus, RobotOutput, UsageCollection, UsageCollector};
pub use query::{CompletedQuery, PollPolicy, Queries, QueryId};
pub use session::Credentials;
