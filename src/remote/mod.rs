//! Switchcloud API integration module.
//!
//! This module provides the transport to the remote API, the bearer-token
//! decorator, the per-kind adapters that translate objects to requests, and
//! an in-memory remote for tests and dry runs.

mod adapter;
mod auth;
mod member;
mod memory;
mod project;
mod transport;
mod types;

pub use adapter::{RemoteAdapter, Route};
pub use auth::AuthenticatedTransport;
pub use member::{MEMBER_IDENTITY, ProjectMemberAdapter};
pub use memory::InMemoryRemote;
pub use project::{PROJECTS_PATH, ProjectAdapter, ProjectLookup};
pub use transport::{
    DEFAULT_TIMEOUT_SECS, HttpTransport, Method, STATUS_CREATED, STATUS_NO_CONTENT,
    STATUS_NOT_FOUND, STATUS_OK, Transport, TransportRequest, TransportResponse,
};
pub use types::{
    CreateMemberRequest, CreateProjectRequest, MemberLinks, MemberUser, ProjectMemberRecord,
    ProjectRecord,
};

pub(crate) use transport::dispatch;
