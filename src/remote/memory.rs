//! In-memory stand-in for the Switchcloud API.
//!
//! Each instance owns its own store, so tests never share state. Every
//! request is recorded, including ones that fail.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::project::PROJECTS_PATH;
use super::transport::{
    Method, STATUS_CREATED, STATUS_NO_CONTENT, STATUS_NOT_FOUND, STATUS_OK, Transport,
    TransportRequest, TransportResponse,
};
use super::types::{
    CreateMemberRequest, CreateProjectRequest, MemberLinks, MemberUser, ProjectMemberRecord,
    ProjectRecord,
};
use crate::error::Result;

#[derive(Debug, Default)]
struct Store {
    projects: BTreeMap<String, ProjectRecord>,
    members: BTreeMap<String, ProjectMemberRecord>,
    requests: Vec<TransportRequest>,
}

/// A fake remote API that keeps projects and members in memory.
#[derive(Debug)]
pub struct InMemoryRemote {
    organisation_id: String,
    store: Mutex<Store>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    /// Creates an empty remote with a fresh organisation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            organisation_id: Uuid::new_v4().to_string(),
            store: Mutex::new(Store::default()),
        }
    }

    /// Seeds a project.
    #[must_use]
    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.store
            .get_mut()
            .projects
            .insert(project.id.clone(), project);
        self
    }

    /// Returns the organisation assigned to created projects.
    #[must_use]
    pub fn organisation_id(&self) -> &str {
        &self.organisation_id
    }

    /// Returns every request received so far.
    pub async fn requests(&self) -> Vec<TransportRequest> {
        self.store.lock().await.requests.clone()
    }

    /// Returns the number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.store.lock().await.requests.len()
    }

    /// Returns a stored project.
    pub async fn project(&self, id: &str) -> Option<ProjectRecord> {
        self.store.lock().await.projects.get(id).cloned()
    }

    /// Returns a stored member.
    pub async fn member(&self, id: &str) -> Option<ProjectMemberRecord> {
        self.store.lock().await.members.get(id).cloned()
    }

    /// Removes a member behind the caller's back, as another client would.
    pub async fn remove_member(&self, id: &str) -> Option<ProjectMemberRecord> {
        self.store.lock().await.members.remove(id)
    }

    /// Removes a project and its members behind the caller's back.
    pub async fn remove_project(&self, id: &str) -> Option<ProjectRecord> {
        let mut store = self.store.lock().await;
        store.members.retain(|_, m| m.project_id != id);
        store.projects.remove(id)
    }

    fn handle(&self, store: &mut Store, request: &TransportRequest) -> TransportResponse {
        let Some(rest) = request.path.strip_prefix(PROJECTS_PATH) else {
            return not_found("Not found");
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, []) => json(STATUS_OK, &store.projects.values().collect::<Vec<_>>()),
            (Method::Post, []) => self.create_project(store, request),
            (Method::Get, [id]) => match store.projects.get(*id) {
                Some(project) => json(STATUS_OK, project),
                None => not_found("Project not found"),
            },
            (Method::Post, [project_id, "members"]) => {
                if !store.projects.contains_key(*project_id) {
                    return not_found("Project not found");
                }
                create_member(store, project_id, request)
            }
            (Method::Get, [project_id, "members", id]) => {
                match find_member(store, project_id, id) {
                    Ok(member) => json(STATUS_OK, member),
                    Err(response) => response,
                }
            }
            (Method::Delete, [project_id, "members", id]) => {
                if let Err(response) = find_member(store, project_id, id) {
                    return response;
                }
                store.members.remove(*id);
                TransportResponse::new(STATUS_NO_CONTENT, Vec::new())
            }
            _ => TransportResponse::new(405, "Method not allowed\n"),
        }
    }

    fn create_project(&self, store: &mut Store, request: &TransportRequest) -> TransportResponse {
        let body: CreateProjectRequest = match parse_body(request) {
            Ok(body) => body,
            Err(response) => return response,
        };
        let now = timestamp();
        let project = ProjectRecord {
            id: Uuid::new_v4().to_string(),
            name: body.name,
            description: body.description,
            organisation_id: self.organisation_id.clone(),
            archived: false,
            archived_at: None,
            created_at: now.clone(),
            updated_at: now,
        };
        store.projects.insert(project.id.clone(), project.clone());
        json(STATUS_CREATED, &project)
    }
}

fn create_member(store: &mut Store, project_id: &str, request: &TransportRequest) -> TransportResponse {
    let body: CreateMemberRequest = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let user_id = body
        .user_id
        .unwrap_or_else(|| format!("user-{}", Uuid::new_v4().simple()));
    let email = body
        .email
        .unwrap_or_else(|| format!("{user_id}@example.com"));
    let display_name = email.split('@').next().unwrap_or_default().to_string();
    let now = timestamp();

    let member = ProjectMemberRecord {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        user_id: user_id.clone(),
        created_at: Some(now.clone()),
        updated_at: Some(now),
        links: Some(MemberLinks {
            project: format!("{PROJECTS_PATH}/{project_id}"),
        }),
        user: MemberUser {
            id: user_id,
            email,
            display_name,
        },
    };
    store.members.insert(member.id.clone(), member.clone());
    json(STATUS_CREATED, &member)
}

fn find_member<'a>(
    store: &'a Store,
    project_id: &str,
    id: &str,
) -> std::result::Result<&'a ProjectMemberRecord, TransportResponse> {
    if !store.projects.contains_key(project_id) {
        return Err(not_found("Project not found"));
    }
    store
        .members
        .get(id)
        .filter(|m| m.project_id == project_id)
        .ok_or_else(|| not_found("Project member not found"))
}

fn parse_body<T: serde::de::DeserializeOwned>(
    request: &TransportRequest,
) -> std::result::Result<T, TransportResponse> {
    let body = request.body.as_deref().unwrap_or_default();
    serde_json::from_slice(body)
        .map_err(|e| TransportResponse::new(400, format!("Invalid request body: {e}\n")))
}

fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> TransportResponse {
    match serde_json::to_vec(value) {
        Ok(body) => TransportResponse::new(status, body),
        Err(e) => TransportResponse::new(500, format!("Failed to encode response: {e}\n")),
    }
}

fn not_found(message: &str) -> TransportResponse {
    TransportResponse::new(STATUS_NOT_FOUND, format!("{message}\n"))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl Transport for InMemoryRemote {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut store = self.store.lock().await;
        store.requests.push(request.clone());
        Ok(self.handle(&mut store, &request))
    }
}
