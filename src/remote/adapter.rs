//! Per-kind translation between objects and API requests.

use serde::de::DeserializeOwned;

use super::transport::TransportRequest;
use crate::error::{ReconcileError, Result};
use crate::model::{Object, ObjectDescriptor, Value};
use crate::validation::{RequiredInputs, ValidationRule};

/// A request together with the status that signals success.
#[derive(Debug, Clone)]
pub struct Route {
    /// The request to send.
    pub request: TransportRequest,
    /// Expected success status.
    pub expect: u16,
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub const fn new(request: TransportRequest, expect: u16) -> Self {
        Self { request, expect }
    }
}

/// Translation layer for one kind.
///
/// Adapters build requests and decode responses; they never send anything.
/// Operations a kind does not support return `Ok(None)` from their route.
pub trait RemoteAdapter: Send + Sync {
    /// Returns the kind's descriptor.
    fn descriptor(&self) -> &'static ObjectDescriptor;

    /// Checks the desired object before create.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on the first violated rule.
    fn validate(&self, desired: &Object) -> Result<()> {
        RequiredInputs(self.descriptor()).check(desired)
    }

    /// Builds the create request from the known inputs of a desired object.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built.
    fn create_route(&self, desired: &Object) -> Result<Route>;

    /// Builds the read request from identity attributes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an identity attribute is missing.
    fn read_route(&self, identity: &Object) -> Result<Route>;

    /// Builds the in-place update request, if the API supports one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built.
    fn update_route(&self, _prior: &Object, _desired: &Object) -> Result<Option<Route>> {
        Ok(None)
    }

    /// Builds the delete request, if the API supports one.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an identity attribute is missing.
    fn delete_route(&self, _identity: &Object) -> Result<Option<Route>> {
        Ok(None)
    }

    /// Decodes a response body into an object snapshot.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body does not match the wire shape.
    fn parse_response(&self, body: &[u8]) -> Result<Object>;

    /// Parses an external import identifier into identity attributes.
    ///
    /// The identifier splits on `/` into exactly one segment per identity
    /// attribute, so flat kinds take the whole string and nested kinds take
    /// `parent/child`. Every segment must be a valid path segment.
    ///
    /// # Errors
    ///
    /// Returns a malformed-import error if the identifier does not match.
    fn parse_import_id(&self, id: &str) -> Result<Object> {
        let descriptor = self.descriptor();
        let malformed = || ReconcileError::MalformedImportId {
            id: id.to_string(),
            expected: descriptor.import_format(),
        };

        let segments: Vec<&str> = id.split('/').collect();
        if segments.len() != descriptor.identity.len()
            || !segments.iter().all(|s| is_path_segment(s))
        {
            return Err(malformed().into());
        }

        Ok(descriptor
            .identity
            .iter()
            .zip(segments)
            .map(|(name, segment)| (*name, Value::string(segment)))
            .collect())
    }
}

/// Reads a supplied string attribute.
pub(crate) fn known_str<'a>(object: &'a Object, name: &str) -> Result<&'a str> {
    let value = object.get(name);
    match value.as_str() {
        Some(s) if value.is_supplied() => Ok(s),
        _ => Err(
            ReconcileError::configuration(format!("attribute '{name}' must be known"), name)
                .into(),
        ),
    }
}

/// Reads a supplied string attribute that is placed in a URL path.
pub(crate) fn path_segment<'a>(object: &'a Object, name: &str) -> Result<&'a str> {
    let segment = known_str(object, name)?;
    if !is_path_segment(segment) {
        return Err(ReconcileError::configuration(
            format!("attribute '{name}' cannot be used in a URL path: '{segment}'"),
            name,
        )
        .into());
    }
    Ok(segment)
}

/// Returns true if `s` addresses exactly one path segment.
fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '?', '#'])
}

/// Decodes a JSON body into a wire type.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| ReconcileError::decode(format!("invalid {what} response: {e}")).into())
}

/// Returns the desired value of an attribute only if it was supplied.
pub(crate) fn supplied(desired: &Object, name: &str) -> Option<String> {
    let value = desired.get(name);
    value
        .as_str()
        .filter(|_| value.is_supplied())
        .map(ToString::to_string)
}
