// ── Remote resource gateway ──
//
// The narrow capability through which the core reaches every remote
// object. Implementations live in transport crates; tests use in-memory
// doubles.

use std::future::Future;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{DesiredSpec, FindCriteria, Resource, ResourceKind, ResourceRef};

/// CRUD over typed remote objects.
pub trait ResourceGateway: Send + Sync {
    /// Objects matching `criteria`, in server order. An empty result is not
    /// an error.
    fn find(
        &self,
        criteria: &FindCriteria,
    ) -> impl Future<Output = Result<Vec<ResourceRef>, CoreError>> + Send;

    /// Fails with `NotFound` if the object is absent.
    fn get(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> impl Future<Output = Result<Resource, CoreError>> + Send;

    /// Creates an object and returns its id. `client_token` is forwarded as
    /// the server's idempotency key where supported. Fails with `Conflict`
    /// on a natural-key collision.
    fn create(
        &self,
        kind: ResourceKind,
        client_token: Uuid,
        spec: &DesiredSpec,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// Full replacement. Fails with `NotFound` or `VersionConflict`.
    fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> impl Future<Output = Result<Resource, CoreError>> + Send;

    /// Partial merge. Fails with `NotFound` or `VersionConflict`.
    fn patch(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> impl Future<Output = Result<Resource, CoreError>> + Send;

    /// Fails with `NotFound`, or `Conflict` when dependents exist.
    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// `{scope}/{id}` identifier for objects that live inside a parent domain.
pub fn scoped_id(scope: &str, id: &str) -> String {
    format!("{scope}/{id}")
}

/// Splits a `{scope}/{id}` identifier. Ids without a scope yield `None`.
pub fn split_scoped_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('/')
}
