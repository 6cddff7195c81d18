// `ResourceGateway` over the vSphere Automation API.
//
// Owns content libraries, library items and VM NICs, plus the lookup-only
// inventory kinds. NIC ids are `{vm}/{nic}` since NICs only exist inside a VM.

use ovaflow_core::model::{
    BackingType, LibraryItemSpec, LibrarySpec, LibraryType, NicSpec, StorageBacking,
};
use ovaflow_core::orchestrator::ATTR_BACKING_TYPE;
use ovaflow_core::{
    CoreError, DesiredSpec, FindCriteria, Resource, ResourceGateway, ResourceKind, ResourceRef,
    scoped_id, split_scoped_id,
};
use tracing::debug;
use uuid::Uuid;

use super::client::VsphereClient;
use super::types;
use crate::error::Error;

const DATASTORE_BACKING: &str = "DATASTORE";

/// vCenter-side gateway; also implements the transfer and deployer traits.
#[derive(Debug, Clone)]
pub struct VsphereGateway {
    client: VsphereClient,
}

impl VsphereGateway {
    pub fn new(client: VsphereClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &VsphereClient {
        &self.client
    }

    /// Kinds this gateway answers for.
    pub fn owns(kind: ResourceKind) -> bool {
        matches!(
            kind,
            ResourceKind::Library
                | ResourceKind::LibraryItem
                | ResourceKind::Nic
                | ResourceKind::Datastore
                | ResourceKind::ResourcePool
                | ResourceKind::Folder
                | ResourceKind::Network
                | ResourceKind::Vm
        )
    }
}

fn unsupported(kind: ResourceKind, operation: &'static str) -> CoreError {
    Error::Unsupported { kind, operation }.into()
}

fn mismatch(kind: ResourceKind, spec: &DesiredSpec) -> CoreError {
    CoreError::Internal(format!("cannot create {kind} from a {} spec", spec.kind()))
}

fn nic_id(id: &str) -> Result<(&str, &str), CoreError> {
    split_scoped_id(id).ok_or_else(|| CoreError::NotFound {
        kind: ResourceKind::Nic,
        id: id.to_owned(),
    })
}

// ── Wire ⇄ model conversions ─────────────────────────────────────────

fn library_resource(model: types::LibraryModel, id: &str) -> Resource {
    let library_type = match model.library_type.as_deref() {
        Some("SUBSCRIBED") => LibraryType::Subscribed,
        _ => LibraryType::Local,
    };
    let spec = LibrarySpec {
        name: model.name.clone(),
        description: model.description.unwrap_or_default(),
        library_type,
        storage_backings: model
            .storage_backings
            .into_iter()
            .filter_map(|b| b.datastore_id)
            .map(|datastore_id| StorageBacking { datastore_id })
            .collect(),
    };
    let id = model.id.unwrap_or_else(|| id.to_owned());
    Resource::new(
        ResourceRef::new(ResourceKind::Library, id, model.name),
        Some(DesiredSpec::Library(spec)),
    )
}

fn library_model(spec: &LibrarySpec) -> types::LibraryModel {
    types::LibraryModel {
        id: None,
        name: spec.name.clone(),
        description: Some(spec.description.clone()),
        library_type: Some(spec.library_type.to_string()),
        storage_backings: spec
            .storage_backings
            .iter()
            .map(|b| types::StorageBacking {
                backing_type: DATASTORE_BACKING.into(),
                datastore_id: Some(b.datastore_id.clone()),
            })
            .collect(),
    }
}

fn item_resource(model: types::ItemModel, id: &str) -> Resource {
    let spec = LibraryItemSpec {
        name: model.name.clone(),
        library_id: model.library_id,
        item_type: model.item_type.unwrap_or_default(),
    };
    let id = model.id.unwrap_or_else(|| id.to_owned());
    Resource::new(
        ResourceRef::new(ResourceKind::LibraryItem, id, model.name),
        Some(DesiredSpec::LibraryItem(spec)),
    )
}

fn item_model(spec: &LibraryItemSpec) -> types::ItemModel {
    types::ItemModel {
        id: None,
        library_id: spec.library_id.clone(),
        name: spec.name.clone(),
        item_type: Some(spec.item_type.clone()),
    }
}

fn nic_resource(vm: &str, nic: &str, info: types::EthernetInfo) -> Resource {
    let backing_type = info
        .backing
        .backing_type
        .parse()
        .unwrap_or(BackingType::OpaqueNetwork);
    let spec = NicSpec {
        vm_id: vm.to_owned(),
        backing_type,
        network: info.backing.network.unwrap_or_default(),
        start_connected: info.start_connected,
    };
    let name = info.label.unwrap_or_else(|| nic.to_owned());
    let mut resource = Resource::new(
        ResourceRef::new(ResourceKind::Nic, scoped_id(vm, nic), name),
        Some(DesiredSpec::Nic(spec)),
    );
    if let Some(state) = info.state {
        resource = resource.with_attribute("state", state);
    }
    resource
}

/// Query params for the inventory list endpoints.
fn inventory_params(
    plural: &'static str,
    id: Option<&str>,
    criteria: Option<&FindCriteria>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(id) = id {
        params.push((plural, id.to_owned()));
    }
    if let Some(c) = criteria {
        if let Some(name) = &c.name_filter {
            params.push(("names", name.clone()));
        }
        if let Some(t) = &c.type_filter {
            let key = if c.kind == ResourceKind::Folder { "type" } else { "types" };
            params.push((key, t.clone()));
        }
    }
    params
}

impl VsphereGateway {
    async fn list_inventory(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        criteria: Option<&FindCriteria>,
    ) -> Result<Vec<Resource>, Error> {
        let lookup = |id: String, name: String| {
            Resource::new(ResourceRef::new(kind, id, name), None)
        };
        let resources = match kind {
            ResourceKind::Datastore => self
                .client
                .list_datastores(&inventory_params("datastores", id, criteria))
                .await?
                .into_iter()
                .map(|d| {
                    let r = lookup(d.datastore, d.name);
                    match d.datastore_type {
                        Some(t) => r.with_attribute("type", t),
                        None => r,
                    }
                })
                .collect(),
            ResourceKind::ResourcePool => self
                .client
                .list_resource_pools(&inventory_params("resource_pools", id, criteria))
                .await?
                .into_iter()
                .map(|p| lookup(p.resource_pool, p.name))
                .collect(),
            ResourceKind::Folder => self
                .client
                .list_folders(&inventory_params("folders", id, criteria))
                .await?
                .into_iter()
                .map(|f| {
                    let r = lookup(f.folder, f.name);
                    match f.folder_type {
                        Some(t) => r.with_attribute("type", t),
                        None => r,
                    }
                })
                .collect(),
            ResourceKind::Network => self
                .client
                .list_networks(&inventory_params("networks", id, criteria))
                .await?
                .into_iter()
                .map(|n| {
                    let r = lookup(n.network, n.name);
                    match n.network_type {
                        Some(t) => r.with_attribute(ATTR_BACKING_TYPE, t),
                        None => r,
                    }
                })
                .collect(),
            ResourceKind::Vm => self
                .client
                .list_vms(&inventory_params("vms", id, criteria))
                .await?
                .into_iter()
                .map(|v| {
                    let r = lookup(v.vm, v.name);
                    match v.power_state {
                        Some(p) => r.with_attribute("power_state", p),
                        None => r,
                    }
                })
                .collect(),
            _ => {
                return Err(Error::Unsupported {
                    kind,
                    operation: "inventory lookup",
                });
            }
        };
        Ok(resources)
    }

    /// Ids from a `find` call, named from the filter when one was given.
    async fn refs_for_ids(
        &self,
        kind: ResourceKind,
        ids: Vec<String>,
        name: Option<&str>,
    ) -> Result<Vec<ResourceRef>, CoreError> {
        let mut refs = Vec::with_capacity(ids.len());
        for id in ids {
            let display_name = match (name, kind) {
                (Some(n), _) => n.to_owned(),
                (None, ResourceKind::Library) => self
                    .client
                    .get_library(&id)
                    .await
                    .map_err(|e| e.for_resource(kind, &id))?
                    .name,
                (None, _) => self
                    .client
                    .get_item(&id)
                    .await
                    .map_err(|e| e.for_resource(kind, &id))?
                    .name,
            };
            refs.push(ResourceRef::new(kind, id, display_name));
        }
        Ok(refs)
    }
}

impl ResourceGateway for VsphereGateway {
    async fn find(&self, criteria: &FindCriteria) -> Result<Vec<ResourceRef>, CoreError> {
        let kind = criteria.kind;
        let name = criteria.name_filter.as_deref();
        debug!(%kind, ?name, scope = ?criteria.scope, "vSphere find");

        match kind {
            ResourceKind::Library => {
                let ids = self
                    .client
                    .find_libraries(&types::LibraryFindSpec {
                        name,
                        library_type: criteria.type_filter.as_deref(),
                    })
                    .await?;
                self.refs_for_ids(kind, ids, name).await
            }
            ResourceKind::LibraryItem => {
                let ids = self
                    .client
                    .find_items(&types::ItemFindSpec {
                        name,
                        library_id: criteria.scope.as_deref(),
                        item_type: criteria.type_filter.as_deref(),
                    })
                    .await?;
                self.refs_for_ids(kind, ids, name).await
            }
            ResourceKind::Nic => {
                let vm = criteria.scope.as_deref().ok_or_else(|| {
                    CoreError::Internal("NIC lookups need a VM id as scope".into())
                })?;
                let nics = self
                    .client
                    .list_nics(vm)
                    .await
                    .map_err(|e| e.for_resource(ResourceKind::Vm, vm))?;
                let mut refs = Vec::new();
                for summary in nics {
                    let info = self.client.get_nic(vm, &summary.nic).await?;
                    let resource = nic_resource(vm, &summary.nic, info);
                    if name.is_none_or(|n| n == resource.reference.display_name) {
                        refs.push(resource.reference);
                    }
                }
                Ok(refs)
            }
            kind if kind.is_lookup_only() => Ok(self
                .list_inventory(kind, None, Some(criteria))
                .await?
                .into_iter()
                .map(|r| r.reference)
                .collect()),
            _ => Err(unsupported(kind, "find")),
        }
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Resource, CoreError> {
        let res = match kind {
            ResourceKind::Library => self
                .client
                .get_library(id)
                .await
                .map(|m| library_resource(m, id)),
            ResourceKind::LibraryItem => self.client.get_item(id).await.map(|m| item_resource(m, id)),
            ResourceKind::Nic => {
                let (vm, nic) = nic_id(id)?;
                self.client
                    .get_nic(vm, nic)
                    .await
                    .map(|info| nic_resource(vm, nic, info))
            }
            kind if kind.is_lookup_only() => {
                let found = self
                    .list_inventory(kind, Some(id), None)
                    .await
                    .map_err(|e| e.for_resource(kind, id))?;
                return found.into_iter().next().ok_or_else(|| CoreError::NotFound {
                    kind,
                    id: id.to_owned(),
                });
            }
            _ => return Err(unsupported(kind, "get")),
        };
        res.map_err(|e| e.for_resource(kind, id))
    }

    async fn create(
        &self,
        kind: ResourceKind,
        client_token: Uuid,
        spec: &DesiredSpec,
    ) -> Result<String, CoreError> {
        let name = spec.display_name().to_owned();
        let created = match (kind, spec) {
            (ResourceKind::Library, DesiredSpec::Library(s)) => {
                if s.library_type != LibraryType::Local {
                    return Err(unsupported(kind, "create subscribed library"));
                }
                self.client
                    .create_local_library(&library_model(s), client_token)
                    .await
            }
            (ResourceKind::LibraryItem, DesiredSpec::LibraryItem(s)) => {
                self.client.create_item(&item_model(s), client_token).await
            }
            (ResourceKind::Nic, DesiredSpec::Nic(s)) => {
                let body = types::EthernetCreateSpec {
                    backing: types::EthernetBacking {
                        backing_type: s.backing_type.to_string(),
                        network: Some(s.network.clone()),
                    },
                    start_connected: s.start_connected,
                };
                self.client
                    .create_nic(&s.vm_id, &body, client_token)
                    .await
                    .map(|nic| scoped_id(&s.vm_id, &nic))
            }
            (ResourceKind::Library | ResourceKind::LibraryItem | ResourceKind::Nic, _) => {
                return Err(mismatch(kind, spec));
            }
            _ => return Err(unsupported(kind, "create")),
        };
        created.map_err(|e| e.for_resource(kind, &name))
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        // vCenter has no full-replacement verb for these objects.
        self.patch(kind, id, resource).await
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        id: &str,
        resource: &Resource,
    ) -> Result<Resource, CoreError> {
        let sent = match (kind, &resource.spec) {
            (ResourceKind::Library, Some(DesiredSpec::Library(s))) => {
                self.client.update_local_library(id, &library_model(s)).await
            }
            (ResourceKind::LibraryItem, Some(DesiredSpec::LibraryItem(s))) => {
                self.client.update_item(id, &item_model(s)).await
            }
            _ => return Err(unsupported(kind, "patch")),
        };
        sent.map_err(|e| e.for_resource(kind, id))?;
        self.get(kind, id).await
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), CoreError> {
        let res = match kind {
            ResourceKind::Library => self.client.delete_local_library(id).await,
            ResourceKind::LibraryItem => self.client.delete_item(id).await,
            ResourceKind::Nic => {
                let (vm, nic) = nic_id(id)?;
                self.client.delete_nic(vm, nic).await
            }
            ResourceKind::Vm => self.client.delete_vm(id).await,
            _ => return Err(unsupported(kind, "delete")),
        };
        res.map_err(|e| e.for_resource(kind, id))
    }
}
