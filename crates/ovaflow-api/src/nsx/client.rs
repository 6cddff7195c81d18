// Typed async client for the NSX Policy API behind the VMC reverse proxy.
//
// Base URL: the SDDC's `nsx_api_public_endpoint_url`
// Auth: csp-auth-token header (see `auth::session_client`)
//
// Policy objects live under `policy/api/v1/infra/...`; public IPs under
// `cloud-service/api/v1/infra/public-ips`. Writes are PUT (create or
// replace) or PATCH (merge); both answer 412 on a stale `_revision`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::ListResult;
use crate::error::Error;
use crate::http::RestClient;

/// Tier-1 gateway holding workload NAT and segments on VMC.
pub const COMPUTE_GATEWAY: &str = "cgw";
/// NAT section user rules are written to.
pub const NAT_SECTION: &str = "USER";

const POLICY_INFRA: &str = "policy/api/v1/infra";
const CLOUD_INFRA: &str = "cloud-service/api/v1/infra";

/// A list endpoint; `{collection}/{id}` addresses one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection<'a> {
    PublicIps,
    NatRules,
    Segments,
    Groups { domain: &'a str },
    GatewayPolicies { domain: &'a str },
}

impl Collection<'_> {
    pub fn path(&self) -> String {
        match self {
            Self::PublicIps => format!("{CLOUD_INFRA}/public-ips"),
            Self::NatRules => format!(
                "{POLICY_INFRA}/tier-1s/{COMPUTE_GATEWAY}/nat/{NAT_SECTION}/nat-rules"
            ),
            Self::Segments => format!("{POLICY_INFRA}/tier-1s/{COMPUTE_GATEWAY}/segments"),
            Self::Groups { domain } => format!("{POLICY_INFRA}/domains/{domain}/groups"),
            Self::GatewayPolicies { domain } => {
                format!("{POLICY_INFRA}/domains/{domain}/gateway-policies")
            }
        }
    }

    fn item(&self, id: &str) -> String {
        format!("{}/{id}", self.path())
    }
}

#[derive(Debug, Clone)]
pub struct NsxClient {
    rest: RestClient,
}

impl NsxClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Every object in a collection, following `cursor` until exhausted.
    pub async fn list<T: DeserializeOwned>(&self, collection: Collection<'_>) -> Result<Vec<T>, Error> {
        let path = collection.path();
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params: Vec<(&str, String)> = cursor
                .take()
                .map(|c| vec![("cursor", c)])
                .unwrap_or_default();
            let page: ListResult<T> = self.rest.get_with_params(&path, &params).await?;
            all.extend(page.results);
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(path, count = all.len(), "listed NSX collection");
        Ok(all)
    }

    pub async fn get<T: DeserializeOwned>(&self, collection: Collection<'_>, id: &str) -> Result<T, Error> {
        self.rest.get(&collection.item(id)).await
    }

    /// Create or replace; returns the stored object.
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: Collection<'_>,
        id: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.rest.put(&collection.item(id), body).await
    }

    /// Create or merge; the server answers with an empty body.
    pub async fn patch<B: Serialize + Sync>(
        &self,
        collection: Collection<'_>,
        id: &str,
        body: &B,
    ) -> Result<(), Error> {
        self.rest.patch(&collection.item(id), body).await
    }

    pub async fn delete(&self, collection: Collection<'_>, id: &str) -> Result<(), Error> {
        self.rest.delete(&collection.item(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths() {
        assert_eq!(
            Collection::NatRules.path(),
            "policy/api/v1/infra/tier-1s/cgw/nat/USER/nat-rules"
        );
        assert_eq!(
            Collection::PublicIps.path(),
            "cloud-service/api/v1/infra/public-ips"
        );
        assert_eq!(
            Collection::GatewayPolicies { domain: "mgw" }.item("default"),
            "policy/api/v1/infra/domains/mgw/gateway-policies/default"
        );
    }
}
