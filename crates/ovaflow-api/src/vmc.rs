// VMC control-plane lookups.
//
// Resolves an SDDC to the endpoints and cloud-admin credentials needed to
// talk to its vCenter and NSX manager.

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::http::RestClient;

/// Public VMC endpoint.
pub const DEFAULT_VMC_URL: &str = "https://vmc.vmware.com";

#[derive(Debug, Deserialize)]
struct SddcResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
    resource_config: Option<ResourceConfig>,
}

#[derive(Debug, Deserialize)]
struct ResourceConfig {
    vc_url: Option<String>,
    cloud_username: Option<String>,
    cloud_password: Option<String>,
    nsx_api_public_endpoint_url: Option<String>,
}

/// What an SDDC exposes to its tenants.
#[derive(Debug, Clone)]
pub struct SddcEndpoints {
    pub id: String,
    pub name: Option<String>,
    pub vc_url: Url,
    pub nsx_url: Option<Url>,
    pub cloud_username: String,
    pub cloud_password: SecretString,
}

/// Client for `/vmc/api/orgs/{org}/...`, authenticated with a CSP token.
pub struct VmcClient {
    rest: RestClient,
}

impl VmcClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn sddc(&self, org_id: &str, sddc_id: &str) -> Result<SddcEndpoints, Error> {
        let sddc: SddcResponse = self
            .rest
            .get(&format!("vmc/api/orgs/{org_id}/sddcs/{sddc_id}"))
            .await?;

        let config = sddc.resource_config.ok_or_else(|| {
            Error::InvalidRequest(format!("SDDC {sddc_id} has no resource config yet"))
        })?;
        let missing = |field: &str| Error::InvalidRequest(format!("SDDC {sddc_id} reports no {field}"));

        let vc_url = Url::parse(&config.vc_url.ok_or_else(|| missing("vc_url"))?)?;
        let nsx_url = config
            .nsx_api_public_endpoint_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        Ok(SddcEndpoints {
            id: sddc.id,
            name: sddc.name,
            vc_url,
            nsx_url,
            cloud_username: config.cloud_username.ok_or_else(|| missing("cloud_username"))?,
            cloud_password: SecretString::from(
                config
                    .cloud_password
                    .ok_or_else(|| missing("cloud_password"))?,
            ),
        })
    }
}
