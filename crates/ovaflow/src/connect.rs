//! Session setup: profile → logins → `CompositeGateway`.
//!
//! A cloud profile exchanges its refresh token, reads the SDDC's endpoints
//! and cloudadmin credentials, then logs in to vCenter and NSX. A direct
//! profile logs in to vCenter only.

use tracing::{debug, info, warn};
use url::Url;

use ovaflow_api::auth::{CSP_AUTH_HEADER, DEFAULT_CSP_URL};
use ovaflow_api::vmc::DEFAULT_VMC_URL;
use ovaflow_api::{
    CompositeGateway, NsxClient, NsxGateway, TlsMode, TransportConfig, VmcClient, VsphereClient,
    VsphereGateway, exchange_refresh_token, session_client, vsphere_login, vsphere_logout,
};
use ovaflow_config::{
    CloudAccess, Config, ConfigError, Overrides, ResolvedProfile, SecretChain, TlsSetting,
    VcenterLogin,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file, profile and flag overrides, resolved into connection settings.
pub fn resolve(config: &Config, global: &GlobalOpts) -> Result<ResolvedProfile, CliError> {
    let name = config.active_profile_name(global.profile.as_deref());
    let overrides = Overrides {
        vcenter: global.vcenter.clone(),
        username: global.username.clone(),
        insecure: global.insecure,
        timeout: global.timeout,
    };
    config
        .resolve_profile(&name, &overrides, SecretChain::system())
        .map_err(|e| match e {
            ConfigError::UnknownProfile { profile } => {
                let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
                names.sort_unstable();
                CliError::ProfileNotFound {
                    name: profile,
                    available: if names.is_empty() {
                        "(none)".into()
                    } else {
                        names.join(", ")
                    },
                }
            }
            other => other.into(),
        })
}

fn transport(profile: &ResolvedProfile) -> TransportConfig {
    TransportConfig {
        tls: match &profile.tls {
            TlsSetting::System => TlsMode::System,
            TlsSetting::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsSetting::AcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: profile.timeout,
    }
}

fn default_url(raw: &str) -> Result<Url, CliError> {
    Url::parse(raw).map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: format!("{raw}: {e}"),
    })
}

/// Open sessions plus the vCenter login they were made with.
pub struct Session {
    pub gateway: CompositeGateway,
    pub vcenter: VcenterLogin,
    pub insecure: bool,
}

impl Session {
    /// Best effort; the server expires idle sessions anyway.
    pub async fn close(&self) {
        if let Err(e) = vsphere_logout(self.gateway.vsphere().client().rest()).await {
            debug!(error = %e, "vCenter logout failed");
        }
    }
}

/// Opens every session the profile allows.
pub async fn open(profile: &ResolvedProfile) -> Result<Session, CliError> {
    let transport = transport(profile);
    let (gateway, vcenter) = match &profile.cloud {
        Some(cloud) => open_cloud(profile, cloud, &transport).await?,
        None => {
            let login = profile.vcenter.clone().ok_or_else(|| CliError::NoCredentials {
                profile: profile.name.clone(),
            })?;
            if profile.nsx_url.is_some() {
                warn!("nsx_url is only used with org_id and sddc_id; NSX objects are unavailable");
            }
            let vsphere = login_vcenter(&login, &transport).await?;
            (CompositeGateway::new(vsphere, None), login)
        }
    };
    Ok(Session {
        gateway,
        vcenter,
        insecure: profile.tls == TlsSetting::AcceptInvalid,
    })
}

async fn login_vcenter(
    login: &VcenterLogin,
    transport: &TransportConfig,
) -> Result<VsphereGateway, CliError> {
    info!(vcenter = %login.url, user = %login.username, "logging in to vCenter");
    let rest = vsphere_login(&login.url, &login.username, &login.password, transport).await?;
    Ok(VsphereGateway::new(VsphereClient::new(rest)))
}

async fn open_cloud(
    profile: &ResolvedProfile,
    cloud: &CloudAccess,
    transport: &TransportConfig,
) -> Result<(CompositeGateway, VcenterLogin), CliError> {
    let csp_url = match &cloud.csp_url {
        Some(url) => url.clone(),
        None => default_url(DEFAULT_CSP_URL)?,
    };
    let vmc_url = match &cloud.vmc_url {
        Some(url) => url.clone(),
        None => default_url(DEFAULT_VMC_URL)?,
    };

    let token = exchange_refresh_token(&csp_url, &cloud.refresh_token, transport).await?;
    debug!(expires_in = ?token.expires_in_secs, "access token issued");

    let vmc = VmcClient::new(session_client(
        &vmc_url,
        CSP_AUTH_HEADER,
        &token.token,
        transport,
    )?);
    let sddc = vmc.sddc(&cloud.org_id, &cloud.sddc_id).await?;
    info!(sddc = %sddc.id, vcenter = %sddc.vc_url, "SDDC endpoints resolved");

    // An explicit vCenter login wins over the SDDC's cloudadmin account.
    let login = match &profile.vcenter {
        Some(login) => login.clone(),
        None => VcenterLogin {
            url: sddc.vc_url.clone(),
            username: sddc.cloud_username.clone(),
            password: sddc.cloud_password.clone(),
        },
    };
    let vsphere = login_vcenter(&login, transport).await?;

    let nsx = match profile.nsx_url.clone().or(sddc.nsx_url) {
        Some(url) => {
            debug!(nsx = %url, "using NSX policy endpoint");
            let rest = session_client(&url, CSP_AUTH_HEADER, &token.token, transport)?;
            Some(NsxGateway::new(NsxClient::new(rest)))
        }
        None => {
            warn!(sddc = %sddc.id, "SDDC reports no NSX endpoint");
            None
        }
    };

    Ok((CompositeGateway::new(vsphere, nsx), login))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn profile(tls: TlsSetting) -> ResolvedProfile {
        ResolvedProfile {
            name: "lab".into(),
            vcenter: None,
            cloud: None,
            nsx_url: None,
            tls,
            timeout: Duration::from_secs(45),
        }
    }

    #[test]
    fn tls_settings_map_to_transport() {
        let t = transport(&profile(TlsSetting::AcceptInvalid));
        assert!(matches!(t.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(t.timeout, Duration::from_secs(45));

        let t = transport(&profile(TlsSetting::CustomCa(PathBuf::from("/etc/ca.pem"))));
        assert!(matches!(t.tls, TlsMode::CustomCa(ref p) if p == &PathBuf::from("/etc/ca.pem")));
    }

    #[tokio::test]
    async fn profile_without_logins_has_no_credentials() {
        let result = open(&profile(TlsSetting::System)).await;
        assert!(matches!(result, Err(CliError::NoCredentials { .. })));
    }

    #[test]
    fn default_endpoints_parse() {
        assert!(default_url(DEFAULT_CSP_URL).is_ok());
        assert!(default_url(DEFAULT_VMC_URL).is_ok());
    }
}
