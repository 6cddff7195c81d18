//! Configuration for the ovaflow CLI.
//!
//! TOML profiles, secret resolution (env + keyring + plaintext), and the
//! deployment plan files that turn into `ovaflow_core::WorkflowRequest`s.
//! Nothing here talks to a remote endpoint.

mod plan;

pub use plan::{ItemSection, OvftoolSection, ParamValue, Plan, VmSection};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use ovaflow_core::PollConfig;

/// Keyring service every secret is stored under.
pub const KEYRING_SERVICE: &str = "ovaflow";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "OVAFLOW_CONFIG";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' is not defined")]
    UnknownProfile { profile: String },

    #[error("secret '{name}' could not be resolved from {source_kind}")]
    MissingSecret { name: String, source_kind: String },

    #[error("plan file not found: {}", path.display())]
    PlanNotFound { path: PathBuf },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between upload-session polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Seconds before an upload that never finishes is abandoned.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

impl Defaults {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval),
            timeout: Duration::from_secs(self.upload_timeout),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    60
}
fn default_upload_timeout() -> u64 {
    2 * 60 * 60
}

/// A named target: either a vCenter reached directly, a VMC SDDC whose
/// endpoints are discovered through the cloud control plane, or both.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// vCenter base URL (e.g. "https://vcenter.example.com").
    pub vcenter: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// VMC organization id.
    pub org_id: Option<String>,

    /// VMC SDDC id.
    pub sddc_id: Option<String>,

    /// CSP refresh token (plaintext -- prefer keyring or env var).
    pub refresh_token: Option<String>,

    /// Environment variable holding the refresh token.
    pub refresh_token_env: Option<String>,

    /// Override for the CSP endpoint.
    pub csp_url: Option<String>,

    /// Override for the VMC endpoint.
    pub vmc_url: Option<String>,

    /// NSX policy endpoint; discovered from the SDDC when unset.
    pub nsx_url: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

// ── Resolved profile ────────────────────────────────────────────────

/// TLS verification choice, translated by the CLI into transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSetting {
    System,
    CustomCa(PathBuf),
    AcceptInvalid,
}

/// Cloud control-plane access for an SDDC.
#[derive(Debug, Clone)]
pub struct CloudAccess {
    pub org_id: String,
    pub sddc_id: String,
    pub refresh_token: SecretString,
    pub csp_url: Option<Url>,
    pub vmc_url: Option<Url>,
}

/// Direct vCenter login.
#[derive(Debug, Clone)]
pub struct VcenterLogin {
    pub url: Url,
    pub username: String,
    pub password: SecretString,
}

/// Everything needed to open sessions for one profile.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: String,
    pub vcenter: Option<VcenterLogin>,
    pub cloud: Option<CloudAccess>,
    pub nsx_url: Option<Url>,
    pub tls: TlsSetting,
    pub timeout: Duration,
}

/// Command-line values that win over the profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vcenter: Option<String>,
    pub username: Option<String>,
    pub insecure: bool,
    pub timeout: Option<u64>,
}

// ── Secrets ─────────────────────────────────────────────────────────

/// Secrets stored per profile in the keyring as `{profile}/{account}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Password,
    RefreshToken,
}

impl SecretKind {
    pub fn account(self, profile: &str) -> String {
        match self {
            Self::Password => format!("{profile}/password"),
            Self::RefreshToken => format!("{profile}/refresh-token"),
        }
    }

    fn default_env(self) -> &'static str {
        match self {
            Self::Password => "OVAFLOW_PASSWORD",
            Self::RefreshToken => "OVAFLOW_REFRESH_TOKEN",
        }
    }
}

/// Lookup order for secrets: env var, then keyring, then plaintext.
#[derive(Debug, Clone, Copy)]
pub struct SecretChain {
    env: fn(&str) -> Option<String>,
    keyring: bool,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl SecretChain {
    /// Process environment and the system keyring.
    pub fn system() -> Self {
        Self {
            env: process_env,
            keyring: true,
        }
    }

    /// A fixed environment and no keyring.
    pub fn with_env(env: fn(&str) -> Option<String>) -> Self {
        Self {
            env,
            keyring: false,
        }
    }

    pub fn env(&self, name: &str) -> Option<SecretString> {
        (self.env)(name).map(SecretString::from)
    }

    pub fn keyring(&self, account: &str) -> Option<SecretString> {
        if !self.keyring {
            return None;
        }
        match keyring::Entry::new(KEYRING_SERVICE, account).and_then(|e| e.get_password()) {
            Ok(secret) => Some(SecretString::from(secret)),
            Err(e) => {
                debug!(account, error = %e, "keyring lookup missed");
                None
            }
        }
    }

    fn resolve(
        &self,
        env_names: &[&str],
        account: &str,
        plaintext: Option<&String>,
    ) -> Option<SecretString> {
        env_names
            .iter()
            .find_map(|name| self.env(name))
            .or_else(|| self.keyring(account))
            .or_else(|| plaintext.map(|p| SecretString::from(p.clone())))
    }
}

/// Resolve a profile secret through the chain.
pub fn resolve_secret(
    profile: &Profile,
    profile_name: &str,
    kind: SecretKind,
    chain: SecretChain,
) -> Option<SecretString> {
    let (custom_env, plaintext) = match kind {
        SecretKind::Password => (profile.password_env.as_deref(), profile.password.as_ref()),
        SecretKind::RefreshToken => (
            profile.refresh_token_env.as_deref(),
            profile.refresh_token.as_ref(),
        ),
    };
    let mut env_names: Vec<&str> = custom_env.into_iter().collect();
    env_names.push(kind.default_env());
    chain.resolve(&env_names, &kind.account(profile_name), plaintext)
}

/// Store a profile secret in the system keyring.
pub fn store_secret(
    profile_name: &str,
    kind: SecretKind,
    secret: &SecretString,
) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.account(profile_name))?;
    entry.set_password(secret.expose_secret())?;
    Ok(())
}

// ── Config file path ────────────────────────────────────────────────

/// `$OVAFLOW_CONFIG`, else the platform config dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = process_env(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "ovaflow", "ovaflow").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("ovaflow");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then `path`, then `OVAFLOW_`-prefixed env vars (`__` nests).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OVAFLOW_").split("__").only(&[
            "default_profile",
            "defaults.output",
            "defaults.insecure",
            "defaults.timeout",
            "defaults.poll_interval",
            "defaults.upload_timeout",
        ]));

    let config: Config = figment.extract()?;
    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

impl Config {
    /// Profile name from the flag, else the configured default.
    pub fn active_profile_name(&self, flag: Option<&str>) -> String {
        flag.map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// A copy safe to print: plaintext secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for profile in copy.profiles.values_mut() {
            if profile.password.is_some() {
                profile.password = Some(REDACTED.into());
            }
            if profile.refresh_token.is_some() {
                profile.refresh_token = Some(REDACTED.into());
            }
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve `name` into connection settings.
    ///
    /// An undefined profile is only an error when the overrides do not
    /// describe a vCenter on their own.
    pub fn resolve_profile(
        &self,
        name: &str,
        overrides: &Overrides,
        chain: SecretChain,
    ) -> Result<ResolvedProfile, ConfigError> {
        let fallback = Profile::default();
        let profile = match self.profiles.get(name) {
            Some(p) => p,
            None if overrides.vcenter.is_some() => &fallback,
            None => {
                return Err(ConfigError::UnknownProfile {
                    profile: name.into(),
                });
            }
        };

        let vcenter = resolve_vcenter(profile, name, overrides, chain)?;
        let cloud = resolve_cloud(profile, name, chain)?;
        if vcenter.is_none() && cloud.is_none() {
            return Err(ConfigError::NoCredentials {
                profile: name.into(),
            });
        }

        let tls = if overrides.insecure || profile.insecure.unwrap_or(self.defaults.insecure) {
            TlsSetting::AcceptInvalid
        } else if let Some(ca) = &profile.ca_cert {
            TlsSetting::CustomCa(ca.clone())
        } else {
            TlsSetting::System
        };

        let timeout = overrides
            .timeout
            .or(profile.timeout)
            .unwrap_or(self.defaults.timeout);

        Ok(ResolvedProfile {
            name: name.into(),
            vcenter,
            cloud,
            nsx_url: parse_url("nsx_url", profile.nsx_url.as_deref())?,
            tls,
            timeout: Duration::from_secs(timeout),
        })
    }
}

fn parse_url(field: &str, raw: Option<&str>) -> Result<Option<Url>, ConfigError> {
    raw.map(|s| {
        Url::parse(s).map_err(|e| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL '{s}': {e}"),
        })
    })
    .transpose()
}

fn resolve_vcenter(
    profile: &Profile,
    name: &str,
    overrides: &Overrides,
    chain: SecretChain,
) -> Result<Option<VcenterLogin>, ConfigError> {
    let Some(url) = parse_url(
        "vcenter",
        overrides.vcenter.as_deref().or(profile.vcenter.as_deref()),
    )?
    else {
        return Ok(None);
    };

    let username = overrides
        .username
        .clone()
        .or_else(|| profile.username.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: name.into(),
        })?;
    let password = resolve_secret(profile, name, SecretKind::Password, chain).ok_or_else(|| {
        ConfigError::NoCredentials {
            profile: name.into(),
        }
    })?;

    Ok(Some(VcenterLogin {
        url,
        username,
        password,
    }))
}

fn resolve_cloud(
    profile: &Profile,
    name: &str,
    chain: SecretChain,
) -> Result<Option<CloudAccess>, ConfigError> {
    let (Some(org_id), Some(sddc_id)) = (&profile.org_id, &profile.sddc_id) else {
        return Ok(None);
    };
    let refresh_token = resolve_secret(profile, name, SecretKind::RefreshToken, chain)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: name.into(),
        })?;

    Ok(Some(CloudAccess {
        org_id: org_id.clone(),
        sddc_id: sddc_id.clone(),
        refresh_token,
        csp_url: parse_url("csp_url", profile.csp_url.as_deref())?,
        vmc_url: parse_url("vmc_url", profile.vmc_url.as_deref())?,
    }))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "LAB_VC_PASSWORD" => Some("from-custom-env".into()),
            "OVAFLOW_REFRESH_TOKEN" => Some("token-from-env".into()),
            _ => None,
        }
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(body.as_bytes()).expect("write config");
        file
    }

    const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
timeout = 45
poll_interval = 5

[profiles.lab]
vcenter = "https://vcenter.lab.example.com"
username = "administrator@vsphere.local"
password = "plain-pw"

[profiles.cloud]
org_id = "org-1"
sddc_id = "sddc-1"
refresh_token_env = "UNSET_TOKEN_VAR"
insecure = true
"#;

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).expect("loads");

        assert_eq!(config.default_profile.as_deref(), Some("lab"));
        assert_eq!(config.defaults.timeout, 45);
        assert_eq!(config.defaults.output, "table");
        assert_eq!(config.defaults.poll_config().interval, Duration::from_secs(5));
        assert_eq!(config.profiles.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config_from(&dir.path().join("absent.toml")).expect("loads");
        assert_eq!(config.active_profile_name(None), "default");
        assert_eq!(config.active_profile_name(Some("x")), "x");
    }

    #[test]
    fn plaintext_is_the_last_resort() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).expect("loads");

        let resolved = config
            .resolve_profile("lab", &Overrides::default(), SecretChain::with_env(no_env))
            .expect("resolves");
        let vc = resolved.vcenter.expect("direct vcenter");
        assert_eq!(vc.password.expose_secret(), "plain-pw");
        assert_eq!(resolved.timeout, Duration::from_secs(45));
        assert_eq!(resolved.tls, TlsSetting::System);
        assert!(resolved.cloud.is_none());
    }

    #[test]
    fn custom_env_beats_plaintext() {
        let mut profile = Profile {
            password: Some("plain-pw".into()),
            password_env: Some("LAB_VC_PASSWORD".into()),
            ..Profile::default()
        };
        let secret = resolve_secret(
            &profile,
            "lab",
            SecretKind::Password,
            SecretChain::with_env(fake_env),
        )
        .expect("found");
        assert_eq!(secret.expose_secret(), "from-custom-env");

        profile.password_env = None;
        let secret = resolve_secret(
            &profile,
            "lab",
            SecretKind::Password,
            SecretChain::with_env(fake_env),
        )
        .expect("found");
        assert_eq!(secret.expose_secret(), "plain-pw");
    }

    #[test]
    fn cloud_profile_falls_back_to_default_env() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).expect("loads");

        let resolved = config
            .resolve_profile("cloud", &Overrides::default(), SecretChain::with_env(fake_env))
            .expect("resolves");
        let cloud = resolved.cloud.expect("cloud access");
        assert_eq!(cloud.refresh_token.expose_secret(), "token-from-env");
        assert_eq!(resolved.tls, TlsSetting::AcceptInvalid);
        assert!(resolved.vcenter.is_none());
    }

    #[test]
    fn cloud_profile_without_token_has_no_credentials() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).expect("loads");

        let err = config
            .resolve_profile("cloud", &Overrides::default(), SecretChain::with_env(no_env))
            .expect_err("no token anywhere");
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn overrides_stand_in_for_a_missing_profile() {
        let config = Config::default();
        let overrides = Overrides {
            vcenter: Some("https://vc.example.com".into()),
            username: Some("admin".into()),
            insecure: true,
            timeout: Some(5),
        };

        let err = config
            .resolve_profile("default", &overrides, SecretChain::with_env(no_env))
            .expect_err("password still required");
        assert!(matches!(err, ConfigError::NoCredentials { .. }));

        let err = config
            .resolve_profile("default", &Overrides::default(), SecretChain::with_env(no_env))
            .expect_err("nothing to go on");
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn redaction_masks_plaintext_secrets() {
        let file = write_config(SAMPLE);
        let config = load_config_from(file.path()).expect("loads");

        let shown = config.redacted().to_toml().expect("serializes");
        assert!(!shown.contains("plain-pw"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn keyring_accounts_are_per_profile() {
        assert_eq!(SecretKind::Password.account("lab"), "lab/password");
        assert_eq!(SecretKind::RefreshToken.account("lab"), "lab/refresh-token");
    }
}
