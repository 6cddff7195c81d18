//! External OVF tool invocation.
//!
//! The argument vector is built here and handed to a `ProcessRunner`; no
//! shell is involved. The vCenter password travels inside the `vi://`
//! locator, percent-encoded, and is never written to logs.

use std::collections::BTreeMap;
use std::future::Future;
use std::process::Stdio;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use ovaflow_config::OvftoolSection;

use crate::error::CliError;

/// Characters kept verbatim in locator credentials.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// One argument of a command line. Secret arguments are masked in logs.
pub enum Arg {
    Plain(String),
    Secret(SecretString),
}

impl Arg {
    fn expose(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Secret(s) => s.expose_secret(),
        }
    }

    fn for_log(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Secret(_) => "<redacted>",
        }
    }
}

/// Runs an external program to completion.
pub trait ProcessRunner {
    /// Spawns `program` with `args`, feeding each output line to `on_line`.
    /// Returns the exit code, `None` when killed by a signal.
    fn run(
        &self,
        program: &str,
        args: &[Arg],
        on_line: &(dyn Fn(&str) + Sync),
    ) -> impl Future<Output = Result<Option<i32>, CliError>> + Send;
}

/// `tokio::process` without a shell.
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
    async fn run(
        &self,
        program: &str,
        args: &[Arg],
        on_line: &(dyn Fn(&str) + Sync),
    ) -> Result<Option<i32>, CliError> {
        let shown: Vec<&str> = args.iter().map(Arg::for_log).collect();
        debug!(program, args = %shown.join(" "), "spawning");

        let mut child = Command::new(program)
            .args(args.iter().map(Arg::expose))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

        let pump_out = async {
            if let Some(mut lines) = stdout {
                while let Some(line) = lines.next_line().await? {
                    on_line(&line);
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let pump_err = async {
            if let Some(mut lines) = stderr {
                while let Some(line) = lines.next_line().await? {
                    on_line(&line);
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let (out, err) = tokio::join!(pump_out, pump_err);
        out?;
        err?;

        let status = child.wait().await?;
        Ok(status.code())
    }
}

/// vCenter the appliance is deployed through.
pub struct Target<'a> {
    pub vcenter: &'a Url,
    pub username: &'a str,
    pub password: &'a SecretString,
    /// Skip certificate checks, for vCenters with self-signed certs.
    pub insecure: bool,
}

/// The OVF tool command line for one appliance.
pub struct OvftoolCommand {
    program: String,
    args: Vec<Arg>,
}

impl OvftoolCommand {
    /// `network` overrides the section's network, e.g. with the id of a
    /// segment that was just reconciled.
    pub fn build(
        section: &OvftoolSection,
        name: &str,
        network: &str,
        properties: &BTreeMap<String, String>,
        target: &Target<'_>,
    ) -> Self {
        let mut args: Vec<Arg> = [
            "--machineOutput",
            "--X:enableHiddenProperties",
            "-dm=thin",
            "--acceptAllEulas",
            "--allowExtraConfig",
            "--overwrite",
            "--powerOffTarget",
        ]
        .iter()
        .map(|s| Arg::Plain((*s).to_owned()))
        .collect();

        let mhz = section.cpu_reservation_mhz;
        let mb = section.memory_mb;
        args.extend(
            [
                format!("--name={name}"),
                format!("--datastore={}", section.datastore),
                format!("--network={network}"),
                format!("--viCpuResource=:{mhz}:{mhz}"),
                format!("--viMemoryResource=:{mb}:{mb}"),
                format!("--numberOfCpus:{name}={}", section.cpus),
                format!("--memorySize:{name}={mb}"),
            ]
            .into_iter()
            .map(Arg::Plain),
        );
        if section.power_on {
            args.push(Arg::Plain("--powerOn".into()));
        }
        if let Some(folder) = &section.folder {
            args.push(Arg::Plain(format!("--vmFolder={folder}")));
        }
        for (key, value) in properties {
            args.push(Arg::Secret(SecretString::from(format!("--prop:{key}={value}"))));
        }
        if target.insecure {
            args.push(Arg::Plain("--noSSLVerify".into()));
        }
        args.push(Arg::Plain(section.source.clone()));
        args.push(Arg::Secret(locator(section, target)));

        Self {
            program: section.binary.clone(),
            args,
        }
    }

    /// Runs the tool; a non-zero exit is `ProcessFailed`.
    pub async fn run<R: ProcessRunner>(&self, runner: &R) -> Result<(), CliError> {
        info!(program = %self.program, "running OVF tool");
        let code = runner
            .run(&self.program, &self.args, &|line| debug!(target: "ovftool", "{line}"))
            .await?;
        match code {
            Some(0) => Ok(()),
            Some(c) => Err(CliError::ProcessFailed {
                program: self.program.clone(),
                status: format!("status {c}"),
            }),
            None => Err(CliError::ProcessFailed {
                program: self.program.clone(),
                status: "a signal".into(),
            }),
        }
    }
}

/// `vi://user:pass@host/{datacenter}/host/{cluster}/Resources/{pool}`
fn locator(section: &OvftoolSection, target: &Target<'_>) -> SecretString {
    let host = target.vcenter.host_str().unwrap_or_default();
    let host = match target.vcenter.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    SecretString::from(format!(
        "vi://{}:{}@{host}/{}/host/{}/Resources/{}",
        utf8_percent_encode(target.username, USERINFO),
        utf8_percent_encode(target.password.expose_secret(), USERINFO),
        section.datacenter,
        section.cluster,
        section.resource_pool,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn section() -> OvftoolSection {
        OvftoolSection {
            binary: "ovftool".into(),
            source: "https://downloads.example.com/proxy.ova".into(),
            datastore: "WorkloadDatastore".into(),
            network: "sddc-cgw-network-1".into(),
            folder: Some("Workloads".into()),
            datacenter: "SDDC-Datacenter".into(),
            cluster: "Cluster-1".into(),
            resource_pool: "Compute-ResourcePool".into(),
            cpus: 4,
            memory_mb: 16384,
            cpu_reservation_mhz: 1251,
            power_on: true,
            properties: BTreeMap::new(),
        }
    }

    fn command(password: &str) -> OvftoolCommand {
        let url = Url::parse("https://vcenter.sddc.example.com/").expect("url");
        let password = SecretString::from(password.to_owned());
        let target = Target {
            vcenter: &url,
            username: "cloudadmin@vmc.local",
            password: &password,
            insecure: true,
        };
        let mut props = BTreeMap::new();
        props.insert("IP_Address".to_owned(), "10.2.224.4".to_owned());
        OvftoolCommand::build(&section(), "vrni-proxy", "proxy-segment", &props, &target)
    }

    #[test]
    fn locator_encodes_credentials() {
        let cmd = command("u!JL$y#7");
        let last = cmd.args.last().expect("locator").expose();
        assert_eq!(
            last,
            "vi://cloudadmin%40vmc.local:u%21JL%24y%237@vcenter.sddc.example.com/SDDC-Datacenter/host/Cluster-1/Resources/Compute-ResourcePool"
        );
    }

    #[test]
    fn secrets_are_masked_for_logging() {
        let cmd = command("hunter2");
        let shown: Vec<&str> = cmd.args.iter().map(Arg::for_log).collect();
        assert!(shown.iter().all(|a| !a.contains("hunter2")));
        assert!(shown.contains(&"--network=proxy-segment"));
        assert!(shown.contains(&"--numberOfCpus:vrni-proxy=4"));
        assert!(shown.contains(&"<redacted>"));
    }

    struct FakeRunner {
        code: Option<i32>,
        seen: Mutex<Vec<String>>,
    }

    impl ProcessRunner for FakeRunner {
        async fn run(
            &self,
            program: &str,
            args: &[Arg],
            on_line: &(dyn Fn(&str) + Sync),
        ) -> Result<Option<i32>, CliError> {
            on_line("Opening OVA source");
            let mut seen = self.seen.lock().expect("lock");
            seen.push(program.to_owned());
            seen.extend(args.iter().map(|a| a.expose().to_owned()));
            Ok(self.code)
        }
    }

    #[tokio::test]
    async fn zero_exit_succeeds() {
        let runner = FakeRunner {
            code: Some(0),
            seen: Mutex::new(Vec::new()),
        };
        command("pw").run(&runner).await.expect("succeeds");
        let seen = runner.seen.lock().expect("lock");
        assert_eq!(seen[0], "ovftool");
        assert!(seen.contains(&"--powerOn".to_owned()));
    }

    #[tokio::test]
    async fn nonzero_exit_is_process_failed() {
        let runner = FakeRunner {
            code: Some(1),
            seen: Mutex::new(Vec::new()),
        };
        let err = command("pw").run(&runner).await.expect_err("fails");
        assert!(matches!(err, CliError::ProcessFailed { ref status, .. } if status == "status 1"));
        assert_eq!(err.exit_code(), crate::error::exit_code::DEPLOY);
    }
}
