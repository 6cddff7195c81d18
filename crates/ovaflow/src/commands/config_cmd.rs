//! Config subcommand handlers. None of these open a session.

use std::io::BufRead;

use secrecy::SecretString;

use ovaflow_config::{SecretKind, config_path, load_config, store_secret};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretArg};
use crate::error::CliError;
use crate::output;

fn read_secret(kind: SecretArg, from_stdin: bool) -> Result<SecretString, CliError> {
    let raw = if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_owned()
    } else {
        let prompt = match kind {
            SecretArg::Password => "vCenter password: ",
            SecretArg::RefreshToken => "Refresh token: ",
        };
        rpassword::prompt_password(prompt)?
    };
    if raw.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(SecretString::from(raw))
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // Plaintext secrets are masked; env and keyring are never read here.
        ConfigCommand::Show => {
            let cfg = load_config()?.redacted();
            let toml = cfg.to_toml()?;
            let out = output::render_single(global.output, &cfg, |_| toml.clone(), |c| {
                c.default_profile.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetSecret { kind, stdin } => {
            let cfg = load_config()?;
            let profile = cfg.active_profile_name(global.profile.as_deref());
            if !cfg.profiles.contains_key(&profile) {
                tracing::warn!(profile = %profile, "profile is not defined in the config file yet");
            }
            let secret = read_secret(kind, stdin)?;
            let kind = match kind {
                SecretArg::Password => SecretKind::Password,
                SecretArg::RefreshToken => SecretKind::RefreshToken,
            };
            store_secret(&profile, kind, &secret)?;
            if !global.quiet {
                eprintln!("✓ Stored {} in the system keyring", kind.account(&profile));
            }
            Ok(())
        }
    }
}
