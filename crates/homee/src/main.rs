mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use homee_config::Config;
use homee_core::{HubConfig, Session};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a hub connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let cfg = homee_config::load_config_or_default();
            let hub_config = build_hub_config(&cli.global, &cfg)?;
            let session = Session::new(hub_config)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &session, &cli.global).await
        }
    }
}

/// Build a `HubConfig` from the config file, profile, and CLI overrides.
fn build_hub_config(global: &GlobalOpts, cfg: &Config) -> Result<HubConfig, CliError> {
    let profile_name = cfg.profile_name(global.profile.as_deref()).to_owned();

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        let username = match global.username {
            Some(ref username) => username.clone(),
            None => homee_config::resolve_username(profile, &profile_name)?,
        };
        let password = match global.password {
            Some(ref password) => SecretString::from(password.clone()),
            None => homee_config::resolve_password(profile, &profile_name)?,
        };
        let mut config =
            homee_config::hub_config_with_credentials(profile, username, password)?;
        if let Some(ref host) = global.host {
            config.host.clone_from(host);
            config.validate()?;
        }
        return Ok(config);
    }

    // An explicitly requested profile must exist
    if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available.join(", "),
        });
    }

    // No profile -- build from CLI flags / env vars alone
    let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
        path: homee_config::config_path().display().to_string(),
    })?;
    let (Some(username), Some(password)) = (global.username.clone(), global.password.clone())
    else {
        return Err(CliError::NoCredentials {
            profile: profile_name,
        });
    };

    let config = HubConfig::new(host, username, SecretString::from(password));
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use homee_config::Profile;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["homee"];
        argv.extend_from_slice(args);
        argv.push("info");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_alone_build_a_config() {
        let g = global(&["--host", "10.0.0.2", "-u", "homee", "--password", "pw"]);
        let config = build_hub_config(&g, &Config::default()).unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.username, "homee");
    }

    #[test]
    fn flags_override_profile() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "homee.local".into(),
                username: Some("profile-user".into()),
                max_retries: Some(2),
                ..Profile::default()
            },
        );

        let g = global(&["--host", "10.0.0.3", "--password", "pw"]);
        let config = build_hub_config(&g, &cfg).unwrap();
        assert_eq!(config.host, "10.0.0.3");
        assert_eq!(config.username, "profile-user");
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), Profile::default());

        let g = global(&["--profile", "office"]);
        match build_hub_config(&g, &cfg) {
            Err(CliError::ProfileNotFound { name, available }) => {
                assert_eq!(name, "office");
                assert_eq!(available, "home");
            }
            other => panic!("expected ProfileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_host_points_at_config() {
        let g = global(&[]);
        assert!(matches!(
            build_hub_config(&g, &Config::default()),
            Err(CliError::NoConfig { .. })
        ));
    }
}
