//! Config subcommand handlers.

use homee_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Hide plaintext secrets before printing.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
}

fn profile_names(cfg: &Config) -> Vec<&str> {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            redact(&mut cfg);
            let rendered = match global.output {
                OutputFormat::Json => output::render_json_pretty(&cfg),
                OutputFormat::JsonCompact => output::render_json_compact(&cfg),
                _ => toml::to_string_pretty(&cfg).map_err(config::ConfigError::from)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.profile_name(None);
            let lines: Vec<String> = profile_names(&cfg)
                .into_iter()
                .map(|name| {
                    let host = cfg.profiles.get(name).map_or("", |p| p.host.as_str());
                    let marker = if name == default { "*" } else { " " };
                    format!("{marker} {name}\t{host}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Add {
            name,
            hub,
            user,
            password_env,
            device,
        } => {
            let mut cfg = config::load_config_or_default();
            let profile = Profile {
                host: hub,
                username: Some(user),
                password_env,
                device,
                ..Profile::default()
            };
            // The password is not known yet; only the profile's own fields are checked.
            config::hub_config_with_credentials(
                &profile,
                profile.username.clone().unwrap_or_default(),
                secrecy::SecretString::from(String::from("placeholder")),
            )?;

            if cfg.profiles.is_empty() {
                cfg.default_profile = Some(name.clone());
            }
            cfg.profiles.insert(name.clone(), profile);
            config::save_config(&cfg)?;

            eprintln!("Profile '{name}' saved to {}", config::config_path().display());
            eprintln!("Store its password with: homee config set-password --profile {name}");
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: profile_names(&cfg).join(", "),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let name = cfg.profile_name(global.profile.as_deref()).to_owned();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: profile_names(&cfg).join(", "),
                    name,
                });
            }

            let password = rpassword::prompt_password(format!("Password for '{name}': "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            config::store_password(&name, &password)?;
            eprintln!("Password for '{name}' stored in the system keyring");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                host: "homee.local".into(),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("office".into(), Profile::default());

        redact(&mut cfg);
        assert_eq!(cfg.profiles["home"].password.as_deref(), Some(REDACTED));
        assert_eq!(cfg.profiles["office"].password, None);
        assert_eq!(profile_names(&cfg), vec!["home", "office"]);
    }
}
