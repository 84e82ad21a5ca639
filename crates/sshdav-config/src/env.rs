use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ConfigError;

fn env_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static env-reference regex")
    })
}

/// Replace every `${VAR_NAME}` in `input` with the value of that environment variable.
///
/// All unset variables are collected and reported together.
pub fn interpolate_env(input: &str) -> Result<String, ConfigError> {
    let mut missing: Vec<String> = Vec::new();

    let output = env_ref().replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(output.into_owned())
    } else {
        Err(ConfigError::MissingEnvVars(missing))
    }
}
