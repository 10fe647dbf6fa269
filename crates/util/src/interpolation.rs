//! Environment interpolation for configuration values.
//!
//! Values may reference process environment variables with `${env:NAME}`.
//! Unknown variables are an error rather than an empty substitution so a
//! missing credential never turns into an anonymous request.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static ENV_PATTERN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\$\{env:([\w.-]*)}"));

/// Replace every `${env:NAME}` placeholder in `value`.
///
/// ```
/// use fathom_util::interpolate_env;
///
/// assert_eq!(interpolate_env("no placeholders").unwrap(), "no placeholders");
/// ```
pub fn interpolate_env(value: &str) -> Result<String, InterpolationError> {
    let env_regex = ENV_PATTERN.as_ref().map_err(|error| InterpolationError::Regex(error.clone()))?;

    let mut resolved = Vec::new();
    for cap in env_regex.captures_iter(value) {
        let var_name = cap[1].to_string();
        if var_name.is_empty() {
            return Err(InterpolationError::EmptyName {
                placeholder: cap[0].to_string(),
            });
        }
        let env_value = std::env::var(&var_name).map_err(|_| InterpolationError::MissingEnvVar { name: var_name.clone() })?;
        debug!("Interpolated env var: {} -> [REDACTED]", var_name);
        resolved.push((cap[0].to_string(), env_value));
    }

    let mut result = value.to_string();
    for (placeholder, env_value) in resolved {
        result = result.replace(&placeholder, &env_value);
    }
    Ok(result)
}

/// Errors that can occur during interpolation.
#[derive(Debug, Error, Clone)]
pub enum InterpolationError {
    #[error("Missing environment variable: {name}")]
    MissingEnvVar { name: String },

    #[error("Placeholder '{placeholder}' does not name a variable")]
    EmptyName { placeholder: String },

    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),
}
