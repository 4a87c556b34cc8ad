//! Provider configuration.
//!
//! The provider block accepts `metro` and `token`. Either may be omitted and
//! picked up from the environment instead:
//!
//! | Attribute | Environment variable | Default |
//! |-----------|----------------------|---------|
//! | `metro`   | `UKC_METRO`          | `fra0`  |
//! | `token`   | `UKC_TOKEN`          | none    |

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::platform::{ClientConfig, DEFAULT_METRO};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `metro` is unset.
pub const METRO_ENV: &str = "UKC_METRO";

/// Environment variable consulted when `token` is unset.
pub const TOKEN_ENV: &str = "UKC_TOKEN";

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_description("Configures access to the Unikraft Cloud API.")
        .with_attribute(
            "metro",
            Attribute::optional_string().with_description(format!(
                "Metro name (e.g. `fra0`) or full API URL. Defaults to `{}` or the `{}` environment variable.",
                DEFAULT_METRO, METRO_ENV
            )),
        )
        .with_attribute(
            "token",
            Attribute::optional_string().sensitive().with_description(format!(
                "API token. Defaults to the `{}` environment variable.",
                TOKEN_ENV
            )),
        )
}

/// Provider configuration as written by the user.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Metro name or API URL.
    pub metro: Option<String>,
    /// API token.
    pub token: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("metro", &self.metro)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProviderConfig {
    /// Decode the provider configuration value. `null` is an empty config.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(config)?)
    }

    /// Fill unset or blank fields from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Fill unset or blank fields from `lookup`.
    pub fn with_env<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: Option<String>, key: &str| {
            non_blank(value).or_else(|| non_blank(lookup(key)))
        };
        Self {
            metro: pick(self.metro, METRO_ENV),
            token: pick(self.token, TOKEN_ENV),
        }
    }

    /// Build the client settings, or the diagnostics explaining why not.
    pub fn to_client_config(&self) -> Result<ClientConfig, Vec<Diagnostic>> {
        let token = match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(vec![Diagnostic::error("Missing Unikraft Cloud API Token")
                    .with_detail(format!(
                        "The provider cannot create the Unikraft Cloud API client as there is \
                         a missing or empty value for the API token. Set the token value in \
                         the configuration or use the {} environment variable.",
                        TOKEN_ENV
                    ))
                    .with_attribute("token")])
            },
        };
        let metro = self.metro.as_deref().unwrap_or(DEFAULT_METRO);
        Ok(ClientConfig::for_metro(metro, token))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_value() {
        let config =
            ProviderConfig::from_value(&json!({"metro": "sin0", "token": "secret"})).unwrap();
        assert_eq!(config.metro.as_deref(), Some("sin0"));
        assert_eq!(config.token.as_deref(), Some("secret"));

        assert_eq!(
            ProviderConfig::from_value(&Value::Null).unwrap(),
            ProviderConfig::default()
        );
        assert_eq!(
            ProviderConfig::from_value(&json!({})).unwrap(),
            ProviderConfig::default()
        );
        assert!(ProviderConfig::from_value(&json!({"token": 12})).is_err());
    }

    #[test]
    fn test_env_fallback() {
        let config = ProviderConfig::default()
            .with_env(env(&[(METRO_ENV, "was1"), (TOKEN_ENV, "from-env")]));
        assert_eq!(config.metro.as_deref(), Some("was1"));
        assert_eq!(config.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = ProviderConfig {
            metro: Some("fra0".to_string()),
            token: Some("explicit".to_string()),
        }
        .with_env(env(&[(METRO_ENV, "was1"), (TOKEN_ENV, "from-env")]));
        assert_eq!(config.metro.as_deref(), Some("fra0"));
        assert_eq!(config.token.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = ProviderConfig {
            metro: Some(" ".to_string()),
            token: Some(String::new()),
        }
        .with_env(env(&[(TOKEN_ENV, "from-env")]));
        assert_eq!(config.metro, None);
        assert_eq!(config.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_missing_token_diagnostic() {
        let diagnostics = ProviderConfig::default()
            .with_env(env(&[]))
            .to_client_config()
            .unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("token"));
        assert!(diagnostics[0].detail.as_deref().unwrap().contains(TOKEN_ENV));
    }

    #[test]
    fn test_client_config_defaults_metro() {
        let client_config = ProviderConfig {
            metro: None,
            token: Some("t".to_string()),
        }
        .to_client_config()
        .unwrap();
        assert_eq!(client_config.base_url, "https://api.fra0.kraft.cloud/v1");
        assert_eq!(client_config.token, "t");

        let client_config = ProviderConfig {
            metro: Some("http://127.0.0.1:9000".to_string()),
            token: Some("t".to_string()),
        }
        .to_client_config()
        .unwrap();
        assert_eq!(client_config.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig {
            metro: None,
            token: Some("super-secret".to_string()),
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_schema_marks_token_sensitive() {
        let schema = provider_config_schema();
        assert!(schema.attribute("token").unwrap().flags.sensitive);
        assert!(schema.attribute("metro").unwrap().flags.optional);
    }
}
