/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, Verifier 設定, claims mapping など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::auth::mapper::ClaimsMapping;
use crate::services::auth::resolver::ResolveBy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Whether resolved identities are persisted or rebuilt from claims on
/// every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPersistence {
    Store,
    Stateless,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub persistence: IdentityPersistence,
    /// Required in store mode, ignored in stateless mode.
    pub database_url: Option<String>,

    pub project_id: String,
    pub id_token_public_key_pem: String,
    pub id_token_leeway_seconds: u64,

    pub claims_mapping: ClaimsMapping,
    pub resolve_by: ResolveBy,
    pub token_cookie_name: String,
    pub auth_debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let persistence = match std::env::var("IDENTITY_PERSISTENCE")
            .unwrap_or_else(|_| "store".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "store" => IdentityPersistence::Store,
            "stateless" => IdentityPersistence::Stateless,
            _ => return Err(ConfigError::Invalid("IDENTITY_PERSISTENCE")),
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if persistence == IdentityPersistence::Store && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let project_id =
            std::env::var("AUTH_PROJECT_ID").map_err(|_| ConfigError::Missing("AUTH_PROJECT_ID"))?;

        let id_token_public_key_pem = std::env::var("ID_TOKEN_PUBLIC_KEY_PEM")
            .map_err(|_| ConfigError::Missing("ID_TOKEN_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let id_token_leeway_seconds = std::env::var("ID_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let claims_mapping = match std::env::var("CLAIMS_MAPPING") {
            Ok(raw) => {
                parse_claims_mapping(&raw).ok_or(ConfigError::Invalid("CLAIMS_MAPPING"))?
            }
            Err(_) => ClaimsMapping::default(),
        };

        let resolve_by = match std::env::var("RESOLVE_BY") {
            Ok(raw) => parse_resolve_by(&raw).ok_or(ConfigError::Invalid("RESOLVE_BY"))?,
            Err(_) => ResolveBy::default(),
        };

        let token_cookie_name =
            std::env::var("TOKEN_COOKIE_NAME").unwrap_or_else(|_| "bearer_token".to_string());

        let auth_debug = std::env::var("AUTH_DEBUG")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            addr,
            app_env,
            persistence,
            database_url,
            project_id,
            id_token_public_key_pem,
            id_token_leeway_seconds,
            claims_mapping,
            resolve_by,
            token_cookie_name,
            auth_debug,
        })
    }
}

// CLAIMS_MAPPING='{"display_name":"name"}' (attribute → claim key)
fn parse_claims_mapping(raw: &str) -> Option<ClaimsMapping> {
    let mapping: BTreeMap<String, String> = serde_json::from_str(raw).ok()?;
    if mapping.is_empty() {
        return None;
    }
    Some(ClaimsMapping::new(mapping))
}

// RESOLVE_BY accepts either a bare attribute name ("uid") or a one-entry
// JSON object mapping claim key to model attribute ('{"sub":"firebase_uid"}').
fn parse_resolve_by(raw: &str) -> Option<ResolveBy> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.starts_with('{') {
        let pairs: BTreeMap<String, String> = serde_json::from_str(raw).ok()?;
        if pairs.len() != 1 {
            // Exactly one (claim key, attribute) pair may be active.
            return None;
        }
        let (claim_key, attribute) = pairs.into_iter().next()?;
        return Some(ResolveBy::Pair {
            claim_key,
            attribute,
        });
    }

    Some(ResolveBy::Attribute(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_by_bare_name() {
        assert_eq!(
            parse_resolve_by("uid"),
            Some(ResolveBy::Attribute("uid".to_string()))
        );
    }

    #[test]
    fn resolve_by_single_pair() {
        assert_eq!(
            parse_resolve_by(r#"{"sub":"firebase_uid"}"#),
            Some(ResolveBy::Pair {
                claim_key: "sub".to_string(),
                attribute: "firebase_uid".to_string(),
            })
        );
    }

    #[test]
    fn resolve_by_rejects_empty_and_multi_entry() {
        assert_eq!(parse_resolve_by(""), None);
        assert_eq!(parse_resolve_by(r#"{}"#), None);
        assert_eq!(parse_resolve_by(r#"{"a":"b","c":"d"}"#), None);
        assert_eq!(parse_resolve_by(r#"{"a":1}"#), None);
    }

    #[test]
    fn claims_mapping_parses_json_object() {
        let mapping = parse_claims_mapping(r#"{"display_name":"name"}"#).unwrap();
        let pairs: Vec<_> = mapping.iter().collect();
        assert_eq!(pairs, vec![("display_name", "name")]);
    }

    #[test]
    fn claims_mapping_rejects_junk() {
        assert!(parse_claims_mapping("not json").is_none());
        assert!(parse_claims_mapping("{}").is_none());
    }
}
