use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_FILE_TITLE_CHARS: usize = 45;
const DEFAULT_MONGO_TITLE_CHARS: usize = 40;
const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    File { path: PathBuf },
    Mongo { uri: String, database: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthBackend {
    Disabled,
    Firebase { api_key: String, base_url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CookieSettings {
    pub name: String,
    /// Must be turned on for any deployment served over HTTPS.
    pub secure: bool,
    pub max_age_secs: u64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            secure: false,
            max_age_secs: SESSION_MAX_AGE_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub auth: AuthBackend,
    pub redis_uri: Option<String>,
    pub cookie: CookieSettings,
    pub title_max_chars: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => 5000,
        };

        let store = match var("CHAT_STORE").as_deref().unwrap_or("file") {
            "file" => StoreBackend::File {
                path: PathBuf::from(var("CHATS_FILE").unwrap_or_else(|| "chats.json".to_string())),
            },
            "mongo" | "mongodb" => StoreBackend::Mongo {
                uri: var("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
                database: var("MONGODB_DATABASE").unwrap_or_else(|| "gemchat".to_string()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "CHAT_STORE",
                    value: other.to_string(),
                })
            }
        };

        let auth = match var("AUTH_PROVIDER").as_deref().unwrap_or("none") {
            "none" => AuthBackend::Disabled,
            "firebase" => AuthBackend::Firebase {
                api_key: var("FIREBASE_API_KEY").ok_or(ConfigError::Missing("FIREBASE_API_KEY"))?,
                base_url: var("FIREBASE_AUTH_URL")
                    .unwrap_or_else(|| "https://identitytoolkit.googleapis.com".to_string()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "AUTH_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let mut cookie = CookieSettings::default();
        if let Some(name) = var("SESSION_COOKIE_NAME") {
            cookie.name = name;
        }
        if let Some(raw) = var("SESSION_COOKIE_SECURE") {
            cookie.secure = parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "SESSION_COOKIE_SECURE",
                value: raw,
            })?;
        }

        let title_max_chars = match var("TITLE_MAX_CHARS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid { key: "TITLE_MAX_CHARS", value: raw }),
            },
            None => match store {
                StoreBackend::File { .. } => DEFAULT_FILE_TITLE_CHARS,
                StoreBackend::Mongo { .. } => DEFAULT_MONGO_TITLE_CHARS,
            },
        };

        Ok(Self {
            host,
            port,
            store,
            auth,
            redis_uri: var("REDIS_URI"),
            cookie,
            title_max_chars,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_file_store_without_auth() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr(), "127.0.0.1:5000");
        assert_eq!(
            s.store,
            StoreBackend::File { path: PathBuf::from("chats.json") }
        );
        assert_eq!(s.auth, AuthBackend::Disabled);
        assert_eq!(s.title_max_chars, 45);
        assert_eq!(s.cookie, CookieSettings::default());
        assert!(s.redis_uri.is_none());
    }

    #[test]
    fn mongo_store_requires_uri_and_shortens_titles() {
        assert!(matches!(
            settings(&[("CHAT_STORE", "mongo")]),
            Err(ConfigError::Missing("MONGODB_URI"))
        ));

        let s = settings(&[("CHAT_STORE", "mongo"), ("MONGODB_URI", "mongodb://localhost")]).unwrap();
        assert_eq!(s.title_max_chars, 40);
        assert_eq!(
            s.store,
            StoreBackend::Mongo {
                uri: "mongodb://localhost".to_string(),
                database: "gemchat".to_string(),
            }
        );
    }

    #[test]
    fn firebase_requires_api_key() {
        assert!(matches!(
            settings(&[("AUTH_PROVIDER", "firebase")]),
            Err(ConfigError::Missing("FIREBASE_API_KEY"))
        ));

        let s = settings(&[("AUTH_PROVIDER", "firebase"), ("FIREBASE_API_KEY", "k")]).unwrap();
        assert!(matches!(s.auth, AuthBackend::Firebase { ref api_key, .. } if api_key == "k"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            settings(&[("PORT", "http")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            settings(&[("CHAT_STORE", "sqlite")]),
            Err(ConfigError::Invalid { key: "CHAT_STORE", .. })
        ));
        assert!(matches!(
            settings(&[("TITLE_MAX_CHARS", "0")]),
            Err(ConfigError::Invalid { key: "TITLE_MAX_CHARS", .. })
        ));
        assert!(matches!(
            settings(&[("SESSION_COOKIE_SECURE", "maybe")]),
            Err(ConfigError::Invalid { key: "SESSION_COOKIE_SECURE", .. })
        ));
    }

    #[test]
    fn cookie_overrides() {
        let s = settings(&[("SESSION_COOKIE_NAME", "sid"), ("SESSION_COOKIE_SECURE", "true")]).unwrap();
        assert_eq!(s.cookie.name, "sid");
        assert!(s.cookie.secure);
    }
}
