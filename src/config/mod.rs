pub mod database;
pub mod redis;
pub mod settings;

pub use settings::{AuthBackend, ConfigError, CookieSettings, Settings, StoreBackend};
