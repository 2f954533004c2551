pub mod settings;

pub use settings::{
    AppSettings, DatabaseSettings, JwtSettings, PushSettings, Settings, StorageBackend,
};
