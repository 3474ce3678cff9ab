mod global;
mod model;

pub use global::CONFIG;
pub use model::{
    CatalogConfig, LoggingConfig, Settings, SidecarConfig, load_settings, load_settings_from,
};
