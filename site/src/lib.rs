pub mod app;
pub mod config;

pub use app::site_router;
pub use config::{SiteConfig, SiteConfigError};
