//! Configuration module

mod env;
mod settings;
mod site;

pub use env::EnvVars;
pub use settings::{Settings, WebConfig};
pub use site::SiteConfig;
