//! Build-time application constants

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REPO_OWNER: &str = "yoheiyayoi";
pub const REPO_NAME: &str = "bread";
