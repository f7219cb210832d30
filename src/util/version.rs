pub const APP_NAME: &str = "hal-market";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// `User-Agent` sent with dataset requests.
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME, version_label())
}
