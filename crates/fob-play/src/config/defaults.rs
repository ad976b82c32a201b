use crate::config::BundlerKind;

/// Name of the config file looked up from the working directory upwards.
pub const CONFIG_FILE_NAME: &str = "fob-play.config.json";

pub fn default_bundler() -> BundlerKind {
    BundlerKind::Rolldown
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_timeout() -> u64 {
    2000
}

pub fn default_ui() -> String {
    "bdd".to_string()
}

pub fn default_reporter() -> &'static str {
    "spec"
}

/// Reporter used when the browser is visible.
pub fn default_watch_reporter() -> &'static str {
    "html"
}

pub fn default_color() -> bool {
    true
}

pub fn default_iterate() -> u32 {
    1
}

pub fn default_framework_script() -> String {
    "/node_modules/mocha/mocha.js".to_string()
}

pub fn default_framework_stylesheet() -> Option<String> {
    Some("/node_modules/mocha/mocha.css".to_string())
}
