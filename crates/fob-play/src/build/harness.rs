//! The HTML page that loads the framework, the tests and starts the run.
//!
//! Harness options travel as a JSON data block inside the page. The setup
//! script parses it, configures mocha, publishes `window.mochaStatus` and
//! exposes `window.__fobPlayRun`, which the last script tag calls once all
//! test scripts have executed.

use crate::config::HarnessOptions;
use crate::error::BuildError;
use minijinja::{context, AutoEscape, Environment};
use serde::Serialize;

const TEMPLATE: &str = include_str!("../../assets/harness.html");
const SETUP_SCRIPT: &str = include_str!("../../assets/harness-setup.js");

/// DOM id of the element holding the serialized harness options.
pub const OPTIONS_ELEMENT_ID: &str = "fob-play-options";

/// A script loaded by the harness after the setup script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptTag {
    /// Server path
    pub src: String,
    /// Load as an ES module
    pub module: bool,
}

impl ScriptTag {
    /// A classic script.
    pub fn classic(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            module: false,
        }
    }

    /// An ES module script.
    pub fn module(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            module: true,
        }
    }
}

/// Renders the harness page.
///
/// If any script is a module, the start call is a module script too, so it
/// runs after every test module has executed.
///
/// # Errors
///
/// Returns `Harness` if the options can't be serialized or the template fails.
pub fn render_harness(options: &HarnessOptions, scripts: &[ScriptTag]) -> Result<String, BuildError> {
    let mut env = Environment::new();
    // Script bodies are emitted verbatim; attribute values go through `attr`.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("attr", escape_attribute);
    env.add_template("harness.html", TEMPLATE)
        .map_err(|e| BuildError::Harness(e.to_string()))?;

    let template = env
        .get_template("harness.html")
        .map_err(|e| BuildError::Harness(e.to_string()))?;

    template
        .render(context! {
            title => "fob-play",
            stylesheet => options.framework.stylesheet,
            framework_script => options.framework.script,
            options_id => OPTIONS_ELEMENT_ID,
            options_json => script_safe_json(options)?,
            setup_script => SETUP_SCRIPT,
            scripts => scripts,
            module => scripts.iter().any(|script| script.module),
        })
        .map_err(|e| BuildError::Harness(e.to_string()))
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Serializes `value` so it can sit inside a `<script>` element verbatim.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\u` escapes
/// decode to the same text.
fn script_safe_json<T: Serialize>(value: &T) -> Result<String, BuildError> {
    let json = serde_json::to_string(value).map_err(|e| BuildError::Harness(e.to_string()))?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}
