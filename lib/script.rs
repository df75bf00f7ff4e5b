//! Rollout script rendering.
//!
//! Templates contain `{{token}}` placeholders. Rendering replaces every token
//! that has a value, clears the optional extension tokens, and removes any
//! other `{{...}}` of the template, so the emitted script never holds a
//! placeholder of its own.

use crate::channel::DeploymentChannel;
use crate::config::{PackagerConfig, RunParameters};
use crate::constants::{DEPLOY_SCRIPT, PROJECT_SETUP_SCRIPT};
use crate::error::{PackError, PackResult};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Tokens cleared to the empty string when a channel does not use them.
pub const OPTIONAL_TOKENS: &[&str] = &["extravariables", "extrapush"];

/// Regex for `{{...}}` placeholders of any content, on a single line.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("Invalid regex pattern"));

const EMBEDDED_DEPLOY: &str = include_str!("../templates/Deploy.ps1");
const EMBEDDED_PROJECT_SETUP: &str = include_str!("../templates/create_update_octopus_project.ps1");

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Provides script templates by logical name.
pub trait TemplateSource {
    /// Load the raw text of template `name`.
    fn load_template(&self, name: &str) -> PackResult<String>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

/// Templates read from `{root}/{name}`.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
}

/// Token name to value table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenValues {
    values: BTreeMap<String, String>,
}

/// Renders templates from a [`TemplateSource`].
#[derive(Debug, Clone)]
pub struct ScriptTemplateEngine<S = EmbeddedTemplates> {
    source: S,
}

/// Which half of a rollout a script drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pre-release: push to staging feeds, create release notes.
    Staging,
    /// Public release: push to public feeds, publish release notes.
    Release,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DirectoryTemplates {
    /// Read templates from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory templates are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TokenValues {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a token value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of bound tokens.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no token is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: TemplateSource> ScriptTemplateEngine<S> {
    /// Engine reading from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Load template `name` and substitute `tokens` into it.
    pub fn render(&self, name: &str, tokens: &TokenValues) -> PackResult<String> {
        let template = self.source.load_template(name)?;
        tracing::debug!("Rendering template {} with {} token(s)", name, tokens.len());
        Ok(render_text(&template, tokens))
    }
}

impl Phase {
    /// Release-notes command the script runs.
    pub fn release_command(self) -> &'static str {
        match self {
            Phase::Staging => "create",
            Phase::Release => "publish",
        }
    }

    /// Line the script prints before doing anything.
    pub fn log_message(self, version: &str) -> String {
        match self {
            Phase::Staging => format!("Creating release for milestone {version} ..."),
            Phase::Release => format!("Publishing release for milestone {version} ..."),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Substitute every `{{...}}` placeholder of `template` in a single pass.
///
/// Bound tokens get their value and unused optional tokens become empty.
/// Anything else between `{{` and `}}` is removed with a warning. Only the
/// template is scanned, so substituted values are inserted verbatim.
pub fn render_text(template: &str, tokens: &TokenValues) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            let name = caps[1].trim();
            if let Some(value) = tokens.get(name) {
                return value.to_string();
            }
            if !OPTIONAL_TOKENS.contains(&name) {
                tracing::warn!("Removing unresolved script token '{}'", &caps[0]);
            }
            String::new()
        })
        .into_owned()
}

/// Tokens describing the product and version.
pub fn identity_tokens(params: &RunParameters) -> TokenValues {
    let mut parts = params.version.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().unwrap_or_default();

    TokenValues::new()
        .with("version", &params.version)
        .with("projectname", &params.project_name)
        .with("Product", &params.project_name)
        .with("Branch", &params.branch)
        .with("Major", major)
        .with("Minor", minor)
}

/// Full token table for the rollout script of `phase` on `channel`.
pub fn deploy_tokens(
    phase: Phase,
    channel: DeploymentChannel,
    params: &RunParameters,
    config: &PackagerConfig,
) -> TokenValues {
    let feeds = &config.feeds;
    let keys = &config.keys;

    let (key, source) = match (phase, channel) {
        (Phase::Staging, DeploymentChannel::Alternate) => {
            (keys.staging.as_str(), source_arg(&feeds.alternate_staging))
        }
        (Phase::Staging, _) => (keys.staging.as_str(), source_arg(&feeds.primary_staging)),
        (Phase::Release, DeploymentChannel::Alternate) => (
            keys.alternate_release.as_str(),
            source_arg(&feeds.alternate_release),
        ),
        (Phase::Release, _) => (keys.primary_release.as_str(), String::new()),
    };

    let mut tokens = identity_tokens(params)
        .with("nugetkey", key)
        .with("nugetsource", source)
        .with("releasecommand", phase.release_command())
        .with("logmessage", phase.log_message(&params.version));

    if channel == DeploymentChannel::Both {
        let (extra_key, extra_feed) = match phase {
            Phase::Staging => (&keys.staging, &feeds.alternate_staging),
            Phase::Release => (&keys.alternate_release, &feeds.alternate_release),
        };
        if phase == Phase::Release {
            tokens.insert("extravariables", format!(", \"{extra_key}\""));
        }
        tokens.insert(
            "extrapush",
            format!(
                "& \"..\\tools\\NuGet.exe\" push $fileName ${extra_key} {}",
                source_arg(extra_feed)
            ),
        );
    }

    tokens
}

/// Render the rollout script for a bundle.
pub fn render_deploy_script<S: TemplateSource>(
    engine: &ScriptTemplateEngine<S>,
    phase: Phase,
    channel: DeploymentChannel,
    params: &RunParameters,
    config: &PackagerConfig,
) -> PackResult<String> {
    engine.render(
        DEPLOY_SCRIPT,
        &deploy_tokens(phase, channel, params, config),
    )
}

/// Render the release-project setup script.
pub fn render_project_setup<S: TemplateSource>(
    engine: &ScriptTemplateEngine<S>,
    params: &RunParameters,
) -> PackResult<String> {
    engine.render(PROJECT_SETUP_SCRIPT, &identity_tokens(params))
}

fn source_arg(feed: &str) -> String {
    if feed.is_empty() {
        String::new()
    } else {
        format!("-Source {feed}")
    }
}

fn template_not_found(name: &str) -> PackError {
    PackError::TemplateNotFound {
        name: name.to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl TemplateSource for EmbeddedTemplates {
    fn load_template(&self, name: &str) -> PackResult<String> {
        match name {
            DEPLOY_SCRIPT => Ok(EMBEDDED_DEPLOY.to_string()),
            PROJECT_SETUP_SCRIPT => Ok(EMBEDDED_PROJECT_SETUP.to_string()),
            _ => Err(template_not_found(name)),
        }
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load_template(&self, name: &str) -> PackResult<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(template_not_found(name)),
            Err(e) => Err(PackError::io(&path, e)),
        }
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn load_template(&self, name: &str) -> PackResult<String> {
        (**self).load_template(name)
    }
}

impl Default for ScriptTemplateEngine<EmbeddedTemplates> {
    fn default() -> Self {
        Self::new(EmbeddedTemplates)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Staging => f.write_str("staging"),
            Phase::Release => f.write_str("release"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
