//! Property bindings for manifest placeholders.
//!
//! A manifest may write `$version$` or `$copyright$` instead of a literal value.
//! [`PropertyBindings`] maps those names to resolvers built once per run. Lookup
//! of a name nobody bound yields `None`; the caller decides what that means.

use crate::config::{PackagerConfig, RunParameters};
use chrono::{Datelike, Local};
use std::collections::BTreeMap;
use std::fmt;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Zero-argument resolver producing a property value.
pub type Resolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Immutable table of property resolvers for one run.
pub struct PropertyBindings {
    resolvers: BTreeMap<String, Resolver>,
}

/// Builder for [`PropertyBindings`].
#[derive(Default)]
pub struct PropertyBindingsBuilder {
    resolvers: BTreeMap<String, Resolver>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PropertyBindings {
    /// Start an empty set of bindings.
    pub fn builder() -> PropertyBindingsBuilder {
        PropertyBindingsBuilder::default()
    }

    /// Standard bindings for a packaging run.
    pub fn for_run(params: &RunParameters, config: &PackagerConfig) -> Self {
        let owners = config.owners.clone();
        let start_year = config.copyright_start_year;

        Self::builder()
            .value("version", &params.version)
            .value("projectname", &params.project_name)
            .value("id", &params.project_name)
            .value("branch", &params.branch)
            .value("authors", &config.authors)
            .value("owners", &config.owners)
            .value("licenseUrl", &config.license_url)
            .value("projectUrl", &config.project_url)
            .value("iconUrl", &config.icon_url)
            .computed("copyright", move || {
                Some(copyright_notice(start_year, Local::now().year(), &owners))
            })
            .computed("year", || Some(Local::now().year().to_string()))
            .computed("date", || Some(Local::now().format("%Y-%m-%d").to_string()))
            .build()
    }

    /// Resolve a property by name (case-insensitive).
    ///
    /// Unknown names return `None`, never an error.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.resolvers
            .get(&name.to_ascii_lowercase())
            .and_then(|resolver| resolver())
    }

    /// Whether a resolver is bound under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(&name.to_ascii_lowercase())
    }

    /// Bound property names, lowercased.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }
}

impl PropertyBindingsBuilder {
    /// Bind a fixed value. Empty values resolve to `None`.
    pub fn value(self, name: &str, value: &str) -> Self {
        let value = (!value.is_empty()).then(|| value.to_string());
        self.computed(name, move || value.clone())
    }

    /// Bind a resolver evaluated at lookup time.
    pub fn computed<F>(mut self, name: &str, resolver: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.resolvers
            .insert(name.to_ascii_lowercase(), Box::new(resolver));
        self
    }

    /// Freeze the bindings.
    pub fn build(self) -> PropertyBindings {
        PropertyBindings {
            resolvers: self.resolvers,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Format the copyright notice for a year range.
pub fn copyright_notice(start_year: i32, current_year: i32, holder: &str) -> String {
    format!("Copyright {start_year}-{current_year} {holder}. All rights reserved")
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Debug for PropertyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBindings")
            .field("names", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn run_params() -> RunParameters {
        RunParameters {
            project_name: "NServiceBus".to_string(),
            version: "5.2.0".to_string(),
            branch: "release-5.2".to_string(),
            tools_root: PathBuf::new(),
            packaging_root: PathBuf::new(),
            primary_output: PathBuf::new(),
            alternate_output: PathBuf::new(),
            deploy_output: PathBuf::new(),
            deploy_content_in_release: false,
        }
    }

    #[test]
    fn test_copyright_spans_current_year() {
        let bindings = PropertyBindings::for_run(&run_params(), &PackagerConfig::default());
        let year = Local::now().year();

        let copyright = bindings.resolve("copyright").unwrap();
        assert!(copyright.contains(&format!("2010-{year}")), "{copyright}");
        assert!(copyright.contains("Particular Software"));
    }

    #[test]
    fn test_unknown_property_is_none() {
        let bindings = PropertyBindings::for_run(&run_params(), &PackagerConfig::default());
        assert_eq!(bindings.resolve("nonexistent"), None);
        assert!(!bindings.contains("nonexistent"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let bindings = PropertyBindings::for_run(&run_params(), &PackagerConfig::default());
        assert_eq!(bindings.resolve("Version").as_deref(), Some("5.2.0"));
        assert_eq!(bindings.resolve("LICENSEURL"), bindings.resolve("licenseUrl"));
        assert_eq!(bindings.resolve("branch").as_deref(), Some("release-5.2"));
    }

    #[test]
    fn test_empty_value_resolves_to_none() {
        let bindings = PropertyBindings::builder()
            .value("branch", "")
            .value("version", "1.0.0")
            .build();
        assert!(bindings.contains("branch"));
        assert_eq!(bindings.resolve("branch"), None);
        assert_eq!(bindings.names().count(), 2);
    }

    #[test]
    fn test_computed_resolver() {
        let bindings = PropertyBindings::builder()
            .computed("answer", || Some("42".to_string()))
            .computed("nothing", || None)
            .build();
        assert_eq!(bindings.resolve("answer").as_deref(), Some("42"));
        assert_eq!(bindings.resolve("nothing"), None);
    }
}
