//! Code-generation boundary
//!
//! The front end hands the rendering backend a pre-processed,
//! per-type context: include statements, forward declarations, and
//! namespace groupings, all computed here. Template rendering and file
//! emission live outside this crate.
//!
//! Backends implement [`LanguageBackend`], one method per hook, and
//! are registered explicitly in a priority-ordered list at start-up;
//! there is no implicit global registry.

pub mod cpp;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::deps::{IncludePlan, IncludePlanner};
use crate::error::Result;
use crate::model::{Component, DataModel, Datatype, Interface, Link};

/// One hook per definition kind. Backends never mutate the canonical
/// model; they only see it plus the derived include plans.
pub trait LanguageBackend {
    fn name(&self) -> &'static str;

    fn process_component(&self, name: &str, component: &Component, plan: &IncludePlan) -> Value;
    fn process_datatype(&self, name: &str, datatype: &Datatype, plan: &IncludePlan) -> Value;
    fn process_interface(&self, name: &str, interface: &Interface) -> Value;
    fn process_link(&self, name: &str, link: &Link) -> Value;
}

/// An explicit backend registration. Lower priority runs first.
pub struct BackendRegistration {
    pub priority: u32,
    pub backend: Box<dyn LanguageBackend>,
}

/// The ordered list of registered backends, populated at start-up.
#[derive(Default)]
pub struct BackendRegistry {
    entries: Vec<BackendRegistration>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the in-tree backends registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(10, Box::new(cpp::CppBackend::default()));
        registry
    }

    /// The registry with the in-tree backends configured for a model's
    /// options.
    pub fn for_options(options: &crate::model::ModelOptions) -> Self {
        let mut registry = Self::new();
        registry.register(10, Box::new(cpp::CppBackend::new(options.get_syntax)));
        registry
    }

    pub fn register(&mut self, priority: u32, backend: Box<dyn LanguageBackend>) {
        self.entries.push(BackendRegistration { priority, backend });
        self.entries.sort_by_key(|e| e.priority);
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn LanguageBackend> {
        self.entries.iter().map(|e| e.backend.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn LanguageBackend> {
        self.backends().find(|b| b.name() == name)
    }
}

/// The derived, augmented view handed to a rendering backend.
///
/// The canonical [`DataModel`] stays read-only; everything here is
/// owned by the backend run.
#[derive(Debug, Serialize)]
pub struct GeneratorContext {
    pub package_name: String,
    pub schema_version: u32,
    /// Per-type pre-processed rendering context
    pub types: BTreeMap<String, Value>,
    /// Type names grouped by namespace (empty key for the global one)
    pub namespace_groups: BTreeMap<String, Vec<String>>,
}

/// Build the full rendering context for one backend.
pub fn build_context(
    backend: &dyn LanguageBackend,
    model: &DataModel,
    upstream: Option<&DataModel>,
) -> Result<GeneratorContext> {
    let plans = IncludePlanner::new(model, upstream)?.plan()?;
    let empty = IncludePlan::default();

    let mut types = BTreeMap::new();
    for (name, component) in &model.components {
        let plan = plans.get(name).unwrap_or(&empty);
        types.insert(name.clone(), backend.process_component(name, component, plan));
    }
    for (name, datatype) in &model.datatypes {
        let plan = plans.get(name).unwrap_or(&empty);
        types.insert(name.clone(), backend.process_datatype(name, datatype, plan));
    }
    for (name, interface) in &model.interfaces {
        types.insert(name.clone(), backend.process_interface(name, interface));
    }
    for (name, link) in &model.links {
        types.insert(name.clone(), backend.process_link(name, link));
    }

    let mut namespace_groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in types.keys() {
        let (namespace, _) = crate::member::split_scoped_name(name)?;
        namespace_groups
            .entry(namespace.unwrap_or_default())
            .or_default()
            .push(name.clone());
    }

    debug!(
        backend = backend.name(),
        types = types.len(),
        "generator context built"
    );
    Ok(GeneratorContext {
        package_name: model.package_name.clone(),
        schema_version: model.schema_version,
        types,
        namespace_groups,
    })
}
