//! The parsed data model
//!
//! Shared vocabulary for every other component: [`DataType`],
//! [`Component`], [`Datatype`], [`Interface`], [`Link`], and the root
//! [`DataModel`] aggregate. A `DataModel` is built once per compilation
//! run and treated as read-only after validation; backends work on
//! derived views, never on the canonical model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::member::{split_scoped_name, MemberVariable};

/// A lightweight (namespace, bare name) pair referring to a declared
/// component, datatype, or interface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataType {
    pub namespace: Option<String>,
    pub bare_type: String,
}

impl DataType {
    /// Split a possibly qualified name; rejects nested namespaces.
    pub fn parse(full_type: &str) -> Result<Self> {
        let (namespace, bare_type) = split_scoped_name(full_type)?;
        Ok(Self { namespace, bare_type })
    }

    /// The fully qualified name.
    pub fn full_type(&self) -> String {
        match self.namespace {
            Some(ref ns) => format!("{ns}::{}", self.bare_type),
            None => self.bare_type.clone(),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_type())
    }
}

/// User-supplied code fragments attached to a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraCode {
    /// Declarations injected into the generated class body
    #[serde(default)]
    pub declaration: Option<String>,
    /// Extra include statements the declarations need
    #[serde(default)]
    pub includes: Option<String>,
    /// Implementation code for the translation unit
    #[serde(default)]
    pub implementation: Option<String>,
    /// Keys as they appeared in the document, for category validation
    #[serde(skip)]
    pub declared_keys: Vec<String>,
}

/// A plain aggregate of builtin-typed fields (or nested components).
///
/// Components are usable as member types but are never the target of a
/// relation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub members: Vec<MemberVariable>,
    #[serde(default)]
    pub extra_code: Option<ExtraCode>,
    /// Keys as they appeared in the document, for category validation
    #[serde(skip)]
    pub declared_keys: Vec<String>,
}

/// A top-level schema entity with identity, owning members, vector
/// members, and relations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Datatype {
    pub description: String,
    pub author: String,
    #[serde(default)]
    pub members: Vec<MemberVariable>,
    #[serde(default)]
    pub vector_members: Vec<MemberVariable>,
    #[serde(default)]
    pub one_to_one_relations: Vec<MemberVariable>,
    #[serde(default)]
    pub one_to_many_relations: Vec<MemberVariable>,
    #[serde(default)]
    pub extra_code: Option<ExtraCode>,
    #[serde(default)]
    pub mutable_extra_code: Option<ExtraCode>,
    /// Keys as they appeared in the document, for category validation
    #[serde(skip)]
    pub declared_keys: Vec<String>,
}

/// A closed-set tagged union over a fixed list of concrete datatypes,
/// usable as a relation target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interface {
    pub description: String,
    pub author: String,
    #[serde(default)]
    pub members: Vec<MemberVariable>,
    /// Fully qualified names of the datatypes this interface can hold
    pub types: Vec<String>,
    /// Keys as they appeared in the document, for category validation
    #[serde(skip)]
    pub declared_keys: Vec<String>,
}

/// A typed directed edge between two resolvable datatype/interface names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    pub description: String,
    pub author: String,
    pub from_type: String,
    pub to_type: String,
    /// Keys as they appeared in the document, for category validation
    #[serde(skip)]
    pub declared_keys: Vec<String>,
}

/// Configuration constants, fixed for a whole compilation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Generate get/set-prefixed accessors instead of plain ones
    #[serde(default)]
    pub get_syntax: bool,
    /// Flatten component sub-fields into the owning datatype's accessors
    #[serde(default)]
    pub expose_pod_members: bool,
    /// Path prefix for generated include statements; empty when includes
    /// live at the top level
    #[serde(default)]
    pub include_subfolder: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            get_syntax: false,
            expose_pod_members: false,
            include_subfolder: String::new(),
        }
    }
}

/// The root aggregate of one compilation run.
///
/// Maps are keyed by fully qualified type name; `BTreeMap` keeps
/// iteration (and therefore generated output and diff reports)
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataModel {
    pub package_name: String,
    pub options: ModelOptions,
    /// Mandatory, positive schema version
    pub schema_version: u32,
    pub components: BTreeMap<String, Component>,
    pub datatypes: BTreeMap<String, Datatype>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, Interface>,
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

impl DataModel {
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn has_datatype(&self, name: &str) -> bool {
        self.datatypes.contains_key(name)
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    pub fn has_link(&self, name: &str) -> bool {
        self.links.contains_key(name)
    }

    /// True if `name` is declared as any kind of type in this model.
    pub fn has_type(&self, name: &str) -> bool {
        self.has_component(name) || self.has_datatype(name) || self.has_interface(name)
    }
}

/// Name resolution over the current model plus an optional read-only
/// upstream model compiled separately.
#[derive(Debug, Clone, Copy)]
pub struct TypeScope<'a> {
    pub model: &'a DataModel,
    pub upstream: Option<&'a DataModel>,
}

impl<'a> TypeScope<'a> {
    pub fn new(model: &'a DataModel, upstream: Option<&'a DataModel>) -> Self {
        Self { model, upstream }
    }

    pub fn component(&self, name: &str) -> Option<&'a Component> {
        self.model
            .components
            .get(name)
            .or_else(|| self.upstream.and_then(|u| u.components.get(name)))
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.component(name).is_some()
    }

    pub fn has_datatype(&self, name: &str) -> bool {
        self.model.has_datatype(name) || self.upstream.is_some_and(|u| u.has_datatype(name))
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.model.has_interface(name) || self.upstream.is_some_and(|u| u.has_interface(name))
    }

    /// True if `name` resolves to a legal relation target: a datatype or
    /// an interface, locally or upstream.
    pub fn is_relation_target(&self, name: &str) -> bool {
        self.has_datatype(name) || self.has_interface(name)
    }
}
