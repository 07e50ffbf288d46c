//! C++ backend
//!
//! The canonical in-tree implementor of [`LanguageBackend`]. Produces
//! the per-type rendering context consumed by the template layer, and
//! synthesizes migration rules for confirmed member renames.

use serde::Serialize;
use serde_json::{json, Value};

use super::LanguageBackend;
use crate::deps::IncludePlan;
use crate::evolution::{DiffResult, SchemaChange};
use crate::member::MemberVariable;
use crate::model::{Component, Datatype, Interface, Link};

#[derive(Debug, Default)]
pub struct CppBackend {
    /// Emit get/set-prefixed accessors instead of plain names
    pub get_syntax: bool,
}

impl CppBackend {
    pub fn new(get_syntax: bool) -> Self {
        Self { get_syntax }
    }

    fn member_context(&self, member: &MemberVariable) -> Value {
        json!({
            "name": member.name,
            "type": member.full_type,
            "getter": self.getter_name(&member.name),
            "setter": self.setter_name(&member.name),
            "description": member.description,
            "unit": member.unit,
            "default": member.default_val,
            "is_array": member.is_array,
        })
    }

    fn getter_name(&self, member: &str) -> String {
        if self.get_syntax {
            format!("get{}", capitalize(member))
        } else {
            member.to_string()
        }
    }

    fn setter_name(&self, member: &str) -> String {
        if self.get_syntax {
            format!("set{}", capitalize(member))
        } else {
            member.to_string()
        }
    }

    fn include_context(plan: &IncludePlan) -> Value {
        json!({
            "header": plan.header_includes,
            "source": plan.source_includes,
            "forward_declarations": plan
                .forward_declarations
                .iter()
                .map(|t| t.full_type())
                .collect::<Vec<_>>(),
        })
    }
}

impl LanguageBackend for CppBackend {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn process_component(&self, name: &str, component: &Component, plan: &IncludePlan) -> Value {
        json!({
            "kind": "component",
            "class": name,
            "description": component.description,
            "members": component
                .members
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
            "includes": Self::include_context(plan),
            "extra_code": component.extra_code.as_ref().map(|e| json!({
                "declaration": e.declaration,
                "includes": e.includes,
            })),
        })
    }

    fn process_datatype(&self, name: &str, datatype: &Datatype, plan: &IncludePlan) -> Value {
        json!({
            "kind": "datatype",
            "class": name,
            "collection": format!("{}Collection", bare_name(name)),
            "description": datatype.description,
            "author": datatype.author,
            "members": datatype
                .members
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
            "vector_members": datatype
                .vector_members
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
            "one_to_one_relations": datatype
                .one_to_one_relations
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
            "one_to_many_relations": datatype
                .one_to_many_relations
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
            "includes": Self::include_context(plan),
        })
    }

    fn process_interface(&self, name: &str, interface: &Interface) -> Value {
        json!({
            "kind": "interface",
            "class": name,
            "description": interface.description,
            "types": interface.types,
            "members": interface
                .members
                .iter()
                .map(|m| self.member_context(m))
                .collect::<Vec<_>>(),
        })
    }

    fn process_link(&self, name: &str, link: &Link) -> Value {
        json!({
            "kind": "link",
            "class": name,
            "description": link.description,
            "from": link.from_type,
            "to": link.to_type,
        })
    }
}

/// One synthesized migration instruction: read the old field, assign
/// it to the new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRule {
    pub definition: String,
    pub from_version: u32,
    pub read_name: String,
    pub assign_name: String,
    pub member_type: String,
}

/// Synthesize migration rules from a comparison result.
///
/// Only confirmed member renames need constructed migration code; the
/// backend handles additions, drops, and whole-type renames itself.
pub fn migration_rules(diff: &DiffResult, old_version: u32) -> Vec<MigrationRule> {
    diff.backend_relevant_changes()
        .into_iter()
        .filter_map(|change| match change {
            SchemaChange::RenamedMember {
                definition,
                old_name,
                new_name,
                member_type,
            } => Some(MigrationRule {
                definition: definition.clone(),
                from_version: old_version,
                read_name: old_name.clone(),
                assign_name: new_name.clone(),
                member_type: member_type.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn bare_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
