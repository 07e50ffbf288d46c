//! Class-definition validation
//!
//! Walks an assembled [`DataModel`] and rejects inconsistent schemas.
//! Validation is fail-fast: the first violation aborts with a
//! [`DefinitionError`] naming the offending type and rule. Schema
//! errors are expected to be fixed one at a time during authoring, so
//! nothing is accumulated.

use std::collections::HashSet;

use crate::error::{DefinitionError, Result};
use crate::member::MemberVariable;
use crate::model::{Component, DataModel, Datatype, ExtraCode, Interface, Link, TypeScope};

const COMPONENT_KEYS: &[&str] = &["Members", "ExtraCode", "Description", "Author"];
const COMPONENT_EXTRA_CODE_KEYS: &[&str] = &["declaration", "includes"];
const DATATYPE_KEYS: &[&str] = &[
    "Description",
    "Author",
    "Members",
    "VectorMembers",
    "OneToOneRelations",
    "OneToManyRelations",
    "ExtraCode",
    "MutableExtraCode",
];
const INTERFACE_KEYS: &[&str] = &["Description", "Author", "Members", "Types"];
const LINK_KEYS: &[&str] = &["Description", "Author", "From", "To"];

/// Datatype categories that are reserved but not supported yet; naming
/// one gets a distinguishing hint instead of a plain invalid-key error.
const RESERVED_DATATYPE_KEYS: &[&str] =
    &["TransientMembers", "Typedefs", "StaticMembers", "Templates"];

/// Validate a model, optionally resolving names against a read-only
/// upstream model.
pub fn validate(model: &DataModel, upstream: Option<&DataModel>) -> Result<()> {
    let scope = TypeScope::new(model, upstream);

    for (name, component) in &model.components {
        validate_component(name, component, &scope)?;
    }
    for (name, datatype) in &model.datatypes {
        validate_datatype(name, datatype, model, &scope)?;
    }
    for (name, interface) in &model.interfaces {
        validate_interface(name, interface, model, &scope)?;
    }
    for (name, link) in &model.links {
        validate_link(name, link, model, &scope)?;
    }
    Ok(())
}

fn validate_component(name: &str, component: &Component, scope: &TypeScope) -> Result<()> {
    check_keys(name, &component.declared_keys, COMPONENT_KEYS, &[])?;
    if let Some(ref extra) = component.extra_code {
        check_extra_code_keys(name, extra)?;
    }

    // Components may only hold builtins, fixed arrays of builtins,
    // other components, or arrays of components.
    for member in &component.members {
        let accepted = if member.is_array {
            member.is_builtin_array || scope.has_component(member.resolved_type())
        } else {
            member.is_builtin || scope.has_component(&member.full_type)
        };
        if !accepted {
            return Err(DefinitionError::UndeclaredMemberType {
                name: name.to_string(),
                member: member.name.clone(),
                type_name: member.resolved_type().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_datatype(
    name: &str,
    datatype: &Datatype,
    model: &DataModel,
    scope: &TypeScope,
) -> Result<()> {
    check_keys(name, &datatype.declared_keys, DATATYPE_KEYS, RESERVED_DATATYPE_KEYS)?;
    for mandatory in ["Description", "Author"] {
        if !datatype.declared_keys.iter().any(|k| k == mandatory) {
            return Err(DefinitionError::MissingCategory {
                name: name.to_string(),
                key: mandatory.to_string(),
            });
        }
    }

    validate_datatype_members(name, datatype, model, scope)?;

    for relation in &datatype.one_to_one_relations {
        if !scope.is_relation_target(&relation.full_type) {
            return Err(DefinitionError::InvalidRelation {
                name: name.to_string(),
                relation: "single",
                target: relation.full_type.clone(),
            });
        }
    }
    for relation in &datatype.one_to_many_relations {
        if !scope.is_relation_target(&relation.full_type) {
            return Err(DefinitionError::InvalidRelation {
                name: name.to_string(),
                relation: "many",
                target: relation.full_type.clone(),
            });
        }
    }

    // Vector members hold values, so they can be builtin or component
    // typed but never refer to a datatype.
    for member in &datatype.vector_members {
        if !member.is_builtin && !scope.has_component(&member.full_type) {
            return Err(DefinitionError::InvalidRelation {
                name: name.to_string(),
                relation: "vector member",
                target: member.full_type.clone(),
            });
        }
    }
    Ok(())
}

fn validate_datatype_members(
    name: &str,
    datatype: &Datatype,
    model: &DataModel,
    scope: &TypeScope,
) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let all_named: Vec<&MemberVariable> = datatype
        .members
        .iter()
        .chain(&datatype.vector_members)
        .chain(&datatype.one_to_one_relations)
        .chain(&datatype.one_to_many_relations)
        .collect();
    for member in &all_named {
        if !seen.insert(member.name.as_str()) {
            return Err(DefinitionError::DuplicateMember {
                name: name.to_string(),
                member: member.name.clone(),
                detail: String::new(),
            });
        }
    }

    for member in &datatype.members {
        let accepted = if member.is_array {
            member.is_builtin_array || scope.has_component(member.resolved_type())
        } else {
            member.is_builtin || scope.has_component(&member.full_type)
        };
        if !accepted {
            return Err(DefinitionError::UndeclaredMemberType {
                name: name.to_string(),
                member: member.name.clone(),
                type_name: member.resolved_type().to_string(),
            });
        }
    }

    if model.options.expose_pod_members {
        check_exposed_pod_members(name, datatype, scope)?;
    }
    Ok(())
}

/// With exposePODMembers enabled, component sub-fields share the
/// datatype's accessor name space and must not clash with it or with
/// each other.
fn check_exposed_pod_members(name: &str, datatype: &Datatype, scope: &TypeScope) -> Result<()> {
    let mut exposed: HashSet<String> = datatype
        .members
        .iter()
        .map(|m| m.name.clone())
        .collect();
    for member in &datatype.members {
        let Some(component) = scope.component(&member.full_type) else {
            continue;
        };
        for sub in &component.members {
            if !exposed.insert(sub.name.clone()) {
                return Err(DefinitionError::DuplicateMember {
                    name: name.to_string(),
                    member: sub.name.clone(),
                    detail: format!(
                        " (exposed through component member '{}' of type '{}')",
                        member.name, member.full_type
                    ),
                });
            }
        }
    }
    Ok(())
}

fn validate_interface(
    name: &str,
    interface: &Interface,
    model: &DataModel,
    scope: &TypeScope,
) -> Result<()> {
    // Interfaces declare exactly these four categories.
    check_keys(name, &interface.declared_keys, INTERFACE_KEYS, &[])?;
    for mandatory in INTERFACE_KEYS {
        if !interface.declared_keys.iter().any(|k| k == mandatory) {
            return Err(DefinitionError::MissingCategory {
                name: name.to_string(),
                key: (*mandatory).to_string(),
            });
        }
    }

    if model.has_datatype(name) {
        return Err(DefinitionError::NameClash {
            name: name.to_string(),
        });
    }

    for type_name in &interface.types {
        if !scope.has_datatype(type_name) {
            return Err(DefinitionError::InvalidDefinition {
                name: name.to_string(),
                message: format!("interface lists undeclared datatype '{type_name}'"),
            });
        }
    }
    Ok(())
}

fn validate_link(name: &str, link: &Link, model: &DataModel, scope: &TypeScope) -> Result<()> {
    check_keys(name, &link.declared_keys, LINK_KEYS, &[])?;
    for mandatory in LINK_KEYS {
        if !link.declared_keys.iter().any(|k| k == mandatory) {
            return Err(DefinitionError::MissingCategory {
                name: name.to_string(),
                key: (*mandatory).to_string(),
            });
        }
    }

    if model.has_datatype(name) || model.has_interface(name) {
        return Err(DefinitionError::NameClash {
            name: name.to_string(),
        });
    }

    for (side, target) in [("From", &link.from_type), ("To", &link.to_type)] {
        if !scope.is_relation_target(target) {
            return Err(DefinitionError::InvalidDefinition {
                name: name.to_string(),
                message: format!("link {side} references unresolvable type '{target}'"),
            });
        }
    }
    Ok(())
}

fn check_keys(
    name: &str,
    declared: &[String],
    allowed: &[&str],
    reserved: &[&str],
) -> Result<()> {
    for key in declared {
        if !allowed.contains(&key.as_str()) {
            let hint = if reserved.contains(&key.as_str()) {
                " (not yet implemented)".to_string()
            } else {
                String::new()
            };
            return Err(DefinitionError::InvalidCategory {
                name: name.to_string(),
                key: key.clone(),
                hint,
            });
        }
    }
    Ok(())
}

fn check_extra_code_keys(name: &str, extra: &ExtraCode) -> Result<()> {
    for key in &extra.declared_keys {
        if !COMPONENT_EXTRA_CODE_KEYS.contains(&key.as_str()) {
            return Err(DefinitionError::InvalidCategory {
                name: name.to_string(),
                key: format!("ExtraCode.{key}"),
                hint: String::new(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_model;

    fn valid_doc() -> &'static str {
        r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
      - float y
      - float z
datatypes:
  Cluster:
    Description: "a cluster"
    Author: "a"
    Members:
      - float energy // energy
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - Vector3 position // where
    OneToManyRelations:
      - Cluster clusters // clusters
"#
    }

    #[test]
    fn test_valid_schema_passes() {
        let model = read_model(valid_doc(), "edmtest").unwrap();
        validate(&model, None).unwrap();
    }

    #[test]
    fn test_component_with_invalid_key() {
        let doc = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
    OneToOneRelations:
      - float y
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidCategory { .. }));
    }

    #[test]
    fn test_component_extra_code_implementation_rejected() {
        let doc = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
    ExtraCode:
      implementation: "void f();"
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidCategory { ref key, .. } if key == "ExtraCode.implementation"));
    }

    #[test]
    fn test_component_member_must_be_builtin_or_component() {
        let doc = r#"
schema_version: 1
components:
  Bad:
    Members:
      - SomeUnknown thing
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::UndeclaredMemberType { .. }));
    }

    #[test]
    fn test_datatype_missing_author() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Members:
      - float energy // energy
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingCategory { ref key, .. } if key == "Author"));
    }

    #[test]
    fn test_reserved_datatype_key_hint() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Typedefs:
      - something
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("not yet implemented"), "got: {text}");
    }

    #[test]
    fn test_relation_to_component_rejected() {
        let doc = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    OneToOneRelations:
      - Vector3 position // not allowed
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(
            matches!(err, DefinitionError::InvalidRelation { relation: "single", .. }),
            "got: {err}"
        );
    }

    #[test]
    fn test_relation_to_unknown_rejected() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    OneToManyRelations:
      - Nowhere links // dangling
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidRelation { relation: "many", .. }));
    }

    #[test]
    fn test_vector_member_of_datatype_rejected() {
        let doc = r#"
schema_version: 1
datatypes:
  Cluster:
    Description: "c"
    Author: "a"
    Members:
      - float energy // energy
  Hit:
    Description: "a hit"
    Author: "a"
    VectorMembers:
      - Cluster clusters // not allowed
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidRelation { relation: "vector member", .. }));
    }

    #[test]
    fn test_duplicate_member_names() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // energy
      - int energy // again
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateMember { .. }));
    }

    #[test]
    fn test_expose_pod_members_clash() {
        let doc = r#"
schema_version: 1
options:
  exposePODMembers: true
components:
  Vector3:
    Members:
      - float x
      - float energy
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // own energy
      - Vector3 position // exposes a clashing 'energy'
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateMember { ref detail, .. } if detail.contains("position")));
    }

    #[test]
    fn test_interface_rules() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // energy
interfaces:
  TrackerObject:
    Description: "union"
    Author: "a"
    Members:
      - float energy // energy
    Types:
      - Hit
"#;
        let model = read_model(doc, "edmtest").unwrap();
        validate(&model, None).unwrap();
    }

    #[test]
    fn test_interface_with_unknown_type() {
        let doc = r#"
schema_version: 1
interfaces:
  TrackerObject:
    Description: "union"
    Author: "a"
    Members:
      - float energy // energy
    Types:
      - Missing
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_interface_name_clash_with_datatype() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // energy
interfaces:
  Hit:
    Description: "clashes"
    Author: "a"
    Members:
      - float energy // energy
    Types:
      - Hit
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::NameClash { .. }));
    }

    #[test]
    fn test_link_rules() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // energy
  Cluster:
    Description: "c"
    Author: "a"
    Members:
      - float energy // energy
links:
  HitClusterLink:
    Description: "l"
    Author: "a"
    From: Hit
    To: Cluster
"#;
        let model = read_model(doc, "edmtest").unwrap();
        validate(&model, None).unwrap();
    }

    #[test]
    fn test_link_with_unresolvable_endpoint() {
        let doc = r#"
schema_version: 1
datatypes:
  Hit:
    Description: "a hit"
    Author: "a"
    Members:
      - float energy // energy
links:
  BadLink:
    Description: "l"
    Author: "a"
    From: Hit
    To: Missing
"#;
        let model = read_model(doc, "edmtest").unwrap();
        let err = validate(&model, None).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_upstream_resolution() {
        let upstream_doc = r#"
schema_version: 1
components:
  UpVec:
    Members:
      - float x
datatypes:
  UpHit:
    Description: "upstream hit"
    Author: "a"
    Members:
      - float energy // energy
"#;
        let doc = r#"
schema_version: 1
datatypes:
  Local:
    Description: "local"
    Author: "a"
    Members:
      - UpVec vec // upstream component member
    OneToOneRelations:
      - UpHit hit // upstream relation target
"#;
        let upstream = read_model(upstream_doc, "upstream").unwrap();
        let model = read_model(doc, "edmtest").unwrap();
        assert!(validate(&model, None).is_err());
        validate(&model, Some(&upstream)).unwrap();
    }
}
