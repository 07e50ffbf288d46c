//! Schema document reader
//!
//! Loads a YAML schema document, parses every member declaration
//! through the [`MemberParser`], and assembles the canonical
//! [`DataModel`]. Fails fast on the first malformed declaration or a
//! missing `schema_version`.
//!
//! Key-set validation (which categories a definition may declare) is
//! the validator's job; the reader records the raw keys it saw so the
//! validator can check them.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{DefinitionError, Result};
use crate::member::{MemberParser, MemberVariable};
use crate::model::{Component, DataModel, Datatype, ExtraCode, Interface, Link, ModelOptions};

/// Read a schema document from a file.
pub fn read_model_file(path: impl AsRef<Path>, package_name: &str) -> Result<DataModel> {
    let document = std::fs::read_to_string(path)?;
    read_model(&document, package_name)
}

/// Read a schema document from text.
///
/// The resulting model owns all of its structures; nothing in it
/// aliases the document or any other model.
pub fn read_model(document: &str, package_name: &str) -> Result<DataModel> {
    let root: Value = serde_yaml::from_str(document)?;
    let root = root
        .as_mapping()
        .ok_or_else(|| DefinitionError::MalformedDocument("top level must be a mapping".into()))?;

    let parser = MemberParser::new();
    let mut model = DataModel {
        package_name: package_name.to_string(),
        schema_version: read_schema_version(root)?,
        ..DataModel::default()
    };
    model.options = read_options(root.get("options"), package_name)?;

    if let Some(components) = root.get("components") {
        for (name, body) in expect_mapping(components, "components")? {
            let name = expect_string_key(name, "components")?;
            let component = read_component(&parser, &name, body)?;
            model.components.insert(name, component);
        }
    }

    if let Some(datatypes) = root.get("datatypes") {
        for (name, body) in expect_mapping(datatypes, "datatypes")? {
            let name = expect_string_key(name, "datatypes")?;
            let datatype = read_datatype(&parser, &name, body)?;
            model.datatypes.insert(name, datatype);
        }
    }

    if let Some(interfaces) = root.get("interfaces") {
        for (name, body) in expect_mapping(interfaces, "interfaces")? {
            let name = expect_string_key(name, "interfaces")?;
            let interface = read_interface(&parser, &name, body)?;
            model.interfaces.insert(name, interface);
        }
    }

    if let Some(links) = root.get("links") {
        for (name, body) in expect_mapping(links, "links")? {
            let name = expect_string_key(name, "links")?;
            let link = read_link(&name, body)?;
            model.links.insert(name, link);
        }
    }

    debug!(
        package = package_name,
        schema_version = model.schema_version,
        components = model.components.len(),
        datatypes = model.datatypes.len(),
        interfaces = model.interfaces.len(),
        links = model.links.len(),
        "schema document read"
    );

    Ok(model)
}

fn read_schema_version(root: &Mapping) -> Result<u32> {
    let value = root
        .get("schema_version")
        .ok_or(DefinitionError::MissingSchemaVersion)?;
    match value.as_u64() {
        Some(v) if v > 0 && v <= u32::MAX as u64 => Ok(v as u32),
        _ => Err(DefinitionError::MissingSchemaVersion),
    }
}

fn read_options(options: Option<&Value>, package_name: &str) -> Result<ModelOptions> {
    let mut out = ModelOptions::default();
    let Some(options) = options else {
        return Ok(out);
    };
    let options = options
        .as_mapping()
        .ok_or_else(|| DefinitionError::MalformedDocument("'options' must be a mapping".into()))?;

    if let Some(v) = options.get("getSyntax") {
        out.get_syntax = expect_bool(v, "getSyntax")?;
    }
    if let Some(v) = options.get("exposePODMembers") {
        out.expose_pod_members = expect_bool(v, "exposePODMembers")?;
    }
    // includeSubfolder accepts a bool (use the package name) or an
    // explicit path prefix.
    if let Some(v) = options.get("includeSubfolder") {
        out.include_subfolder = match v {
            Value::Bool(true) => format!("{package_name}/"),
            Value::Bool(false) => String::new(),
            Value::String(s) => {
                let mut s = s.clone();
                if !s.is_empty() && !s.ends_with('/') {
                    s.push('/');
                }
                s
            }
            _ => {
                return Err(DefinitionError::MalformedDocument(
                    "'includeSubfolder' must be a bool or a string".into(),
                ))
            }
        };
    }
    Ok(out)
}

fn read_component(parser: &MemberParser, name: &str, body: &Value) -> Result<Component> {
    let body = definition_body(name, body)?;
    let mut component = Component {
        declared_keys: key_names(body),
        ..Component::default()
    };
    // Component members may omit descriptions.
    component.members = read_members(parser, name, body.get("Members"), false)?;
    component.description = opt_string(body.get("Description"));
    component.author = opt_string(body.get("Author"));
    component.extra_code = read_extra_code(name, body.get("ExtraCode"))?;
    Ok(component)
}

fn read_datatype(parser: &MemberParser, name: &str, body: &Value) -> Result<Datatype> {
    let body = definition_body(name, body)?;
    let mut datatype = Datatype {
        declared_keys: key_names(body),
        ..Datatype::default()
    };
    datatype.description = opt_string(body.get("Description")).unwrap_or_default();
    datatype.author = opt_string(body.get("Author")).unwrap_or_default();
    datatype.members = read_members(parser, name, body.get("Members"), true)?;
    datatype.vector_members = read_members(parser, name, body.get("VectorMembers"), true)?;
    datatype.one_to_one_relations =
        read_members(parser, name, body.get("OneToOneRelations"), true)?;
    datatype.one_to_many_relations =
        read_members(parser, name, body.get("OneToManyRelations"), true)?;
    datatype.extra_code = read_extra_code(name, body.get("ExtraCode"))?;
    datatype.mutable_extra_code = read_extra_code(name, body.get("MutableExtraCode"))?;
    Ok(datatype)
}

fn read_interface(parser: &MemberParser, name: &str, body: &Value) -> Result<Interface> {
    let body = definition_body(name, body)?;
    Ok(Interface {
        declared_keys: key_names(body),
        description: opt_string(body.get("Description")).unwrap_or_default(),
        author: opt_string(body.get("Author")).unwrap_or_default(),
        members: read_members(parser, name, body.get("Members"), true)?,
        types: string_list(name, body.get("Types"))?,
    })
}

fn read_link(name: &str, body: &Value) -> Result<Link> {
    let body = definition_body(name, body)?;
    Ok(Link {
        declared_keys: key_names(body),
        description: opt_string(body.get("Description")).unwrap_or_default(),
        author: opt_string(body.get("Author")).unwrap_or_default(),
        from_type: opt_string(body.get("From")).unwrap_or_default(),
        to_type: opt_string(body.get("To")).unwrap_or_default(),
    })
}

fn read_members(
    parser: &MemberParser,
    name: &str,
    values: Option<&Value>,
    require_description: bool,
) -> Result<Vec<MemberVariable>> {
    let Some(values) = values else {
        return Ok(Vec::new());
    };
    let values = values.as_sequence().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("member list of '{name}' must be a sequence"))
    })?;
    values
        .iter()
        .map(|v| {
            let decl = v.as_str().ok_or_else(|| {
                DefinitionError::MalformedDocument(format!(
                    "member declarations of '{name}' must be strings"
                ))
            })?;
            parser.parse(decl, require_description)
        })
        .collect()
}

fn read_extra_code(name: &str, value: Option<&Value>) -> Result<Option<ExtraCode>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let body = value.as_mapping().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("ExtraCode of '{name}' must be a mapping"))
    })?;
    Ok(Some(ExtraCode {
        declaration: opt_string(body.get("declaration")),
        includes: opt_string(body.get("includes")),
        implementation: opt_string(body.get("implementation")),
        declared_keys: key_names(body),
    }))
}

fn definition_body<'a>(name: &str, body: &'a Value) -> Result<&'a Mapping> {
    body.as_mapping().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("definition of '{name}' must be a mapping"))
    })
}

fn expect_mapping<'a>(value: &'a Value, section: &str) -> Result<&'a Mapping> {
    value.as_mapping().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("'{section}' must be a mapping"))
    })
}

fn expect_string_key(key: &Value, section: &str) -> Result<String> {
    key.as_str().map(str::to_string).ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("'{section}' keys must be strings"))
    })
}

fn expect_bool(value: &Value, option: &str) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("option '{option}' must be a bool"))
    })
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn string_list(name: &str, value: Option<&Value>) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let seq = value.as_sequence().ok_or_else(|| {
        DefinitionError::MalformedDocument(format!("type list of '{name}' must be a sequence"))
    })?;
    seq.iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                DefinitionError::MalformedDocument(format!(
                    "type list entries of '{name}' must be strings"
                ))
            })
        })
        .collect()
}

fn key_names(body: &Mapping) -> Vec<String> {
    body.keys()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}
