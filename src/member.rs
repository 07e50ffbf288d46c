//! Member-declaration parsing
//!
//! Turns one textual member declaration such as
//! `std::array<float, 3> position{1, 2, 3} [mm] // hit position`
//! into a typed [`MemberVariable`] record.
//!
//! The grammar has four alternatives, tried in order: array with
//! description, scalar with description, and (only when descriptions are
//! optional) the same two without the trailing comment.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DefinitionError, Result};

/// The closed set of builtin value types a schema may use directly.
///
/// Fixed-width integers are handled separately, see
/// [`ALLOWED_FIXED_WIDTH_TYPES`].
pub const BUILTIN_TYPES: &[&str] = &[
    "int",
    "long",
    "float",
    "double",
    "unsigned int",
    "unsigned",
    "unsigned long",
    "char",
    "short",
    "bool",
    "long long",
    "unsigned long long",
];

/// Fixed-width integer types accepted in schemas, with or without a
/// `std::` qualifier. 8-bit and `_least`/`_fast` variants are rejected.
pub const ALLOWED_FIXED_WIDTH_TYPES: &[&str] = &[
    "int16_t", "int32_t", "int64_t", "uint16_t", "uint32_t", "uint64_t",
];

/// Split a possibly scope-qualified type name into (namespace, bare name).
///
/// At most one scope separator is allowed; deeper nesting is a
/// definition error.
pub fn split_scoped_name(full_type: &str) -> Result<(Option<String>, String)> {
    let parts: Vec<&str> = full_type.split("::").collect();
    match parts.as_slice() {
        [bare] => Ok((None, (*bare).to_string())),
        [ns, bare] => Ok((Some((*ns).to_string()), (*bare).to_string())),
        _ => Err(DefinitionError::NestedNamespace(full_type.to_string())),
    }
}

/// Check whether a bare (possibly `std::`-qualified) type name is builtin.
pub fn is_builtin_type(type_name: &str) -> bool {
    let stripped = type_name.strip_prefix("std::").unwrap_or(type_name);
    BUILTIN_TYPES.contains(&stripped) || ALLOWED_FIXED_WIDTH_TYPES.contains(&stripped)
}

/// One declared field or relation endpoint of a component or datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVariable {
    /// Member name, unique within its enclosing definition
    pub name: String,
    /// Fully qualified type string (for arrays the whole `std::array<..>`)
    pub full_type: String,
    /// Doc string; required for datatype members, optional for components
    pub description: String,
    /// Optional unit, the bracketed part of the declaration
    pub unit: Option<String>,
    /// Aggregate-initializer text, captured verbatim and never validated
    /// as target-language syntax (accepted limitation)
    pub default_val: Option<String>,
    /// True if the declared type is in the builtin allow-list
    pub is_builtin: bool,
    /// True if this is a fixed-size array
    pub is_array: bool,
    /// True if the array element type is builtin
    pub is_builtin_array: bool,
    /// Array element type, set iff `is_array`
    pub array_type: Option<String>,
    /// Array length, set iff `is_array`
    pub array_size: Option<usize>,
    /// Namespace of the (element) type, if qualified
    pub namespace: Option<String>,
    /// Bare (element) type name without namespace
    pub bare_type: String,
}

impl MemberVariable {
    /// Re-serialize to the canonical declaration form.
    ///
    /// Parsing the result yields an equal `MemberVariable`.
    pub fn definition(&self) -> String {
        let mut out = format!("{} {}", self.full_type, self.name);
        if let Some(ref default) = self.default_val {
            out.push_str(&format!("{{{default}}}"));
        }
        if let Some(ref unit) = self.unit {
            out.push_str(&format!(" [{unit}]"));
        }
        if !self.description.is_empty() {
            out.push_str(&format!(" // {}", self.description));
        }
        out
    }

    /// The type a consumer must resolve to accept this member: the
    /// element type for arrays, the full type otherwise.
    pub fn resolved_type(&self) -> &str {
        match self.array_type {
            Some(ref elem) => elem,
            None => &self.full_type,
        }
    }
}

/// Parser for single member declarations.
///
/// Compiles its grammar once; reuse one instance per run.
pub struct MemberParser {
    array_with_desc: Regex,
    member_with_desc: Regex,
    array_bare: Regex,
    member_bare: Regex,
    fixed_width_like: Regex,
}

impl Default for MemberParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberParser {
    pub fn new() -> Self {
        // Builtins are tried in descending length order so that
        // "unsigned long long" wins over "unsigned long" and "unsigned".
        let mut builtins: Vec<&str> = BUILTIN_TYPES.to_vec();
        builtins.sort_by_key(|b| std::cmp::Reverse(b.len()));
        let builtin_alt = builtins.join("|");

        // The qualified-identifier pattern captures any namespace depth;
        // nesting beyond one level is rejected after the match so the
        // error can name the offending type.
        let ident = r"[a-zA-Z_][a-zA-Z0-9_]*";
        let type_str = format!("((?:{builtin_alt})|(?:{ident}(?:::{ident})*))");
        let array_str = format!(r"std::array\s*<\s*([a-zA-Z0-9_:]+)\s*,\s*([0-9]+)\s*>");
        let name_str = format!("({ident})");
        let def_val_str = r"(?:\s*\{(.*)\})?";
        let unit_str = r"(?:\s*\[([a-zA-Z_0-9*/%]+)\])?";
        let comment_str = r"\s*//\s*(.*\S)";

        Self {
            array_with_desc: Regex::new(&format!(
                r"^\s*{array_str}\s+{name_str}{def_val_str}{unit_str}{comment_str}\s*$"
            ))
            .unwrap(),
            member_with_desc: Regex::new(&format!(
                r"^\s*{type_str}\s+{name_str}{def_val_str}{unit_str}{comment_str}\s*$"
            ))
            .unwrap(),
            array_bare: Regex::new(&format!(
                r"^\s*{array_str}\s+{name_str}{def_val_str}{unit_str}\s*$"
            ))
            .unwrap(),
            member_bare: Regex::new(&format!(
                r"^\s*{type_str}\s+{name_str}{def_val_str}{unit_str}\s*$"
            ))
            .unwrap(),
            fixed_width_like: Regex::new(r"^(?:std::)?u?int(?:_least|_fast)?(?:8|16|32|64)_t$")
                .unwrap(),
        }
    }

    /// Parse one member declaration.
    ///
    /// With `require_description` set, a declaration that only matches a
    /// grammar alternative without the trailing `// ...` comment fails
    /// with the dedicated missing-description error rather than the
    /// generic no-match one.
    pub fn parse(&self, definition: &str, require_description: bool) -> Result<MemberVariable> {
        if let Some(caps) = self.array_with_desc.captures(definition) {
            return self.build_array(
                &caps[1],
                caps[2].parse::<usize>().map_err(|_| {
                    DefinitionError::MalformedDocument(format!(
                        "array size out of range in '{definition}'"
                    ))
                })?,
                &caps[3],
                caps.get(4).map(|m| m.as_str().to_string()),
                caps.get(5).map(|m| m.as_str().to_string()),
                caps[6].trim().to_string(),
            );
        }
        if let Some(caps) = self.member_with_desc.captures(definition) {
            return self.build_scalar(
                &caps[1],
                &caps[2],
                caps.get(3).map(|m| m.as_str().to_string()),
                caps.get(4).map(|m| m.as_str().to_string()),
                caps[5].trim().to_string(),
            );
        }

        let bare_matches = self.array_bare.is_match(definition) || self.member_bare.is_match(definition);
        if require_description {
            if bare_matches {
                return Err(DefinitionError::MissingDescription(definition.to_string()));
            }
            return Err(DefinitionError::NoGrammarMatch(definition.to_string()));
        }

        if let Some(caps) = self.array_bare.captures(definition) {
            return self.build_array(
                &caps[1],
                caps[2].parse::<usize>().map_err(|_| {
                    DefinitionError::MalformedDocument(format!(
                        "array size out of range in '{definition}'"
                    ))
                })?,
                &caps[3],
                caps.get(4).map(|m| m.as_str().to_string()),
                caps.get(5).map(|m| m.as_str().to_string()),
                String::new(),
            );
        }
        if let Some(caps) = self.member_bare.captures(definition) {
            return self.build_scalar(
                &caps[1],
                &caps[2],
                caps.get(3).map(|m| m.as_str().to_string()),
                caps.get(4).map(|m| m.as_str().to_string()),
                String::new(),
            );
        }

        Err(DefinitionError::NoGrammarMatch(definition.to_string()))
    }

    fn build_scalar(
        &self,
        full_type: &str,
        name: &str,
        default_val: Option<String>,
        unit: Option<String>,
        description: String,
    ) -> Result<MemberVariable> {
        self.check_fixed_width(full_type)?;
        let (namespace, bare_type) = split_scoped_name(full_type)?;
        Ok(MemberVariable {
            name: name.to_string(),
            full_type: full_type.to_string(),
            description,
            unit,
            default_val,
            is_builtin: is_builtin_type(full_type),
            is_array: false,
            is_builtin_array: false,
            array_type: None,
            array_size: None,
            namespace,
            bare_type,
        })
    }

    fn build_array(
        &self,
        array_type: &str,
        array_size: usize,
        name: &str,
        default_val: Option<String>,
        unit: Option<String>,
        description: String,
    ) -> Result<MemberVariable> {
        // Array element types obey the same builtin / fixed-width rules
        // as scalars.
        self.check_fixed_width(array_type)?;
        let (namespace, bare_type) = split_scoped_name(array_type)?;
        Ok(MemberVariable {
            name: name.to_string(),
            full_type: format!("std::array<{array_type}, {array_size}>"),
            description,
            unit,
            default_val,
            is_builtin: false,
            is_array: true,
            is_builtin_array: is_builtin_type(array_type),
            array_type: Some(array_type.to_string()),
            array_size: Some(array_size),
            namespace,
            bare_type,
        })
    }

    /// Reject fixed-width-looking types outside the allow-list.
    ///
    /// `int8_t`, `uint8_t` and all `_least`/`_fast` variants look like
    /// fixed-width integers but are not accepted.
    fn check_fixed_width(&self, type_name: &str) -> Result<()> {
        if self.fixed_width_like.is_match(type_name) {
            let stripped = type_name.strip_prefix("std::").unwrap_or(type_name);
            if !ALLOWED_FIXED_WIDTH_TYPES.contains(&stripped) {
                return Err(DefinitionError::DisallowedFixedWidth(type_name.to_string()));
            }
        }
        Ok(())
    }
}
