//! Schema-evolution comparison
//!
//! Loads two versions of a schema, computes structural differences,
//! applies rename heuristics, and flags changes that cannot be evolved
//! automatically.
//!
//! Unlike parsing and validation, comparison accumulates findings: its
//! job is to produce a report. Callers must treat a non-empty error
//! list as fatal before invoking code generation, and by policy
//! warnings are blocking too, to force human review of ambiguous
//! heuristics.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::error::EvolutionError;
use crate::member::MemberVariable;
use crate::model::DataModel;

/// A detected difference between two schema versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SchemaChange {
    AddedComponent {
        name: String,
    },
    DroppedComponent {
        name: String,
    },
    AddedDatatype {
        name: String,
    },
    DroppedDatatype {
        name: String,
    },
    RenamedDataType {
        old_name: String,
        new_name: String,
    },
    AddedMember {
        definition: String,
        member: MemberVariable,
    },
    DroppedMember {
        definition: String,
        member: MemberVariable,
    },
    ChangedMember {
        definition: String,
        old_member: MemberVariable,
        new_member: MemberVariable,
    },
    RenamedMember {
        definition: String,
        old_name: String,
        new_name: String,
        member_type: String,
    },
}

impl std::fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaChange::AddedComponent { name } => write!(f, "Component '{name}' has been added"),
            SchemaChange::DroppedComponent { name } => {
                write!(f, "Component '{name}' has been dropped")
            }
            SchemaChange::AddedDatatype { name } => write!(f, "Datatype '{name}' has been added"),
            SchemaChange::DroppedDatatype { name } => {
                write!(f, "Datatype '{name}' has been dropped")
            }
            SchemaChange::RenamedDataType { old_name, new_name } => {
                write!(f, "Datatype '{old_name}' has been renamed to '{new_name}'")
            }
            SchemaChange::AddedMember { definition, member } => write!(
                f,
                "'{definition}' has an added member '{}' of type '{}'",
                member.name, member.full_type
            ),
            SchemaChange::DroppedMember { definition, member } => {
                write!(f, "'{definition}' has a dropped member '{}'", member.name)
            }
            SchemaChange::ChangedMember {
                definition,
                old_member,
                new_member,
            } => write!(
                f,
                "'{definition}' member '{}' changed type from '{}' to '{}'",
                old_member.name, old_member.full_type, new_member.full_type
            ),
            SchemaChange::RenamedMember {
                definition,
                old_name,
                new_name,
                ..
            } => write!(
                f,
                "'{definition}' member '{old_name}' has been renamed to '{new_name}'"
            ),
        }
    }
}

/// The closed set of change types a user may declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    RenameMember { from: String, to: String },
}

/// Names of the valid migration change types, for error messages.
const VALID_MIGRATION_KINDS: &str = "rename_member";

/// A user-declared, explicit evolution step for one type.
///
/// Invariant, enforced at load time: `from_version < to_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMigration {
    pub from_version: u32,
    pub to_version: u32,
    #[serde(flatten)]
    pub kind: MigrationKind,
}

/// The parsed contents of an evolution-declaration document.
#[derive(Debug, Clone, Default)]
pub struct EvolutionDeclarations {
    pub from_version: u32,
    pub to_version: u32,
    /// Per-type ordered migration steps
    pub migrations: BTreeMap<String, Vec<SchemaMigration>>,
    /// Legacy whole-datatype renames (old name -> new name)
    pub datatype_renames: BTreeMap<String, String>,
}

impl EvolutionDeclarations {
    /// Read an evolution-declaration document from a file.
    pub fn read_file(path: impl AsRef<std::path::Path>) -> Result<Self, EvolutionError> {
        let document = std::fs::read_to_string(path)?;
        Self::read(&document)
    }

    /// Parse an evolution-declaration document.
    ///
    /// Supports the legacy `evolutions:` form and the versioned
    /// `migrations:` form. Malformed or under-specified migrations are
    /// rejected here, not at use time.
    pub fn read(document: &str) -> Result<Self, EvolutionError> {
        let root: Value = serde_yaml::from_str(document)?;
        let root = root.as_mapping().ok_or_else(|| {
            EvolutionError::MalformedDocument("top level must be a mapping".into())
        })?;

        let from_version = read_version(root.get("from_schema_version"), "from_schema_version")?;
        let to_version = read_version(root.get("to_schema_version"), "to_schema_version")?;
        if from_version >= to_version {
            return Err(EvolutionError::InvalidVersionOrder {
                type_name: "<document>".into(),
                from: from_version,
                to: to_version,
            });
        }

        let mut out = Self {
            from_version,
            to_version,
            ..Self::default()
        };

        if let Some(evolutions) = root.get("evolutions") {
            out.read_legacy(evolutions)?;
        }
        if let Some(migrations) = root.get("migrations") {
            out.read_versioned(migrations)?;
        }
        Ok(out)
    }

    fn read_legacy(&mut self, evolutions: &Value) -> Result<(), EvolutionError> {
        let evolutions = evolutions.as_mapping().ok_or_else(|| {
            EvolutionError::MalformedDocument("'evolutions' must be a mapping".into())
        })?;
        for (type_name, body) in evolutions {
            let type_name = string_key(type_name, "evolutions")?;
            let body = body.as_mapping().ok_or_else(|| {
                EvolutionError::MalformedMigration {
                    type_name: type_name.clone(),
                    message: "evolution entry must be a mapping".into(),
                }
            })?;
            for (key, value) in body {
                match key.as_str() {
                    Some("member_rename") => {
                        let pair = value.as_sequence().and_then(|s| {
                            match (s.first().and_then(Value::as_str), s.get(1).and_then(Value::as_str)) {
                                (Some(a), Some(b)) if s.len() == 2 => Some((a, b)),
                                _ => None,
                            }
                        });
                        let (from, to) = pair.ok_or_else(|| EvolutionError::MalformedMigration {
                            type_name: type_name.clone(),
                            message: "member_rename must be a two-element list [old, new]".into(),
                        })?;
                        self.migrations.entry(type_name.clone()).or_default().push(
                            SchemaMigration {
                                from_version: self.from_version,
                                to_version: self.to_version,
                                kind: MigrationKind::RenameMember {
                                    from: from.to_string(),
                                    to: to.to_string(),
                                },
                            },
                        );
                    }
                    Some("class_renamed_to") => {
                        let new_name = value.as_str().ok_or_else(|| {
                            EvolutionError::MalformedMigration {
                                type_name: type_name.clone(),
                                message: "class_renamed_to must be a string".into(),
                            }
                        })?;
                        self.datatype_renames
                            .insert(type_name.clone(), new_name.to_string());
                    }
                    Some(other) => {
                        return Err(EvolutionError::UnknownChangeType {
                            type_name: type_name.clone(),
                            found: other.to_string(),
                            valid: format!("{VALID_MIGRATION_KINDS}, class_renamed_to"),
                        })
                    }
                    None => {
                        return Err(EvolutionError::MalformedMigration {
                            type_name: type_name.clone(),
                            message: "evolution keys must be strings".into(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn read_versioned(&mut self, migrations: &Value) -> Result<(), EvolutionError> {
        let migrations = migrations.as_mapping().ok_or_else(|| {
            EvolutionError::MalformedDocument("'migrations' must be a mapping".into())
        })?;
        for (type_name, steps) in migrations {
            let type_name = string_key(type_name, "migrations")?;
            let steps = steps.as_sequence().ok_or_else(|| {
                EvolutionError::MalformedMigration {
                    type_name: type_name.clone(),
                    message: "migration steps must be a sequence".into(),
                }
            })?;
            for step in steps {
                let migration = read_migration_step(&type_name, step)?;
                self.migrations
                    .entry(type_name.clone())
                    .or_default()
                    .push(migration);
            }
        }
        Ok(())
    }

    /// The effective member renames per type between the declared
    /// versions, with sequential steps composed (a -> b -> c collapses
    /// to a -> c; a rename back to the original name cancels out).
    pub fn member_renames(&self) -> BTreeMap<String, Vec<(String, String)>> {
        let mut out = BTreeMap::new();
        for (type_name, steps) in &self.migrations {
            let mut steps: Vec<&SchemaMigration> = steps.iter().collect();
            steps.sort_by_key(|s| (s.from_version, s.to_version));
            // original name -> current name
            let mut chain: Vec<(String, String)> = Vec::new();
            for step in steps {
                let MigrationKind::RenameMember { from, to } = &step.kind;
                if let Some(entry) = chain.iter_mut().find(|(_, current)| current == from) {
                    entry.1 = to.clone();
                } else {
                    chain.push((from.clone(), to.clone()));
                }
            }
            let renames: Vec<(String, String)> = chain
                .into_iter()
                .filter(|(orig, current)| orig != current)
                .collect();
            if !renames.is_empty() {
                out.insert(type_name.clone(), renames);
            }
        }
        out
    }
}

fn read_migration_step(type_name: &str, step: &Value) -> Result<SchemaMigration, EvolutionError> {
    let body = step.as_mapping().ok_or_else(|| EvolutionError::MalformedMigration {
        type_name: type_name.to_string(),
        message: "migration step must be a mapping".into(),
    })?;
    let from_version = read_version(body.get("from_version"), "from_version").map_err(|_| {
        EvolutionError::MalformedMigration {
            type_name: type_name.to_string(),
            message: "migration step is missing a positive 'from_version'".into(),
        }
    })?;
    let to_version = read_version(body.get("to_version"), "to_version").map_err(|_| {
        EvolutionError::MalformedMigration {
            type_name: type_name.to_string(),
            message: "migration step is missing a positive 'to_version'".into(),
        }
    })?;
    if from_version >= to_version {
        return Err(EvolutionError::InvalidVersionOrder {
            type_name: type_name.to_string(),
            from: from_version,
            to: to_version,
        });
    }

    let mut kind = None;
    for (key, value) in body {
        match key.as_str() {
            Some("from_version") | Some("to_version") => {}
            Some("rename_member") => {
                let rename = value.as_mapping().ok_or_else(|| {
                    EvolutionError::MalformedMigration {
                        type_name: type_name.to_string(),
                        message: "rename_member must be a mapping with 'from' and 'to'".into(),
                    }
                })?;
                let from = rename.get("from").and_then(Value::as_str);
                let to = rename.get("to").and_then(Value::as_str);
                match (from, to) {
                    (Some(from), Some(to)) => {
                        kind = Some(MigrationKind::RenameMember {
                            from: from.to_string(),
                            to: to.to_string(),
                        });
                    }
                    _ => {
                        return Err(EvolutionError::MalformedMigration {
                            type_name: type_name.to_string(),
                            message: "rename_member requires string 'from' and 'to' fields".into(),
                        })
                    }
                }
            }
            Some(other) => {
                return Err(EvolutionError::UnknownChangeType {
                    type_name: type_name.to_string(),
                    found: other.to_string(),
                    valid: VALID_MIGRATION_KINDS.to_string(),
                })
            }
            None => {
                return Err(EvolutionError::MalformedMigration {
                    type_name: type_name.to_string(),
                    message: "migration keys must be strings".into(),
                })
            }
        }
    }

    let kind = kind.ok_or_else(|| EvolutionError::MalformedMigration {
        type_name: type_name.to_string(),
        message: format!("migration step declares no change (valid types: {VALID_MIGRATION_KINDS})"),
    })?;
    Ok(SchemaMigration {
        from_version,
        to_version,
        kind,
    })
}

fn read_version(value: Option<&Value>, key: &str) -> Result<u32, EvolutionError> {
    value
        .and_then(Value::as_u64)
        .filter(|v| *v > 0 && *v <= u32::MAX as u64)
        .map(|v| v as u32)
        .ok_or_else(|| {
            EvolutionError::MalformedDocument(format!("missing a positive integer '{key}'"))
        })
}

fn string_key(key: &Value, section: &str) -> Result<String, EvolutionError> {
    key.as_str().map(str::to_string).ok_or_else(|| {
        EvolutionError::MalformedDocument(format!("'{section}' keys must be strings"))
    })
}

/// Outcome of a schema comparison: three disjoint buckets.
#[derive(Debug, Default, Serialize)]
pub struct DiffResult {
    /// Forbidden changes; must abort code generation
    pub errors: Vec<String>,
    /// Unconfirmed heuristic findings; non-fatal in the library, but
    /// blocking at the CLI boundary by policy
    pub warnings: Vec<String>,
    /// The final, heuristic-resolved change list
    pub schema_changes: Vec<SchemaChange>,
}

impl DiffResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.schema_changes.is_empty()
    }

    /// The subset of changes that requires constructed migration code
    /// in the rendering backend. Additions, drops, and whole-type
    /// renames are handled automatically by the backend.
    pub fn backend_relevant_changes(&self) -> Vec<&SchemaChange> {
        self.schema_changes
            .iter()
            .filter(|c| matches!(c, SchemaChange::RenamedMember { .. }))
            .collect()
    }
}

/// Compares two independently-owned, read-only models plus optional
/// user evolution declarations.
pub struct SchemaComparator<'a> {
    old: &'a DataModel,
    new: &'a DataModel,
    declarations: Option<&'a EvolutionDeclarations>,
}

impl<'a> SchemaComparator<'a> {
    pub fn new(
        old: &'a DataModel,
        new: &'a DataModel,
        declarations: Option<&'a EvolutionDeclarations>,
    ) -> Self {
        Self {
            old,
            new,
            declarations,
        }
    }

    /// Run the comparison pipeline.
    ///
    /// A version mismatch between the evolution declarations and the
    /// two models is a hard error; everything else lands in the result
    /// buckets.
    pub fn compare(&self) -> Result<DiffResult, EvolutionError> {
        if let Some(decl) = self.declarations {
            if decl.from_version != self.old.schema_version
                || decl.to_version != self.new.schema_version
            {
                return Err(EvolutionError::VersionMismatch {
                    declared_from: decl.from_version,
                    declared_to: decl.to_version,
                    actual_from: self.old.schema_version,
                    actual_to: self.new.schema_version,
                });
            }
        }

        let mut result = DiffResult::default();
        self.compare_components(&mut result);
        self.compare_datatypes(&mut result);
        self.apply_member_rename_heuristics(&mut result);
        self.apply_type_rename_heuristics(&mut result);
        self.classify_forbidden_changes(&mut result);

        for warning in &result.warnings {
            warn!("{warning}");
        }
        Ok(result)
    }

    fn compare_components(&self, result: &mut DiffResult) {
        let old_keys: BTreeSet<&String> = self.old.components.keys().collect();
        let new_keys: BTreeSet<&String> = self.new.components.keys().collect();

        for name in new_keys.difference(&old_keys) {
            result.schema_changes.push(SchemaChange::AddedComponent {
                name: (*name).clone(),
            });
        }
        for name in old_keys.difference(&new_keys) {
            result.schema_changes.push(SchemaChange::DroppedComponent {
                name: (*name).clone(),
            });
        }
        for name in old_keys.intersection(&new_keys) {
            self.compare_members(
                name,
                &self.old.components[*name].members,
                &self.new.components[*name].members,
                result,
            );
        }
    }

    fn compare_datatypes(&self, result: &mut DiffResult) {
        let old_keys: BTreeSet<&String> = self.old.datatypes.keys().collect();
        let new_keys: BTreeSet<&String> = self.new.datatypes.keys().collect();

        for name in new_keys.difference(&old_keys) {
            result.schema_changes.push(SchemaChange::AddedDatatype {
                name: (*name).clone(),
            });
        }
        for name in old_keys.difference(&new_keys) {
            result.schema_changes.push(SchemaChange::DroppedDatatype {
                name: (*name).clone(),
            });
        }
        for name in old_keys.intersection(&new_keys) {
            self.compare_members(
                name,
                &self.old.datatypes[*name].members,
                &self.new.datatypes[*name].members,
                result,
            );
        }
    }

    fn compare_members(
        &self,
        definition: &str,
        old_members: &[MemberVariable],
        new_members: &[MemberVariable],
        result: &mut DiffResult,
    ) {
        let old_map: BTreeMap<&str, &MemberVariable> =
            old_members.iter().map(|m| (m.name.as_str(), m)).collect();
        let new_map: BTreeMap<&str, &MemberVariable> =
            new_members.iter().map(|m| (m.name.as_str(), m)).collect();

        for (name, member) in &new_map {
            if !old_map.contains_key(name) {
                result.schema_changes.push(SchemaChange::AddedMember {
                    definition: definition.to_string(),
                    member: (*member).clone(),
                });
            }
        }
        for (name, member) in &old_map {
            if !new_map.contains_key(name) {
                result.schema_changes.push(SchemaChange::DroppedMember {
                    definition: definition.to_string(),
                    member: (*member).clone(),
                });
            }
        }
        for (name, old_member) in &old_map {
            if let Some(new_member) = new_map.get(name) {
                if old_member.full_type != new_member.full_type {
                    result.schema_changes.push(SchemaChange::ChangedMember {
                        definition: definition.to_string(),
                        old_member: (*old_member).clone(),
                        new_member: (*new_member).clone(),
                    });
                }
            }
        }
    }

    /// Pair same-type dropped/added members of one definition into
    /// rename candidates. A candidate is promoted to a confirmed
    /// `RenamedMember` only by a matching user declaration; otherwise
    /// it stays a pair of separate entries plus a warning.
    fn apply_member_rename_heuristics(&self, result: &mut DiffResult) {
        let declared = self
            .declarations
            .map(|d| d.member_renames())
            .unwrap_or_default();

        let mut confirmed: Vec<SchemaChange> = Vec::new();
        let mut consumed: Vec<usize> = Vec::new();

        for (definition, renames) in &declared {
            for (old_name, new_name) in renames {
                let dropped = result.schema_changes.iter().position(|c| {
                    matches!(c, SchemaChange::DroppedMember { definition: d, member }
                        if d == definition && &member.name == old_name)
                });
                let added = result.schema_changes.iter().position(|c| {
                    matches!(c, SchemaChange::AddedMember { definition: d, member }
                        if d == definition && &member.name == new_name)
                });
                match (dropped, added) {
                    (Some(di), Some(ai)) => {
                        let member_type = match &result.schema_changes[ai] {
                            SchemaChange::AddedMember { member, .. } => member.full_type.clone(),
                            _ => unreachable!("position matched AddedMember"),
                        };
                        let old_type = match &result.schema_changes[di] {
                            SchemaChange::DroppedMember { member, .. } => member.full_type.clone(),
                            _ => unreachable!("position matched DroppedMember"),
                        };
                        if member_type != old_type {
                            result.errors.push(format!(
                                "Declared rename '{definition}.{old_name}' -> '{new_name}' changes the member type from '{old_type}' to '{member_type}'"
                            ));
                            continue;
                        }
                        consumed.push(di);
                        consumed.push(ai);
                        confirmed.push(SchemaChange::RenamedMember {
                            definition: definition.clone(),
                            old_name: old_name.clone(),
                            new_name: new_name.clone(),
                            member_type,
                        });
                    }
                    _ => {
                        result.errors.push(format!(
                            "Declared rename '{definition}.{old_name}' -> '{new_name}' does not match any detected change"
                        ));
                    }
                }
            }
        }

        consumed.sort_unstable_by(|a, b| b.cmp(a));
        consumed.dedup();
        for index in consumed {
            result.schema_changes.remove(index);
        }
        result.schema_changes.extend(confirmed);

        // Remaining same-type dropped/added pairs are unconfirmed
        // candidates; they are only warned about.
        let mut candidates: Vec<String> = Vec::new();
        for dropped in &result.schema_changes {
            let SchemaChange::DroppedMember { definition, member } = dropped else {
                continue;
            };
            for added in &result.schema_changes {
                let SchemaChange::AddedMember {
                    definition: added_def,
                    member: added_member,
                } = added
                else {
                    continue;
                };
                if definition == added_def && member.full_type == added_member.full_type {
                    candidates.push(format!(
                        "'{definition}': potential member rename '{}' -> '{}' (type '{}') is not confirmed by an evolution declaration",
                        member.name, added_member.name, member.full_type
                    ));
                }
            }
        }
        result.warnings.extend(candidates);
    }

    /// One level up: whole dropped/added type pairs with identical
    /// member-name sets. Datatype pairs can be confirmed by a
    /// `class_renamed_to` declaration; component pairs are only ever
    /// warned about since components have no declaration mechanism.
    fn apply_type_rename_heuristics(&self, result: &mut DiffResult) {
        let declared_renames = self
            .declarations
            .map(|d| d.datatype_renames.clone())
            .unwrap_or_default();

        let mut confirmed: Vec<SchemaChange> = Vec::new();
        let mut consumed: Vec<usize> = Vec::new();

        let dropped_datatypes: Vec<(usize, String)> = result
            .schema_changes
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                SchemaChange::DroppedDatatype { name } => Some((i, name.clone())),
                _ => None,
            })
            .collect();
        let added_datatypes: Vec<(usize, String)> = result
            .schema_changes
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                SchemaChange::AddedDatatype { name } => Some((i, name.clone())),
                _ => None,
            })
            .collect();

        for (di, old_name) in &dropped_datatypes {
            for (ai, new_name) in &added_datatypes {
                let old_names = member_names(&self.old.datatypes[old_name].members);
                let new_names = member_names(&self.new.datatypes[new_name].members);
                if old_names != new_names {
                    continue;
                }
                if declared_renames.get(old_name) == Some(new_name) {
                    consumed.push(*di);
                    consumed.push(*ai);
                    confirmed.push(SchemaChange::RenamedDataType {
                        old_name: old_name.clone(),
                        new_name: new_name.clone(),
                    });
                } else {
                    result.warnings.push(format!(
                        "Potential datatype rename '{old_name}' -> '{new_name}' (identical member sets) is not confirmed by an evolution declaration"
                    ));
                }
            }
        }

        let dropped_components: Vec<String> = result
            .schema_changes
            .iter()
            .filter_map(|c| match c {
                SchemaChange::DroppedComponent { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        let added_components: Vec<String> = result
            .schema_changes
            .iter()
            .filter_map(|c| match c {
                SchemaChange::AddedComponent { name } => Some(name.clone()),
                _ => None,
            })
            .collect();
        for old_name in &dropped_components {
            for new_name in &added_components {
                let old_names = member_names(&self.old.components[old_name].members);
                let new_names = member_names(&self.new.components[new_name].members);
                if old_names == new_names {
                    result.warnings.push(format!(
                        "Potential component rename '{old_name}' -> '{new_name}' (identical member sets); component renames cannot be declared and are never confirmed automatically"
                    ));
                }
            }
        }

        consumed.sort_unstable_by(|a, b| b.cmp(a));
        consumed.dedup();
        for index in consumed {
            result.schema_changes.remove(index);
        }
        result.schema_changes.extend(confirmed);
    }

    /// A changed member is an error rather than a reportable change if
    /// it flips between scalar and array, or if its old type was a
    /// component (there is no field-by-field migration for nested
    /// aggregates).
    fn classify_forbidden_changes(&self, result: &mut DiffResult) {
        for change in &result.schema_changes {
            let SchemaChange::ChangedMember {
                definition,
                old_member,
                new_member,
            } = change
            else {
                continue;
            };
            if old_member.is_array != new_member.is_array {
                result.errors.push(format!(
                    "'{definition}' member '{}' changes between scalar and array ('{}' -> '{}'), which cannot be evolved automatically",
                    old_member.name, old_member.full_type, new_member.full_type
                ));
            } else if self.old.components.contains_key(&old_member.full_type) {
                result.errors.push(format!(
                    "'{definition}' member '{}' changes type away from component '{}', which cannot be evolved automatically",
                    old_member.name, old_member.full_type
                ));
            }
        }
    }
}

fn member_names(members: &[MemberVariable]) -> BTreeSet<&str> {
    members.iter().map(|m| m.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_model;

    fn model(document: &str) -> DataModel {
        read_model(document, "edmtest").unwrap()
    }

    const OLD: &str = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
      - float y
datatypes:
  Hit:
    Description: "hit"
    Author: "a"
    Members:
      - int oldName // counter
      - float energy // energy
"#;

    #[test]
    fn test_identical_schemas_diff_empty() {
        let old = model(OLD);
        let new = model(OLD);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert!(result.is_clean());
    }

    #[test]
    fn test_added_and_dropped_types() {
        let new_doc = r#"
schema_version: 2
datatypes:
  Cluster:
    Description: "cluster"
    Author: "a"
    Members:
      - float energy // energy
"#;
        let old = model(OLD);
        let new = model(new_doc);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert!(result
            .schema_changes
            .contains(&SchemaChange::DroppedComponent { name: "Vector3".into() }));
        assert!(result
            .schema_changes
            .contains(&SchemaChange::DroppedDatatype { name: "Hit".into() }));
        assert!(result
            .schema_changes
            .contains(&SchemaChange::AddedDatatype { name: "Cluster".into() }));
    }

    const RENAMED: &str = r#"
schema_version: 2
components:
  Vector3:
    Members:
      - float x
      - float y
datatypes:
  Hit:
    Description: "hit"
    Author: "a"
    Members:
      - int newName // counter
      - float energy // energy
"#;

    #[test]
    fn test_unconfirmed_rename_warns_and_keeps_entries() {
        let old = model(OLD);
        let new = model(RENAMED);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("potential member rename"));
        assert!(result
            .schema_changes
            .iter()
            .any(|c| matches!(c, SchemaChange::AddedMember { .. })));
        assert!(result
            .schema_changes
            .iter()
            .any(|c| matches!(c, SchemaChange::DroppedMember { .. })));
    }

    #[test]
    fn test_declared_rename_confirms() {
        let decl = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 2
evolutions:
  Hit:
    member_rename: [oldName, newName]
"#,
        )
        .unwrap();
        let old = model(OLD);
        let new = model(RENAMED);
        let result = SchemaComparator::new(&old, &new, Some(&decl))
            .compare()
            .unwrap();
        assert!(result.warnings.is_empty(), "warnings: {:?}", result.warnings);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(
            result.schema_changes,
            vec![SchemaChange::RenamedMember {
                definition: "Hit".into(),
                old_name: "oldName".into(),
                new_name: "newName".into(),
                member_type: "int".into(),
            }]
        );
        assert_eq!(result.backend_relevant_changes().len(), 1);
    }

    #[test]
    fn test_versioned_migration_form() {
        let decl = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 2
migrations:
  Hit:
    - from_version: 1
      to_version: 2
      rename_member: { from: oldName, to: newName }
"#,
        )
        .unwrap();
        let old = model(OLD);
        let new = model(RENAMED);
        let result = SchemaComparator::new(&old, &new, Some(&decl))
            .compare()
            .unwrap();
        assert_eq!(result.backend_relevant_changes().len(), 1);
    }

    #[test]
    fn test_rename_chain_composes() {
        let decl = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 3
migrations:
  Hit:
    - { from_version: 1, to_version: 2, rename_member: { from: a, to: b } }
    - { from_version: 2, to_version: 3, rename_member: { from: b, to: c } }
"#,
        )
        .unwrap();
        let renames = decl.member_renames();
        assert_eq!(renames["Hit"], vec![("a".to_string(), "c".to_string())]);
    }

    #[test]
    fn test_version_mismatch_is_hard_error() {
        let decl = EvolutionDeclarations::read(
            "from_schema_version: 3\nto_schema_version: 4\nevolutions: {}",
        )
        .unwrap();
        let old = model(OLD);
        let new = model(RENAMED);
        let err = SchemaComparator::new(&old, &new, Some(&decl))
            .compare()
            .unwrap_err();
        assert!(matches!(err, EvolutionError::VersionMismatch { .. }));
    }

    #[test]
    fn test_unknown_change_type_names_valid_ones() {
        let err = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 2
migrations:
  Hit:
    - { from_version: 1, to_version: 2, drop_member: { name: x } }
"#,
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("rename_member"), "got: {text}");
    }

    #[test]
    fn test_migration_version_order_enforced() {
        let err = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 2
migrations:
  Hit:
    - { from_version: 2, to_version: 1, rename_member: { from: a, to: b } }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, EvolutionError::InvalidVersionOrder { .. }));
    }

    #[test]
    fn test_scalar_to_array_is_error() {
        let new_doc = r#"
schema_version: 2
components:
  Vector3:
    Members:
      - float x
      - float y
datatypes:
  Hit:
    Description: "hit"
    Author: "a"
    Members:
      - std::array<int, 3> oldName // counter triplet
      - float energy // energy
"#;
        let old = model(OLD);
        let new = model(new_doc);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("scalar and array"));
    }

    #[test]
    fn test_component_typed_member_change_is_error() {
        let old_doc = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
  Vector2:
    Members:
      - float x
datatypes:
  Hit:
    Description: "hit"
    Author: "a"
    Members:
      - Vector3 position // position
"#;
        let new_doc = r#"
schema_version: 2
components:
  Vector3:
    Members:
      - float x
  Vector2:
    Members:
      - float x
datatypes:
  Hit:
    Description: "hit"
    Author: "a"
    Members:
      - Vector2 position // position
"#;
        let old = model(old_doc);
        let new = model(new_doc);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("component"));
    }

    #[test]
    fn test_datatype_rename_heuristic() {
        let old_doc = r#"
schema_version: 1
datatypes:
  OldHit:
    Description: "hit"
    Author: "a"
    Members:
      - float energy // energy
"#;
        let new_doc = r#"
schema_version: 2
datatypes:
  NewHit:
    Description: "hit"
    Author: "a"
    Members:
      - float energy // energy
"#;
        let old = model(old_doc);
        let new = model(new_doc);

        // Unconfirmed: warning, entries kept.
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Potential datatype rename"));

        // Confirmed by declaration: collapsed to RenamedDataType.
        let decl = EvolutionDeclarations::read(
            r#"
from_schema_version: 1
to_schema_version: 2
evolutions:
  OldHit:
    class_renamed_to: NewHit
"#,
        )
        .unwrap();
        let result = SchemaComparator::new(&old, &new, Some(&decl))
            .compare()
            .unwrap();
        assert!(result.warnings.is_empty());
        assert_eq!(
            result.schema_changes,
            vec![SchemaChange::RenamedDataType {
                old_name: "OldHit".into(),
                new_name: "NewHit".into(),
            }]
        );
    }

    #[test]
    fn test_component_rename_only_warns() {
        let old_doc = r#"
schema_version: 1
components:
  OldVec:
    Members:
      - float x
"#;
        let new_doc = r#"
schema_version: 2
components:
  NewVec:
    Members:
      - float x
"#;
        let old = model(old_doc);
        let new = model(new_doc);
        let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("component rename"));
        assert!(result
            .schema_changes
            .contains(&SchemaChange::DroppedComponent { name: "OldVec".into() }));
    }
}
