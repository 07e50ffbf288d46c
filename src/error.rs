//! Error types for the schema compiler

use thiserror::Error;

/// Result type for schema front-end operations
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// A schema is self-inconsistent or syntactically malformed.
///
/// Kept distinct from generic failures so tooling can catch schema
/// problems without masking unrelated bugs.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Member declaration matches no grammar alternative: '{0}'")]
    NoGrammarMatch(String),

    #[error("Member declaration is missing a description comment: '{0}'")]
    MissingDescription(String),

    #[error("Fixed-width integer type '{0}' is not allowed (allowed: int16_t, int32_t, int64_t, uint16_t, uint32_t, uint64_t)")]
    DisallowedFixedWidth(String),

    #[error("Type '{0}' uses a nested namespace; at most one scope separator is allowed")]
    NestedNamespace(String),

    #[error("'{name}' declares an invalid category '{key}'{hint}")]
    InvalidCategory {
        name: String,
        key: String,
        hint: String,
    },

    #[error("'{name}' is missing the mandatory '{key}' declaration")]
    MissingCategory { name: String, key: String },

    #[error("'{name}' defines member '{member}' of undeclared type '{type_name}'")]
    UndeclaredMemberType {
        name: String,
        member: String,
        type_name: String,
    },

    #[error("'{name}' declares an invalid {relation} relation to '{target}'")]
    InvalidRelation {
        name: String,
        relation: &'static str,
        target: String,
    },

    #[error("'{name}' declares member '{member}' more than once{detail}")]
    DuplicateMember {
        name: String,
        member: String,
        detail: String,
    },

    #[error("'{name}' redefines an already declared type name")]
    NameClash { name: String },

    #[error("'{name}': {message}")]
    InvalidDefinition { name: String, message: String },

    #[error("Schema document is missing a positive integer 'schema_version'")]
    MissingSchemaVersion,

    #[error("Malformed schema document: {0}")]
    MalformedDocument(String),

    #[error("Dependency cycle between types: {0}")]
    DependencyCycle(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or applying schema-evolution declarations.
#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("Evolution file declares versions {declared_from} -> {declared_to}, but the schema documents are versions {actual_from} -> {actual_to}")]
    VersionMismatch {
        declared_from: u32,
        declared_to: u32,
        actual_from: u32,
        actual_to: u32,
    },

    #[error("Migration for '{type_name}' declares from_version {from} >= to_version {to}")]
    InvalidVersionOrder {
        type_name: String,
        from: u32,
        to: u32,
    },

    #[error("Migration for '{type_name}' uses unknown change type '{found}' (valid types: {valid})")]
    UnknownChangeType {
        type_name: String,
        found: String,
        valid: String,
    },

    #[error("Malformed migration declaration for '{type_name}': {message}")]
    MalformedMigration { type_name: String, message: String },

    #[error("Malformed evolution document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
