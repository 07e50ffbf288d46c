//! EDM Schema Compiler
//!
//! A compiler front end for a declarative event-data-model description
//! language. Schemas declare components, datatypes, relations,
//! interfaces, and links in YAML; the compiler parses member
//! declarations, validates the model against a closed type taxonomy,
//! and can diff two schema versions to compute a safe evolution path.
//!
//! ## Pipeline
//!
//! ```text
//! schema.yaml --> reader --> DataModel --> validator
//!                                |
//!                                +--> codegen context (includes,
//!                                |    forward decls, namespaces)
//!                                +--> evolution comparator
//!                                     (old model + new model
//!                                      + evolution declarations)
//! ```
//!
//! Each compilation run owns its models; an upstream model, if
//! supplied, is read-only for the whole run. Parsing and validation
//! are fail-fast; only the evolution comparator accumulates findings,
//! because its job is to produce a report.

pub mod codegen;
pub mod deps;
pub mod error;
pub mod evolution;
pub mod member;
pub mod model;
pub mod reader;
pub mod validator;

pub use deps::{IncludePlan, IncludePlanner};
pub use error::{DefinitionError, EvolutionError, Result};
pub use evolution::{
    DiffResult, EvolutionDeclarations, MigrationKind, SchemaChange, SchemaComparator,
    SchemaMigration,
};
pub use member::{MemberParser, MemberVariable};
pub use model::{DataModel, DataType, ModelOptions};
pub use reader::{read_model, read_model_file};
pub use validator::validate;
