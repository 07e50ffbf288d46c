//! End-to-end compilation and evolution scenarios

use std::io::Write;

use edmgen::codegen::{build_context, BackendRegistry};
use edmgen::{
    read_model, read_model_file, validate, EvolutionDeclarations, SchemaComparator,
};

const SCHEMA_A: &str = r#"
schema_version: 1
components:
  Vector3:
    Members:
      - float x
      - float y
      - float z
datatypes:
  Hit:
    Description: "A tracker hit"
    Author: "A. Uthor"
    Members:
      - Vector3 position // hit position
    OneToManyRelations:
      - Cluster cluster // associated clusters
  Cluster:
    Description: "A calorimeter cluster"
    Author: "A. Uthor"
    Members:
      - float energy // total energy
"#;

#[test]
fn full_schema_parses_and_validates() {
    let model = read_model(SCHEMA_A, "edmtest").unwrap();
    validate(&model, None).unwrap();

    assert_eq!(model.components.keys().collect::<Vec<_>>(), vec!["Vector3"]);
    assert_eq!(
        model.datatypes.keys().collect::<Vec<_>>(),
        vec!["Cluster", "Hit"]
    );
}

#[test]
fn schema_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SCHEMA_A.as_bytes()).unwrap();

    let model = read_model_file(file.path(), "edmtest").unwrap();
    validate(&model, None).unwrap();
    assert_eq!(model.schema_version, 1);
}

#[test]
fn generator_context_covers_every_type() {
    let model = read_model(SCHEMA_A, "edmtest").unwrap();
    validate(&model, None).unwrap();

    let registry = BackendRegistry::with_defaults();
    let backend = registry.get("cpp").unwrap();
    let context = build_context(backend, &model, None).unwrap();

    assert_eq!(context.types.len(), 3);
    assert_eq!(context.types["Hit"]["includes"]["header"][0], "Vector3.h");
    // Relation target include follows the containment includes.
    assert_eq!(context.types["Hit"]["includes"]["header"][1], "Cluster.h");
}

#[test]
fn upstream_types_resolve_across_models() {
    let upstream = read_model(SCHEMA_A, "upstream").unwrap();
    validate(&upstream, None).unwrap();

    let dependent = r#"
schema_version: 1
datatypes:
  Track:
    Description: "A reconstructed track"
    Author: "A. Uthor"
    Members:
      - Vector3 momentum // momentum at origin
    OneToManyRelations:
      - Hit hits // contributing hits
"#;
    let model = read_model(dependent, "tracking").unwrap();
    assert!(validate(&model, None).is_err());
    validate(&model, Some(&upstream)).unwrap();
}

#[test]
fn rename_needs_a_declaration_to_become_a_migration() {
    let old = read_model(SCHEMA_A, "edmtest").unwrap();
    let renamed = SCHEMA_A
        .replace("schema_version: 1", "schema_version: 2")
        .replace("float energy // total energy", "float totalEnergy // total energy");
    let new = read_model(&renamed, "edmtest").unwrap();

    // Without a declaration: a blocking warning, no migration rule.
    let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert!(result.backend_relevant_changes().is_empty());

    // With the declaration: one confirmed rename, nothing to review.
    let declarations = EvolutionDeclarations::read(
        r#"
from_schema_version: 1
to_schema_version: 2
evolutions:
  Cluster:
    member_rename: [energy, totalEnergy]
"#,
    )
    .unwrap();
    let result = SchemaComparator::new(&old, &new, Some(&declarations))
        .compare()
        .unwrap();
    assert!(result.warnings.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.backend_relevant_changes().len(), 1);
}

#[test]
fn forbidden_change_surfaces_as_error() {
    let old = read_model(SCHEMA_A, "edmtest").unwrap();
    let changed = SCHEMA_A
        .replace("schema_version: 1", "schema_version: 2")
        .replace(
            "float energy // total energy",
            "std::array<float, 2> energy // split energies",
        );
    let new = read_model(&changed, "edmtest").unwrap();

    let result = SchemaComparator::new(&old, &new, None).compare().unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("scalar and array"));
}

#[test]
fn evolution_file_version_mismatch_aborts() {
    let old = read_model(SCHEMA_A, "edmtest").unwrap();
    let new_doc = SCHEMA_A.replace("schema_version: 1", "schema_version: 2");
    let new = read_model(&new_doc, "edmtest").unwrap();

    let declarations = EvolutionDeclarations::read(
        "from_schema_version: 2\nto_schema_version: 3\nevolutions: {}",
    )
    .unwrap();
    assert!(SchemaComparator::new(&old, &new, Some(&declarations))
        .compare()
        .is_err());
}
