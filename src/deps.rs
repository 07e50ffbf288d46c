//! Include and forward-declaration planning
//!
//! Computes, per component and datatype, the include statements and
//! forward declarations the rendering backend needs. Includes are
//! ordered topologically: a compound type's dependencies are listed
//! before itself. A self-referential relation is forward-declared in
//! the header with the include deferred to the translation unit, so
//! headers never include themselves.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::error::{DefinitionError, Result};
use crate::member::MemberVariable;
use crate::model::{DataModel, DataType, TypeScope};

/// Pre-computed include metadata for one generated type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncludePlan {
    /// Includes for the generated header, dependencies first
    pub header_includes: Vec<String>,
    /// Types only forward-declared in the header
    pub forward_declarations: Vec<DataType>,
    /// Includes deferred to the translation unit
    pub source_includes: Vec<String>,
}

/// Plans includes for every component and datatype of a model.
#[derive(Debug)]
pub struct IncludePlanner<'a> {
    scope: TypeScope<'a>,
    /// Topological rank of every local type, for ordering includes
    ranks: HashMap<String, usize>,
}

impl<'a> IncludePlanner<'a> {
    pub fn new(model: &'a DataModel, upstream: Option<&'a DataModel>) -> Result<Self> {
        let scope = TypeScope::new(model, upstream);
        let ranks = containment_ranks(model, &scope)?;
        Ok(Self { scope, ranks })
    }

    /// Compute plans for all components and datatypes, keyed by name.
    pub fn plan(&self) -> Result<BTreeMap<String, IncludePlan>> {
        let mut plans = BTreeMap::new();
        let model = self.scope.model;

        for (name, component) in &model.components {
            let deps = containment_deps(&component.members, &self.scope);
            plans.insert(name.clone(), self.plan_for(name, deps, &[])?);
        }
        for (name, datatype) in &model.datatypes {
            let mut deps = containment_deps(&datatype.members, &self.scope);
            deps.extend(containment_deps(&datatype.vector_members, &self.scope));
            let relations: Vec<&MemberVariable> = datatype
                .one_to_one_relations
                .iter()
                .chain(&datatype.one_to_many_relations)
                .collect();
            plans.insert(name.clone(), self.plan_for(name, deps, &relations)?);
        }
        Ok(plans)
    }

    fn plan_for(
        &self,
        name: &str,
        mut containment: Vec<String>,
        relations: &[&MemberVariable],
    ) -> Result<IncludePlan> {
        let mut plan = IncludePlan::default();

        // Dependencies before dependents; unranked (upstream) types
        // sort first since they are compiled already.
        containment.sort_by_key(|dep| (self.ranks.get(dep).copied().unwrap_or(0), dep.clone()));
        containment.dedup();
        for dep in &containment {
            plan.header_includes.push(self.include_path(dep)?);
        }

        for relation in relations {
            let target = relation.full_type.as_str();
            if target == name {
                // Self-referential relation: forward-declare, include
                // in the translation unit instead of the header.
                plan.forward_declarations.push(DataType::parse(target)?);
                plan.source_includes.push(self.include_path(target)?);
            } else {
                let path = self.include_path(target)?;
                if !plan.header_includes.contains(&path) {
                    plan.header_includes.push(path);
                }
            }
        }
        Ok(plan)
    }

    fn include_path(&self, type_name: &str) -> Result<String> {
        let parsed = DataType::parse(type_name)?;
        let prefix = if self.scope.model.has_type(type_name) {
            &self.scope.model.options.include_subfolder
        } else if let Some(upstream) = self.scope.upstream {
            &upstream.options.include_subfolder
        } else {
            &self.scope.model.options.include_subfolder
        };
        Ok(format!("{prefix}{}.h", parsed.bare_type))
    }
}

/// Topological ranks over the containment graph (component-typed
/// members only). Containment cannot legally cycle; a cycle is a
/// definition error naming one involved type.
fn containment_ranks(model: &DataModel, scope: &TypeScope) -> Result<HashMap<String, usize>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for name in model.components.keys().chain(model.datatypes.keys()) {
        let index = graph.add_node(name.clone());
        nodes.insert(name.clone(), index);
    }

    let mut add_edges = |owner: &str, members: &[MemberVariable]| {
        for dep in containment_deps(members, scope) {
            if let (Some(&from), Some(&to)) = (nodes.get(dep.as_str()), nodes.get(owner)) {
                graph.add_edge(from, to, ());
            }
        }
    };
    for (name, component) in &model.components {
        add_edges(name, &component.members);
    }
    for (name, datatype) in &model.datatypes {
        add_edges(name, &datatype.members);
        add_edges(name, &datatype.vector_members);
    }

    let order = toposort(&graph, None)
        .map_err(|cycle| DefinitionError::DependencyCycle(graph[cycle.node_id()].clone()))?;
    Ok(order
        .into_iter()
        .enumerate()
        .map(|(rank, index)| (graph[index].clone(), rank + 1))
        .collect())
}

/// Component-typed dependencies of a member list (scalars and arrays).
fn containment_deps(members: &[MemberVariable], scope: &TypeScope) -> Vec<String> {
    members
        .iter()
        .filter_map(|m| {
            let t = m.resolved_type();
            scope.has_component(t).then(|| t.to_string())
        })
        .collect()
}
