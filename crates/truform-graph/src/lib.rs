//! Dependency graph construction and deterministic topological scheduling
//! over a part's features (spec §4.3). Input is a validated, normalized
//! part; output is the feature execution order plus the explicit edge set
//! used for diagnostics.

use std::collections::{BTreeMap, BTreeSet};

use truform_ir::{CoreError, CoreResult, ErrorCode, Feature, FeatureKind, Part};

/// An edge from a producing feature to a consuming feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

impl DepGraph {
    fn adjacency(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut adj: BTreeMap<&str, BTreeSet<&str>> = self.nodes.iter().map(|n| (n.as_str(), BTreeSet::new())).collect();
        for e in &self.edges {
            adj.entry(e.from.as_str()).or_default().insert(e.to.as_str());
        }
        adj
    }
}

/// Returns an implicit-sentinel output prefix (`face:`, `edge:`, `solid:`,
/// `surface:`) with no backing feature and therefore no dependency edge.
fn is_implicit_sentinel(name: &str) -> bool {
    ["face:", "edge:", "solid:", "surface:"]
        .iter()
        .any(|p| name.starts_with(p))
}

/// Build the explicit + implicit dependency edge set for a part. Does not
/// sort; call [`topo_sort`] on the result.
pub fn build_graph(part: &Part) -> CoreResult<DepGraph> {
    let profile_owners = truform_ir::profile_sketch::index_profiles(part)?;

    let output_owner: BTreeMap<&str, &str> = part
        .features
        .iter()
        .filter_map(|f| f.kind.result_name().map(|name| (name, f.id.as_str())))
        .collect();

    let mut graph = DepGraph {
        nodes: part.features.iter().map(|f| f.id.clone()).collect(),
        edges: Vec::new(),
    };

    for f in &part.features {
        // Rule 1: explicit deps.
        for dep in &f.deps {
            require_feature(part, dep, f)?;
            graph.edges.push(Edge {
                from: dep.clone(),
                to: f.id.clone(),
            });
        }

        // Rule 2: implicit profile deps.
        for name in f.kind.profile_refs() {
            let owner = profile_owners.get(name).ok_or_else(|| {
                CoreError::new(ErrorCode::ProfileMissing, format!("profile.ref {name:?} has no owning sketch"))
                    .feature(&f.id, f.kind.name())
            })?;
            graph.edges.push(Edge {
                from: owner.sketch_feature_id.clone(),
                to: f.id.clone(),
            });
        }

        // Rule 3: implicit pattern deps.
        if let Some(pattern_id) = f.kind.pattern_ref() {
            let pattern_feature = part.find_feature(pattern_id).ok_or_else(|| {
                CoreError::new(ErrorCode::PatternMissing, format!("pattern.ref {pattern_id:?} does not exist"))
                    .feature(&f.id, f.kind.name())
            })?;
            if !matches!(
                pattern_feature.kind,
                FeatureKind::LinearPattern(_) | FeatureKind::CircularPattern(_)
            ) {
                return Err(CoreError::new(
                    ErrorCode::PatternMissing,
                    format!("pattern.ref {pattern_id:?} is not a linear/circular pattern feature"),
                )
                .feature(&f.id, f.kind.name()));
            }
            graph.edges.push(Edge {
                from: pattern_id.to_string(),
                to: f.id.clone(),
            });
        }

        // Rule 4: implicit datum deps.
        for plane_ref in f.kind.plane_refs() {
            if let truform_ir::feature::PlaneRef::Datum { feature_id } = plane_ref {
                require_datum(part, feature_id, f, ErrorCode::DatumPlaneMissing)?;
                graph.edges.push(Edge {
                    from: feature_id.clone(),
                    to: f.id.clone(),
                });
            }
        }
        for axis_ref in f.kind.axis_refs() {
            if let truform_ir::feature::AxisRef::Datum { feature_id } = axis_ref {
                require_datum(part, feature_id, f, ErrorCode::DatumAxisMissing)?;
                graph.edges.push(Edge {
                    from: feature_id.clone(),
                    to: f.id.clone(),
                });
            }
        }

        // Rule 5: implicit selector deps.
        for selector in f.kind.selectors() {
            if let Some(name) = selector.named_ref() {
                if !is_implicit_sentinel(name) {
                    if let Some(owner) = output_owner.get(name) {
                        graph.edges.push(Edge {
                            from: owner.to_string(),
                            to: f.id.clone(),
                        });
                    } else {
                        return Err(CoreError::new(
                            ErrorCode::SelectorNamedMissing,
                            format!("named selector {name:?} does not match any output"),
                        )
                        .feature(&f.id, f.kind.name())
                        .with("referenceKind", "namedSelector")
                        .with("referenceId", name.to_string()));
                    }
                }
            }
            for created_by in selector.created_by_ids() {
                require_feature(part, created_by, f)?;
                graph.edges.push(Edge {
                    from: created_by.to_string(),
                    to: f.id.clone(),
                });
            }
        }
    }

    graph.edges.sort();
    graph.edges.dedup();
    Ok(graph)
}

fn require_feature(part: &Part, id: &str, consumer: &Feature) -> CoreResult<()> {
    if part.find_feature(id).is_none() {
        return Err(CoreError::new(ErrorCode::MissingFeature, format!("dependency {id:?} does not exist"))
            .feature(&consumer.id, consumer.kind.name())
            .with("referenceKind", "feature")
            .with("referenceId", id.to_string()));
    }
    Ok(())
}

fn require_datum(part: &Part, id: &str, consumer: &Feature, missing_code: ErrorCode) -> CoreResult<()> {
    let datum = part
        .find_feature(id)
        .ok_or_else(|| CoreError::new(missing_code, format!("datum {id:?} does not exist")).feature(&consumer.id, consumer.kind.name()))?;
    let is_datum = matches!(
        datum.kind,
        FeatureKind::PlaneDatum(_) | FeatureKind::AxisDatum(_) | FeatureKind::FrameDatum(_)
    );
    if !is_datum {
        return Err(CoreError::new(missing_code, format!("feature {id:?} is not a datum")).feature(&consumer.id, consumer.kind.name()));
    }
    Ok(())
}

/// Kahn's algorithm with a sorted-insertion tie-breaker: the ready set is
/// always popped in ascending id order, so equivalent graphs emit
/// identical schedules regardless of input feature order (spec §4.3, §8
/// topo-stability property).
pub fn topo_sort(graph: &DepGraph) -> CoreResult<Vec<String>> {
    let adjacency = graph.adjacency();
    let mut indegree: BTreeMap<&str, usize> = graph.nodes.iter().map(|n| (n.as_str(), 0)).collect();
    for targets in adjacency.values() {
        for t in targets {
            *indegree.get_mut(t).unwrap() += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(next);
        order.push(next.to_string());
        if let Some(targets) = adjacency.get(next) {
            for &t in targets {
                let deg = indegree.get_mut(t).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(t);
                }
            }
        }
    }

    if order.len() != graph.nodes.len() {
        let remaining: Vec<String> = graph
            .nodes
            .iter()
            .filter(|n| !order.contains(n))
            .cloned()
            .collect();
        return Err(CoreError::new(
            ErrorCode::Cycle,
            format!("cycle detected among features: {}", remaining.join(", ")),
        )
        .with("referenceKind", "cycle")
        .with("referenceId", remaining.join(",")));
    }

    Ok(order)
}

/// Convenience: build the graph and schedule it in one call.
pub fn schedule(part: &Part) -> CoreResult<(DepGraph, Vec<String>)> {
    let graph = build_graph(part)?;
    let order = topo_sort(&graph)?;
    Ok((graph, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use truform_ir::feature::{AxisRef, ExtrudeParams, FeatureKind, HoleParams, PlaneDatumParams, PlaneRef};
    use truform_ir::selector::{Axis, Predicate, Rank, Selector};
    use truform_ir::sketch::Profile;
    use truform_ir::Scalar;

    fn extrude(id: &str, result: &str) -> Feature {
        Feature {
            id: id.into(),
            kind: FeatureKind::Extrude(ExtrudeParams {
                result: result.into(),
                profile: Profile::Rectangle {
                    name: "rect".into(),
                    corner: [0.0, 0.0],
                    width: Scalar::number(10.0),
                    height: Scalar::number(5.0),
                },
                depth: Scalar::number(2.0),
                direction: None,
                mode: None,
                cut: false,
                target_body: None,
            }),
            deps: vec![],
            tags: vec![],
        }
    }

    fn hole_on(id: &str, created_by: &str, target: &str) -> Feature {
        Feature {
            id: id.into(),
            kind: FeatureKind::Hole(HoleParams {
                target_body: Selector::Named { name: target.into() },
                placement: Selector::Face {
                    predicates: vec![
                        Predicate::Normal { axis: Axis::PlusZ },
                        Predicate::CreatedBy {
                            feature_id: created_by.into(),
                        },
                    ],
                    rank: vec![Rank::MaxArea],
                },
                axis: AxisRef::Inline {
                    origin: [0.0, 0.0, 0.0],
                    direction: Axis::PlusZ,
                },
                diameter: Scalar::number(1.0),
                depth: Scalar::number(2.0),
                pattern_ref: None,
            }),
            deps: vec![],
            tags: vec![],
        }
    }

    fn part_with(features: Vec<Feature>) -> Part {
        Part {
            id: "p1".into(),
            features,
            params: vec![],
            connectors: vec![],
            datums: vec![],
            constraints: vec![],
            cosmetic_threads: vec![],
            assertions: vec![],
            dimensions: vec![],
        }
    }

    #[test]
    fn plate_with_hole_schedules_base_before_hole() {
        let part = part_with(vec![hole_on("h1", "base", "body:main"), extrude("base", "body:main")]);
        let (_, order) = schedule(&part).unwrap();
        assert_eq!(order, vec!["base".to_string(), "h1".to_string()]);
    }

    #[test]
    fn schedule_is_stable_regardless_of_input_order() {
        let forward = part_with(vec![extrude("base", "body:main"), hole_on("h1", "base", "body:main")]);
        let backward = part_with(vec![hole_on("h1", "base", "body:main"), extrude("base", "body:main")]);
        let (_, order_a) = schedule(&forward).unwrap();
        let (_, order_b) = schedule(&backward).unwrap();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn cyclic_explicit_deps_are_rejected() {
        let mut a = Feature {
            id: "a".into(),
            kind: FeatureKind::PlaneDatum(PlaneDatumParams {
                result: "datum:a".into(),
                plane: PlaneRef::Inline {
                    origin: [0.0, 0.0, 0.0],
                    normal: Axis::PlusZ,
                },
            }),
            deps: vec!["b".into()],
            tags: vec![],
        };
        let b = Feature {
            id: "b".into(),
            kind: FeatureKind::PlaneDatum(PlaneDatumParams {
                result: "datum:b".into(),
                plane: PlaneRef::Inline {
                    origin: [0.0, 0.0, 0.0],
                    normal: Axis::PlusZ,
                },
            }),
            deps: vec!["a".into()],
            tags: vec![],
        };
        a.deps = vec!["b".into()];
        let part = part_with(vec![a, b]);
        let err = schedule(&part).unwrap_err();
        assert_eq!(err.code, ErrorCode::Cycle);
    }

    #[test]
    fn every_edge_respects_schedule_order() {
        let part = part_with(vec![hole_on("h1", "base", "body:main"), extrude("base", "body:main")]);
        let (graph, order) = schedule(&part).unwrap();
        let index_of = |id: &str| order.iter().position(|x| x == id).unwrap();
        for edge in &graph.edges {
            assert!(index_of(&edge.from) < index_of(&edge.to));
        }
    }
}
