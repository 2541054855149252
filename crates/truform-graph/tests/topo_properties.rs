use proptest::prelude::*;
use truform_graph::{schedule, DepGraph};
use truform_ir::feature::{AxisDatumParams, AxisRef};
use truform_ir::selector::Axis;
use truform_ir::{Feature, FeatureKind, Part};

fn datum_part(n: usize, dep_density: &[(usize, usize)]) -> Part {
    let features: Vec<Feature> = (0..n)
        .map(|i| {
            let mut deps = Vec::new();
            for &(from, to) in dep_density {
                if to == i {
                    deps.push(format!("f{from}"));
                }
            }
            Feature {
                id: format!("f{i}"),
                kind: FeatureKind::AxisDatum(AxisDatumParams {
                    result: format!("axis:{i}"),
                    axis: AxisRef::Inline {
                        origin: [0.0, 0.0, 0.0],
                        direction: Axis::PlusZ,
                    },
                }),
                deps,
                tags: vec![],
            }
        })
        .collect();
    Part {
        id: "p".into(),
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

fn assert_topo_sound(graph: &DepGraph, order: &[String]) {
    let index_of = |id: &str| order.iter().position(|x| x == id).unwrap();
    for edge in &graph.edges {
        assert!(index_of(&edge.from) < index_of(&edge.to), "edge {:?} violated in {:?}", edge, order);
    }
    let mut sorted = order.to_vec();
    sorted.sort();
    let mut nodes = graph.nodes.clone();
    nodes.sort();
    assert_eq!(sorted, nodes, "schedule must be a permutation of the feature ids");
}

proptest! {
    #[test]
    fn acyclic_random_graphs_schedule_soundly(n in 2usize..8, seed in 0u32..50) {
        // Only edges from a lower index to a higher one, so the graph is
        // acyclic by construction regardless of seed.
        let mut deps = Vec::new();
        let mut s = seed;
        for i in 0..n {
            for j in (i + 1)..n {
                s = s.wrapping_mul(1103515245).wrapping_add(12345);
                if s % 3 == 0 {
                    deps.push((i, j));
                }
            }
        }
        let part = datum_part(n, &deps);
        let (graph, order) = schedule(&part).unwrap();
        assert_topo_sound(&graph, &order);
    }

    #[test]
    fn schedule_is_independent_of_feature_insertion_order(n in 2usize..6, seed in 0u32..20) {
        let mut deps = Vec::new();
        let mut s = seed;
        for i in 0..n {
            for j in (i + 1)..n {
                s = s.wrapping_mul(1103515245).wrapping_add(12345);
                if s % 2 == 0 {
                    deps.push((i, j));
                }
            }
        }
        let forward = datum_part(n, &deps);
        let mut backward = forward.clone();
        backward.features.reverse();

        let (_, order_a) = schedule(&forward).unwrap();
        let (_, order_b) = schedule(&backward).unwrap();
        assert_eq!(order_a, order_b);
    }
}
