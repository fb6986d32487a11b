use geo::{point, Rect, coord};
use geomoran::{
    AdjacencyGraph, AnalysisConfig, Contiguity, Crs, FeatureSet, Geometry, SpatialAutocorrelationEngine, SpatialWeights,
};
use proptest::prelude::*;

fn lattice(side: usize, values: Vec<f64>) -> FeatureSet {
    let geoms = (0..side * side)
        .map(|i| {
            let (x, y) = ((i % side) as f64, (i / side) as f64);
            Rect::new(coord! { x: x, y: y }, coord! { x: x + 1.0, y: y + 1.0 }).to_polygon().into()
        })
        .collect();
    FeatureSet::new(geoms, values, Some(Crs::WEB_MERCATOR)).unwrap()
}

proptest! {
    #[test]
    fn row_standardized_rows_sum_to_one(coords in prop::collection::vec((0.0..1000.0f64, 0.0..1000.0f64), 2..40)) {
        let geoms: Vec<Geometry> = coords.iter().map(|&(x, y)| point!(x: x, y: y).into()).collect();
        let n = geoms.len();
        let features = FeatureSet::new(geoms, vec![0.0; n], Some(Crs::WEB_MERCATOR)).unwrap();

        let graph = Contiguity::DistanceBand { threshold: 5000.0 }.build(&features).unwrap();
        prop_assert!(!graph.has_islands());
        prop_assert!(graph.is_symmetric());

        let weights = SpatialWeights::row_standardized(graph);
        for i in 0..n {
            prop_assert_eq!(weights.graph().degree(i), n - 1);
            prop_assert!((weights.row_sum(i) - 1.0).abs() < 1e-9);
        }
        prop_assert!((weights.s0() - n as f64).abs() < 1e-9);
    }

    #[test]
    fn quadrants_ignore_a_constant_shift(values in prop::collection::vec(0i32..100, 16), shift in -1000i32..1000) {
        let engine = SpatialAutocorrelationEngine::new(AnalysisConfig {
            contiguity: Contiguity::Rook { tolerance: 0.0 },
            permutations: 0,
            ..AnalysisConfig::default()
        }).unwrap();

        let base = lattice(4, values.iter().map(|&v| v as f64).collect());
        let shifted = lattice(4, values.iter().map(|&v| (v + shift) as f64).collect());

        let a = engine.analyze(&base).unwrap();
        let b = engine.analyze(&shifted).unwrap();

        let quadrants = |stats: &[geomoran::LocalStatistic]| stats.iter().map(|s| s.quadrant()).collect::<Vec<_>>();
        prop_assert_eq!(quadrants(&a.local.stats), quadrants(&b.local.stats));
        prop_assert_eq!(a.global.i, b.global.i);
    }

    #[test]
    fn csr_rows_are_sorted_and_loop_free(rows in prop::collection::vec(prop::collection::vec(0u32..20, 0..6), 20)) {
        let graph = AdjacencyGraph::from_neighbors(&rows).unwrap();
        for i in 0..graph.node_count() {
            let row = graph.neighbor_slice(i);
            prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!row.contains(&(i as u32)));
            prop_assert_eq!(graph.degree(i) == 0, graph.islands().contains(&i));
        }
    }
}
