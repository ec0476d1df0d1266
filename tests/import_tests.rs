//! End-to-end tests for the two-pass import: junction detection, edge
//! construction, tag normalization, and graph-file persistence.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tempfile::NamedTempFile;

use towergraph::{
    geo, CarTagEncoder, CommittedEdge, Coordinate, EdgeFlags, Error, FeatureSource, GeoJsonSource,
    GraphFile, GraphImporter, MemGraph, MemorySource, Road, TagEncoder, Way, WayAccess,
};

fn line(points: &[(f64, f64)]) -> Vec<Coordinate> {
    points
        .iter()
        .map(|&(lon, lat)| Coordinate::new(lon, lat))
        .collect()
}

fn residential(id: i64, points: &[(f64, f64)]) -> Road {
    Road::new(id, vec![line(points)]).with_attr("fclass", "residential")
}

/// A road network with one crossing: road 1 runs west-east through (1, 0),
/// road 2 runs south-north through the same point.
fn crossing_roads() -> MemorySource {
    MemorySource::new(vec![
        residential(1, &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
        residential(2, &[(1.0, -1.0), (1.0, 0.0), (1.0, 1.0)]),
    ])
}

#[test]
fn test_node_count_matches_distinct_junction_coordinates() {
    // Endpoints: (0,0), (2,0), (1,-1), (1,1), (3,0). Shared interior: (1,0).
    let mut source = crossing_roads();
    source.push(residential(3, &[(2.0, 0.0), (3.0, 0.0)]));

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.nodes, 6);
    assert_eq!(graph.node_count(), 6);
    let ids: Vec<u32> = graph.nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_node_ids_follow_first_promotion_order() {
    let importer = GraphImporter::new(crossing_roads(), CarTagEncoder);
    let mut graph = MemGraph::new();
    let registry = importer.build_junctions(&mut graph).unwrap();

    // Road 1: (0,0) and (2,0) are promoted as endpoints; (1,0) only becomes
    // a node when road 2 walks over it again.
    let id_of = |lon: f64, lat: f64| {
        registry
            .lookup(&Coordinate::new(lon, lat))
            .node_id()
            .unwrap()
    };
    assert_eq!(id_of(0.0, 0.0), 1);
    assert_eq!(id_of(2.0, 0.0), 2);
    assert_eq!(id_of(1.0, -1.0), 3);
    assert_eq!(id_of(1.0, 0.0), 4);
    assert_eq!(id_of(1.0, 1.0), 5);

    // Node positions were emitted in the same order.
    assert_eq!(graph.nodes[3].lon, 1.0);
    assert_eq!(graph.nodes[3].lat, 0.0);
}

#[test]
fn test_import_is_deterministic() {
    let source = crossing_roads();

    let mut first = MemGraph::new();
    GraphImporter::new(source.clone(), CarTagEncoder)
        .read_graph(&mut first)
        .unwrap();

    let mut second = MemGraph::new();
    GraphImporter::new(source, CarTagEncoder)
        .read_graph(&mut second)
        .unwrap();

    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
}

#[test]
fn test_two_point_road_yields_single_bare_edge() {
    let a = (13.4, 52.5);
    let b = (13.5, 52.6);
    let source = MemorySource::new(vec![residential(1, &[a, b])]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.nodes, 2);
    assert_eq!(graph.edge_count(), 1);

    let edge = &graph.edges[0];
    assert_eq!((edge.from, edge.to), (1, 2));
    assert!(edge.pillars.is_empty());

    let expected = geo::distance_m(&Coordinate::new(a.0, a.1), &Coordinate::new(b.0, b.1));
    assert!((edge.distance_m - expected).abs() < 1e-9);
}

#[test]
fn test_edge_distances_sum_to_polyline_length() {
    let mut importer = GraphImporter::new(crossing_roads(), CarTagEncoder);
    let mut graph = MemGraph::new();
    importer.read_graph(&mut graph).unwrap();

    // Road 1 commits first and is split in two at the crossing.
    assert_eq!(graph.edge_count(), 4);
    let split_sum: f64 = graph.edges[..2].iter().map(|e| e.distance_m).sum();
    let full = geo::polyline_length_m(&line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]));
    assert!((split_sum - full).abs() < 1e-6);
}

#[test]
fn test_interior_points_become_pillars_of_the_edge() {
    let pts = [(0.0, 0.0), (0.3, 0.1), (0.6, -0.1), (1.0, 0.0)];
    let source = MemorySource::new(vec![residential(1, &pts)]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    importer.read_graph(&mut graph).unwrap();

    assert_eq!(graph.edge_count(), 1);
    let edge = &graph.edges[0];
    assert_eq!(
        edge.pillars,
        vec![Coordinate::new(0.3, 0.1), Coordinate::new(0.6, -0.1)]
    );

    let expected = geo::polyline_length_m(&line(&pts));
    assert!((edge.distance_m - expected).abs() < 1e-6);
}

#[test]
fn test_oneway_values_map_to_standard_vocabulary() {
    let source = MemorySource::new(vec![
        residential(1, &[(0.0, 0.0), (1.0, 0.0)]).with_attr("oneway", "f"),
        residential(2, &[(5.0, 0.0), (6.0, 0.0)]).with_attr("oneway", "t"),
        residential(3, &[(10.0, 0.0), (11.0, 0.0)]).with_attr("oneway", "b"),
        residential(4, &[(15.0, 0.0), (16.0, 0.0)]).with_attr("oneway", " B "),
    ]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    importer.add_listener(move |way: &Way, edge: &CommittedEdge| {
        log.borrow_mut()
            .push((way.id(), way.tag("oneway").map(str::to_string), edge.edge));
    });

    let mut graph = MemGraph::new();
    importer.read_graph(&mut graph).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], (1, Some("yes".to_string()), 0));
    assert_eq!(seen[1], (2, Some("-1".to_string()), 1));
    assert_eq!(seen[2], (3, Some("no".to_string()), 2));
    assert_eq!(seen[3], (4, Some("no".to_string()), 3));

    // The encoder turned the mapped values into directions.
    let access = |i: usize| CarTagEncoder::unpack(graph.edges[i].flags);
    assert!(access(0).forward && !access(0).backward);
    assert!(!access(1).forward && access(1).backward);
    assert!(access(2).forward && access(2).backward);
}

#[test]
fn test_unknown_oneway_aborts_with_road_id() {
    let source = MemorySource::new(vec![
        residential(42, &[(0.0, 0.0), (1.0, 0.0)]).with_attr("oneway", "x"),
    ]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let err = importer.read_graph(&mut graph).unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidOneway {
            road_id: 42,
            ref value
        } if value == "x"
    ));
    assert!(err.to_string().contains("42"));
}

#[test]
fn test_empty_oneway_is_treated_as_absent() {
    let source = MemorySource::new(vec![
        residential(1, &[(0.0, 0.0), (1.0, 0.0)]).with_attr("oneway", ""),
        residential(2, &[(5.0, 0.0), (6.0, 0.0)]).with_attr("oneway", "  "),
    ]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let tags = Rc::new(RefCell::new(Vec::new()));
    let log = tags.clone();
    importer.add_listener(move |way: &Way, _: &CommittedEdge| {
        log.borrow_mut().push(way.has_tag("oneway"));
    });

    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.edges_committed, 2);
    assert_eq!(*tags.borrow(), vec![false, false]);
}

#[test]
fn test_maxspeed_zero_means_no_data() {
    let source = MemorySource::new(vec![
        residential(1, &[(0.0, 0.0), (1.0, 0.0)]).with_attr("maxspeed", "0"),
        residential(2, &[(5.0, 0.0), (6.0, 0.0)]).with_attr("maxspeed", " 0 "),
        residential(3, &[(10.0, 0.0), (11.0, 0.0)]).with_attr("maxspeed", "50"),
    ]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    importer.add_listener(move |way: &Way, _: &CommittedEdge| {
        log.borrow_mut()
            .push((way.id(), way.tag("maxspeed").map(str::to_string)));
    });

    let mut graph = MemGraph::new();
    importer.read_graph(&mut graph).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0], (1, None));
    assert_eq!(seen[1], (2, None));
    assert_eq!(seen[2], (3, Some("50".to_string())));

    // Residential default is 30; the explicit 50 wins on road 3.
    assert_eq!(CarTagEncoder::unpack(graph.edges[0].flags).speed_kmh, 30.0);
    assert_eq!(CarTagEncoder::unpack(graph.edges[2].flags).speed_kmh, 50.0);
}

#[test]
fn test_closed_loop_terminates_with_self_loop_edge() {
    let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
    let source = MemorySource::new(vec![residential(1, &pts)]);

    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    // The closing coordinate is the opening one, so the loop has exactly
    // one node and one edge back to it.
    assert_eq!(summary.nodes, 1);
    assert_eq!(graph.edge_count(), 1);

    let edge = &graph.edges[0];
    assert_eq!(edge.from, edge.to);
    assert_eq!(
        edge.pillars,
        vec![Coordinate::new(1.0, 0.0), Coordinate::new(1.0, 1.0)]
    );

    let expected = geo::polyline_length_m(&line(&pts));
    assert!((edge.distance_m - expected).abs() < 1e-6);
}

#[test]
fn test_rejecting_every_road_fails_with_no_junctions() {
    let mut importer =
        GraphImporter::new(crossing_roads(), CarTagEncoder).with_filter(|_: &Road| false);

    let mut graph = MemGraph::new();
    let err = importer.read_graph(&mut graph).unwrap_err();

    assert!(matches!(err, Error::NoJunctions { .. }));
    assert!(err.to_string().contains("memory source"));
    assert_eq!(graph.node_count(), 0);
}

#[test]
fn test_empty_source_fails_with_no_junctions() {
    let mut importer = GraphImporter::new(MemorySource::new(Vec::new()), CarTagEncoder);
    let mut graph = MemGraph::new();
    assert!(matches!(
        importer.read_graph(&mut graph),
        Err(Error::NoJunctions { .. })
    ));
}

#[test]
fn test_duplicate_points_behave_asymmetrically() {
    // The junction pass skips repeated coordinates within a run; the edge
    // pass does not. A repeated interior point therefore shows up twice in
    // the committed shape.
    let source = MemorySource::new(vec![residential(
        1,
        &[(0.0, 0.0), (0.5, 0.0), (0.5, 0.0), (1.0, 0.0)],
    )]);
    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.nodes, 2);
    assert_eq!(graph.edge_count(), 1);
    let edge = &graph.edges[0];
    assert_eq!(edge.pillars.len(), 2);
    assert_eq!(edge.pillars[0], edge.pillars[1]);

    // A repeated tower point closes a zero-length edge onto itself.
    let source = MemorySource::new(vec![residential(
        2,
        &[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)],
    )]);
    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.nodes, 2);
    assert_eq!(graph.edge_count(), 2);
    let loop_edge = &graph.edges[0];
    assert_eq!(loop_edge.from, loop_edge.to);
    assert_eq!(loop_edge.distance_m, 0.0);
    assert!(loop_edge.pillars.is_empty());
    assert_eq!((graph.edges[1].from, graph.edges[1].to), (1, 2));
}

#[test]
fn test_listeners_fire_in_registration_order() {
    let source = MemorySource::new(vec![
        residential(1, &[(0.0, 0.0), (1.0, 0.0)]),
        residential(2, &[(5.0, 0.0), (6.0, 0.0)]),
    ]);
    let mut importer = GraphImporter::new(source, CarTagEncoder);

    let events = Rc::new(RefCell::new(Vec::new()));
    for marker in [1u8, 2u8] {
        let log = events.clone();
        importer.add_listener(move |_: &Way, edge: &CommittedEdge| {
            log.borrow_mut().push((marker, edge.edge));
        });
    }

    let mut graph = MemGraph::new();
    importer.read_graph(&mut graph).unwrap();

    assert_eq!(*events.borrow(), vec![(1, 0), (2, 0), (1, 1), (2, 1)]);
}

#[test]
fn test_two_phase_api() {
    let mut importer = GraphImporter::new(crossing_roads(), CarTagEncoder);
    let mut graph = MemGraph::new();

    let registry = importer.build_junctions(&mut graph).unwrap();
    assert_eq!(registry.node_count() as usize, graph.node_count());

    // build_edges consumes the registry; it cannot be reused afterwards.
    let stats = importer.build_edges(registry, &mut graph).unwrap();
    assert_eq!(stats.committed, graph.edge_count());
    assert_eq!(stats.rejected, 0);
}

/// Yields different geometry on the second traversal, which the edge pass
/// must detect instead of committing edges with bogus node ids.
struct SwitchingSource {
    opened: RefCell<usize>,
}

impl FeatureSource for SwitchingSource {
    type Iter = std::vec::IntoIter<towergraph::Result<Road>>;

    fn open(&self) -> towergraph::Result<Self::Iter> {
        let mut opened = self.opened.borrow_mut();
        *opened += 1;
        let road = if *opened == 1 {
            residential(1, &[(0.0, 0.0), (1.0, 0.0)])
        } else {
            residential(1, &[(5.0, 5.0), (1.0, 0.0)])
        };
        Ok(vec![Ok(road)].into_iter())
    }

    fn describe(&self) -> String {
        "switching source".to_string()
    }
}

#[test]
fn test_source_must_replay_identically() {
    let source = SwitchingSource {
        opened: RefCell::new(0),
    };
    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();

    let err = importer.read_graph(&mut graph).unwrap_err();
    assert!(matches!(err, Error::PassMismatch { road_id: 1 }));
}

/// Accepts every way but refuses to give it flags.
struct EmptyFlagsEncoder;

impl TagEncoder for EmptyFlagsEncoder {
    fn accept_way(&self, _way: &Way) -> Option<WayAccess> {
        Some(WayAccess {
            forward: true,
            backward: true,
            speed_kmh: 50.0,
        })
    }

    fn encode(&self, _way: &Way, _access: WayAccess) -> EdgeFlags {
        EdgeFlags::EMPTY
    }
}

#[test]
fn test_empty_flags_drop_the_edge_silently() {
    let mut importer = GraphImporter::new(crossing_roads(), EmptyFlagsEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    assert_eq!(summary.nodes, 5);
    assert_eq!(summary.edges_committed, 0);
    assert_eq!(summary.ways_rejected, 4);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_geojson_import_to_graph_file() {
    let mut roads = NamedTempFile::new().unwrap();
    write!(
        roads,
        r#"{{
            "type": "FeatureCollection",
            "features": [
                {{
                    "type": "Feature",
                    "properties": {{"osm_id": 1001, "fclass": "residential", "oneway": "f", "maxspeed": 50}},
                    "geometry": {{"type": "LineString", "coordinates": [[13.40, 52.50], [13.45, 52.55], [13.50, 52.50]]}}
                }},
                {{
                    "type": "Feature",
                    "properties": {{"osm_id": 1002, "fclass": "primary"}},
                    "geometry": {{"type": "LineString", "coordinates": [[13.45, 52.50], [13.45, 52.55], [13.45, 52.60]]}}
                }},
                {{
                    "type": "Feature",
                    "properties": {{"osm_id": "777", "fclass": "secondary"}},
                    "geometry": {{"type": "MultiLineString", "coordinates": [
                        [[0.0, 0.0], [0.1, 0.0]],
                        [[0.2, 0.0], [0.3, 0.0]]
                    ]}}
                }}
            ]
        }}"#
    )
    .unwrap();

    let source = GeoJsonSource::new(roads.path());
    let mut importer = GraphImporter::new(source, CarTagEncoder);
    let mut graph = MemGraph::new();
    let summary = importer.read_graph(&mut graph).unwrap();

    // 8 endpoints plus the crossing at (13.45, 52.55).
    assert_eq!(summary.nodes, 9);
    assert_eq!(summary.edges_committed, 6);
    assert_eq!(summary.ways_rejected, 0);

    // Road 1001 is oneway forward with an explicit maxspeed.
    let access = CarTagEncoder::unpack(graph.edges[0].flags);
    assert!(access.forward && !access.backward);
    assert_eq!(access.speed_kmh, 50.0);

    let graph_file = NamedTempFile::new().unwrap();
    GraphFile::write(graph_file.path(), &graph.nodes, &graph.edges).unwrap();

    let info = GraphFile::verify(graph_file.path()).unwrap();
    assert_eq!(info.node_count, 9);
    assert_eq!(info.edge_count, 6);

    let loaded = GraphFile::read(graph_file.path()).unwrap();
    assert_eq!(loaded.nodes, graph.nodes);
    assert_eq!(loaded.edges, graph.edges);
}
