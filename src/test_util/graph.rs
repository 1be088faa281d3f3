use crate::graph::{City, CityKind, Graph};

/// Cities 0 to n-1 without any edges, the ones listed in `capitals` being capitals
pub fn graph_without_edges(n: usize, capitals: &[usize]) -> Graph {
    let cities = (0..n)
        .map(|id| {
            let kind = if capitals.contains(&id) { CityKind::Capital } else { CityKind::Regional };
            City::new(id, format!("city-{}", id), kind)
        })
        .collect();
    Graph::new(cities).unwrap()
}

/// A small connected graph with capitals 1, 2 and 4:
///
/// ```ascii
///      4        6        3        2
///  0 ------ 1 ------ 2 ------ 3 ------ 5
///  |                  \______________/ |
///  |                          8        |
///  +----------- 20 ---- 4 ---- 12 -----+
/// ```
///
/// Seen from city 5, team 2 is at distance 5, team 1 at 11 and team 4 at 12.
pub fn test_graph() -> Graph {
    let mut graph = graph_without_edges(6, &[1, 2, 4]);
    for (u, v, weight) in [(0, 1, 4), (1, 2, 6), (2, 3, 3), (3, 5, 2), (2, 5, 8), (4, 5, 12), (0, 4, 20)] {
        graph.set_edge(u, v, weight).unwrap();
    }
    graph
}
