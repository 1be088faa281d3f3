use std::path::Path;

use anyhow::{anyhow, bail, Context};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::graph::{City, CityId, CityKind, Graph, MAX_CITIES};

/// Reads and parses a graph description file, see [parse_graph] for the format.
pub fn load_graph(path: impl AsRef<Path>) -> anyhow::Result<Graph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("error reading graph file {:?}", path))?;

    let graph = parse_graph(&text)
        .with_context(|| format!("error parsing graph file {:?}", path))?;
    info!("graph loaded from {:?}: {} cities, {} edges, {} capitals", path, graph.len(), graph.num_edges(), graph.capitals().count());
    Ok(graph)
}

/// The format is line based, and blank lines or lines starting with `#` are skipped:
///
/// ```text
/// N M
/// <N lines>  id name type     (type: 0 = regional, 1 = capital)
/// <M lines>  u v weight
/// ```
///
/// A city's name may consist of several words. Node lines can come in any order, but every
///  id in `[0, N)` must appear exactly once.
pub fn parse_graph(text: &str) -> anyhow::Result<Graph> {
    let mut lines = text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (line_no, header) = lines.next()
        .ok_or_else(|| anyhow!("missing header line"))?;
    let (num_cities, num_edges) = parse_header(header)
        .with_context(|| format!("line {}: invalid header", line_no))?;

    let mut cities: Vec<Option<City>> = vec![None; num_cities];
    let mut seen_ids = FxHashSet::default();
    for _ in 0..num_cities {
        let (line_no, line) = lines.next()
            .ok_or_else(|| anyhow!("expected {} city lines, file ended early", num_cities))?;
        let city = parse_city(line, num_cities)
            .with_context(|| format!("line {}: invalid city", line_no))?;
        if !seen_ids.insert(city.id) {
            bail!("line {}: duplicate city id {}", line_no, city.id);
        }
        let id = city.id;
        cities[id] = Some(city);
    }

    let cities = cities.into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow!("not all city ids in [0, {}) are defined", num_cities))?;
    let mut graph = Graph::new(cities)?;

    for _ in 0..num_edges {
        let (line_no, line) = lines.next()
            .ok_or_else(|| anyhow!("expected {} edge lines, file ended early", num_edges))?;
        let (u, v, weight) = parse_edge(line)
            .with_context(|| format!("line {}: invalid edge", line_no))?;
        graph.set_edge(u, v, weight)
            .with_context(|| format!("line {}: invalid edge", line_no))?;
    }

    if let Some((line_no, line)) = lines.next() {
        bail!("line {}: unexpected content after the last edge: {:?}", line_no, line);
    }

    debug!("parsed graph {:?}", graph);
    Ok(graph)
}

fn parse_header(line: &str) -> anyhow::Result<(usize, usize)> {
    let mut tokens = line.split_whitespace();
    let num_cities: usize = next_number(&mut tokens, "city count")?;
    let num_edges: usize = next_number(&mut tokens, "edge count")?;
    if tokens.next().is_some() {
        bail!("expected exactly two numbers");
    }
    if num_cities > MAX_CITIES {
        bail!("{} cities exceed the maximum of {}", num_cities, MAX_CITIES);
    }
    Ok((num_cities, num_edges))
}

fn parse_city(line: &str, num_cities: usize) -> anyhow::Result<City> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 3 {
        bail!("expected 'id name type', got {:?}", line);
    }

    let id: CityId = tokens[0].parse()
        .with_context(|| format!("invalid city id {:?}", tokens[0]))?;
    if id >= num_cities {
        bail!("city id {} is outside [0, {})", id, num_cities);
    }

    let raw_kind: u8 = tokens[tokens.len() - 1].parse()
        .with_context(|| format!("invalid city type {:?}", tokens[tokens.len() - 1]))?;
    let kind = CityKind::try_from(raw_kind)
        .map_err(|_| anyhow!("city type must be 0 (regional) or 1 (capital), was {}", raw_kind))?;

    let name = tokens[1..tokens.len() - 1].join(" ");
    Ok(City::new(id, name, kind))
}

fn parse_edge(line: &str) -> anyhow::Result<(CityId, CityId, u32)> {
    let mut tokens = line.split_whitespace();
    let u = next_number(&mut tokens, "first city")?;
    let v = next_number(&mut tokens, "second city")?;
    let weight = next_number(&mut tokens, "weight")?;
    if tokens.next().is_some() {
        bail!("expected 'u v weight', got {:?}", line);
    }
    Ok((u, v, weight))
}

fn next_number<'a, T: std::str::FromStr>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> anyhow::Result<T>
where T::Err: std::error::Error + Send + Sync + 'static
{
    let token = tokens.next()
        .ok_or_else(|| anyhow!("missing {}", what))?;
    token.parse()
        .with_context(|| format!("invalid {}: {:?}", what, token))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const SAMPLE: &str = "\
# regional graph
3 2

0 Manaus 1
1 Sao Gabriel da Cachoeira 0
2 Itacoatiara 0
0 1 850
# comment between edges
0 2 270
";

    #[test]
    fn test_parse_sample() {
        let graph = parse_graph(SAMPLE).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.city(0).unwrap(), &City::new(0, "Manaus", CityKind::Capital));
        assert_eq!(graph.city(1).unwrap().name, "Sao Gabriel da Cachoeira");
        assert_eq!(graph.classify(2), Some(CityKind::Regional));
        assert_eq!(graph.weight(1, 0), Some(850));
        assert_eq!(graph.weight(1, 2), None);
    }

    #[test]
    fn test_parse_nodes_out_of_order() {
        let graph = parse_graph("2 1\n1 b 1\n0 a 0\n0 1 5\n").unwrap();
        assert_eq!(graph.city_name(0), "a");
        assert_eq!(graph.city_name(1), "b");
    }

    #[test]
    fn test_repeated_edge_overwrites() {
        let graph = parse_graph("2 2\n0 a 0\n1 b 1\n0 1 5\n1 0 9\n").unwrap();
        assert_eq!(graph.weight(0, 1), Some(9));
    }

    #[test]
    fn test_bundled_graph_file() {
        let graph = parse_graph(include_str!("../../data/grafo_amazonia_legal.txt")).unwrap();
        assert!(graph.len() <= MAX_CITIES);
        assert_eq!(graph.capitals().count(), 9);
        for source in 0..graph.len() {
            assert!(graph.shortest_distances(source).iter().all(|d| d.is_some()), "graph should be connected");
        }
    }

    #[rstest]
    #[case::empty("")]
    #[case::only_comments("# nothing\n\n")]
    #[case::bad_header("x 1\n")]
    #[case::header_extra_token("1 0 7\n0 a 0\n")]
    #[case::too_many_cities("51 0\n")]
    #[case::missing_city("2 0\n0 a 0\n")]
    #[case::city_missing_type("1 0\n0 a\n")]
    #[case::city_bad_type("1 0\n0 a 2\n")]
    #[case::city_id_out_of_range("1 0\n1 a 0\n")]
    #[case::duplicate_city("2 0\n0 a 0\n0 b 1\n")]
    #[case::missing_edge("2 1\n0 a 0\n1 b 1\n")]
    #[case::edge_out_of_range("2 1\n0 a 0\n1 b 1\n0 2 5\n")]
    #[case::negative_weight("2 1\n0 a 0\n1 b 1\n0 1 -5\n")]
    #[case::self_loop("2 1\n0 a 0\n1 b 1\n1 1 5\n")]
    #[case::trailing_garbage("2 1\n0 a 0\n1 b 1\n0 1 5\n0 1 6\n")]
    fn test_parse_invalid(#[case] text: &str) {
        assert!(parse_graph(text).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_graph("/this/file/does/not/exist.txt").is_err());
    }
}
