use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::{Debug, Formatter};

use anyhow::{anyhow, bail};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub mod graph_loader;

/// Upper bound for the number of cities in a graph. It also bounds the number of entries in a
///  telemetry report, so it is part of the wire protocol.
pub const MAX_CITIES: usize = 50;

/// Cities are identified by a dense index in `[0, N)`. Teams are identified by the id of the
///  capital hosting them.
pub type CityId = usize;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum CityKind {
    Regional = 0,
    /// A capital hosts exactly one response team, and capitals are the only dispatch targets
    Capital = 1,
}

#[derive(Clone, Eq, PartialEq)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub kind: CityKind,
}
impl Debug for City {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}({:?})", self.name, self.id, self.kind)
    }
}
impl City {
    pub fn new(id: CityId, name: impl Into<String>, kind: CityKind) -> City {
        City {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn is_capital(&self) -> bool {
        self.kind == CityKind::Capital
    }
}

/// Weighted, undirected graph of cities, stored as a dense adjacency matrix. It is loaded once
///  on startup and shared read-only afterwards.
///
/// The matrix is kept symmetric with a zero diagonal by construction: the only way to add an
///  edge is [Graph::set_edge], which writes both directions.
pub struct Graph {
    cities: Vec<City>,
    /// row-major N x N; `None` means 'no edge'
    weights: Vec<Option<u32>>,
}
impl Debug for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Graph{{cities:{}, edges:{}}}", self.len(), self.num_edges())
    }
}

impl Graph {
    pub fn new(cities: Vec<City>) -> anyhow::Result<Graph> {
        if cities.len() > MAX_CITIES {
            bail!("graph has {} cities, the maximum is {}", cities.len(), MAX_CITIES);
        }
        for (idx, city) in cities.iter().enumerate() {
            if city.id != idx {
                bail!("city ids must be dense and ordered: found id {} at position {}", city.id, idx);
            }
        }

        let n = cities.len();
        let mut weights = vec![None; n * n];
        for i in 0..n {
            weights[i * n + i] = Some(0);
        }

        Ok(Graph {
            cities,
            weights,
        })
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(id)
    }

    pub fn classify(&self, id: CityId) -> Option<CityKind> {
        self.city(id).map(|c| c.kind)
    }

    pub fn capitals(&self) -> impl Iterator<Item = &City> {
        self.cities.iter()
            .filter(|c| c.is_capital())
    }

    /// Human-readable name for log output, tolerating ids that are not part of the graph
    pub fn city_name(&self, id: CityId) -> &str {
        self.city(id)
            .map(|c| c.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Converts an id received over the network to a [CityId], rejecting anything outside
    ///  `[0, N)`. Every id from the wire must pass through here before it is used as an index.
    pub fn validate_id(&self, raw: i32) -> anyhow::Result<CityId> {
        usize::try_from(raw).ok()
            .filter(|&id| id < self.len())
            .ok_or_else(|| anyhow!("city id {} is outside the valid range [0, {})", raw, self.len()))
    }

    pub fn set_edge(&mut self, u: CityId, v: CityId, weight: u32) -> anyhow::Result<()> {
        let n = self.len();
        if u >= n || v >= n {
            bail!("edge {}-{} references a city outside [0, {})", u, v, n);
        }
        if u == v {
            bail!("self-loop on city {}", u);
        }

        self.weights[u * n + v] = Some(weight);
        self.weights[v * n + u] = Some(weight);
        Ok(())
    }

    pub fn weight(&self, u: CityId, v: CityId) -> Option<u32> {
        let n = self.len();
        if u >= n || v >= n {
            return None;
        }
        self.weights[u * n + v]
    }

    pub fn num_edges(&self) -> usize {
        let n = self.len();
        (0..n)
            .flat_map(|u| (u+1..n).map(move |v| (u, v)))
            .filter(|&(u, v)| self.weights[u * n + v].is_some())
            .count()
    }

    fn neighbours(&self, u: CityId) -> impl Iterator<Item = (CityId, u32)> + '_ {
        let n = self.len();
        self.weights[u * n..(u + 1) * n].iter()
            .enumerate()
            .filter(move |&(v, _)| v != u)
            .filter_map(|(v, w)| w.map(|w| (v, w)))
    }

    /// Single-source shortest path distances (Dijkstra). Cities that cannot be reached from
    ///  `source` are `None`. An invalid `source` yields all `None`.
    pub fn shortest_distances(&self, source: CityId) -> Vec<Option<u64>> {
        let mut dist: Vec<Option<u64>> = vec![None; self.len()];
        if source >= self.len() {
            return dist;
        }

        let mut heap = BinaryHeap::new();
        dist[source] = Some(0);
        heap.push(Reverse((0u64, source)));

        while let Some(Reverse((d, u))) = heap.pop() {
            if dist[u].is_some_and(|known| d > known) {
                continue;
            }
            for (v, w) in self.neighbours(u) {
                let candidate = d + w as u64;
                if dist[v].map_or(true, |known| candidate < known) {
                    dist[v] = Some(candidate);
                    heap.push(Reverse((candidate, v)));
                }
            }
        }
        dist
    }
}
