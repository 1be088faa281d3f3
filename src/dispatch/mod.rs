use tracing::trace;

use crate::graph::{CityId, Graph};

mod team_availability;

pub use team_availability::{TeamAvailability, TeamStatus};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TeamSelection {
    Selected {
        team: CityId,
        distance: u64,
    },
    /// every capital's team is busy or unreachable from the alerting city - this is a regular
    ///  outcome rather than an error
    NoTeamAvailable,
}

/// Finds the nearest capital with a free team, as seen from `source`. Ties on distance go to the
///  capital with the lowest id.
///
/// This is a pure function: marking the selected team busy is the caller's responsibility, and
///  it must happen before the next selection is done.
pub fn select_team(graph: &Graph, source: CityId, availability: &TeamAvailability) -> TeamSelection {
    let distances = graph.shortest_distances(source);

    let mut best: Option<(CityId, u64)> = None;
    for capital in graph.capitals() {
        if !availability.is_free(capital.id) {
            trace!("team {:?} is busy", capital);
            continue;
        }
        let Some(distance) = distances[capital.id] else {
            trace!("team {:?} is unreachable from {}", capital, source);
            continue;
        };

        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((capital.id, distance));
        }
    }

    match best {
        Some((team, distance)) => TeamSelection::Selected { team, distance },
        None => TeamSelection::NoTeamAvailable,
    }
}
