use crate::graph::CityId;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TeamStatus {
    Free,
    Busy,
}

/// Tracks which capital's team is currently out on a mission. It is sized to the number of
///  cities for simple indexing, though only capitals' entries are ever set to busy.
#[derive(Debug, Clone)]
pub struct TeamAvailability {
    teams: Vec<TeamStatus>,
}
impl TeamAvailability {
    pub fn new(num_cities: usize) -> TeamAvailability {
        TeamAvailability {
            teams: vec![TeamStatus::Free; num_cities],
        }
    }

    pub fn status(&self, team: CityId) -> Option<TeamStatus> {
        self.teams.get(team).copied()
    }

    /// ids outside the table are never free
    pub fn is_free(&self, team: CityId) -> bool {
        self.status(team) == Some(TeamStatus::Free)
    }

    /// returns `true` if the team was free before
    pub fn mark_busy(&mut self, team: CityId) -> bool {
        self.set(team, TeamStatus::Busy) == Some(TeamStatus::Free)
    }

    /// returns `true` if the team was busy before
    pub fn mark_free(&mut self, team: CityId) -> bool {
        self.set(team, TeamStatus::Free) == Some(TeamStatus::Busy)
    }

    fn set(&mut self, team: CityId, status: TeamStatus) -> Option<TeamStatus> {
        self.teams.get_mut(team)
            .map(|s| std::mem::replace(s, status))
    }

    pub fn busy_teams(&self) -> impl Iterator<Item = CityId> + '_ {
        self.teams.iter()
            .enumerate()
            .filter(|(_, &s)| s == TeamStatus::Busy)
            .map(|(id, _)| id)
    }
}
