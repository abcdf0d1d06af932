//! Deterministic flocking scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// FLK-001: identical headings, Vicsek, ends once the alignment window fills
    Consensus,

    /// FLK-002: zero communication range, every agent isolated on step 0
    Isolation,

    /// FLK-003: star topology drawn once and held for the episode
    StarHub,

    /// FLK-004: neighbors across the periodic seam
    WrapAround,

    // Long invariant audits over random swarms
    /// FLK-005: Vicsek over a variable-size pool with range communication
    VicsekFlock,

    /// FLK-006: ACS on a periodic domain over a variable-size pool
    AcsFlock,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Consensus,
            ScenarioId::Isolation,
            ScenarioId::StarHub,
            ScenarioId::WrapAround,
            ScenarioId::VicsekFlock,
            ScenarioId::AcsFlock,
        ]
    }

    /// Short scenarios with exact expected outcomes.
    pub fn standard() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Consensus,
            ScenarioId::Isolation,
            ScenarioId::StarHub,
            ScenarioId::WrapAround,
        ]
    }

    /// Long runs that audit state invariants every step.
    pub fn audits() -> Vec<ScenarioId> {
        vec![ScenarioId::VicsekFlock, ScenarioId::AcsFlock]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Consensus => "consensus",
            ScenarioId::Isolation => "isolation",
            ScenarioId::StarHub => "star_hub",
            ScenarioId::WrapAround => "wrap_around",
            ScenarioId::VicsekFlock => "vicsek_flock",
            ScenarioId::AcsFlock => "acs_flock",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Consensus => {
                "4 aligned agents, unbounded Vicsek; done exactly when the window fills"
            }
            ScenarioId::Isolation => {
                "5 agents with comm_range 0; comm loss ends the episode on step 0"
            }
            ScenarioId::StarHub => {
                "6 agents on a star graph; one hub, five leaves, graph never changes"
            }
            ScenarioId::WrapAround => {
                "3 agents on a 100 m torus; agents at x=-48 and x=48 are 4 m apart"
            }
            ScenarioId::VicsekFlock => {
                "10-20 agents, range 60 m, Vicsek; invariants audited every step"
            }
            ScenarioId::AcsFlock => "10-20 agents, periodic ACS; invariants audited every step",
        }
    }

    /// Returns true if this is a long audit run.
    pub fn is_audit(&self) -> bool {
        matches!(self, ScenarioId::VicsekFlock | ScenarioId::AcsFlock)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consensus" | "flk-001" => Ok(ScenarioId::Consensus),
            "isolation" | "flk-002" => Ok(ScenarioId::Isolation),
            "star_hub" | "starhub" | "flk-003" => Ok(ScenarioId::StarHub),
            "wrap_around" | "wraparound" | "flk-004" => Ok(ScenarioId::WrapAround),
            "vicsek_flock" | "vicsekflock" | "flk-005" => Ok(ScenarioId::VicsekFlock),
            "acs_flock" | "acsflock" | "flk-006" => Ok(ScenarioId::AcsFlock),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert_eq!("FLK-003".parse::<ScenarioId>(), Ok(ScenarioId::StarHub));
        assert!("chaos".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_every_scenario_described() {
        let descriptions: Vec<&str> = ScenarioId::all().iter().map(|s| s.description()).collect();
        assert!(descriptions.iter().all(|d| !d.is_empty()));
        for (i, d) in descriptions.iter().enumerate() {
            assert!(!descriptions[i + 1..].contains(d));
        }
    }

    #[test]
    fn test_groups_partition_all() {
        let mut grouped = ScenarioId::standard();
        grouped.extend(ScenarioId::audits());
        assert_eq!(grouped, ScenarioId::all());
        assert!(ScenarioId::audits().iter().all(|s| s.is_audit()));
    }
}
