//! Communication topology: who each agent hears on a given step.
//!
//! Range-limited graphs are recomputed from positions every step. Fixed
//! graphs (line, ring, star) are drawn once per episode at reset and then
//! returned verbatim from a cache.

use crate::error::{FlockError, Result};
use crate::geometry::Boundary;
use crate::state::{Adjacency, AgentState, PaddingMask};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Graph shapes that are drawn once per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum FixedTopology {
    /// Random Hamiltonian path over the active agents
    Line,

    /// Line plus an edge closing the cycle
    Ring,

    /// One random hub linked to every other active agent
    Star,
}

impl FixedTopology {
    pub fn name(&self) -> &'static str {
        match self {
            FixedTopology::Line => "line",
            FixedTopology::Ring => "ring",
            FixedTopology::Star => "star",
        }
    }
}

impl std::str::FromStr for FixedTopology {
    type Err = FlockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "line" => Ok(FixedTopology::Line),
            "ring" => Ok(FixedTopology::Ring),
            "star" => Ok(FixedTopology::Star),
            _ => Err(FlockError::unsupported(format!("custom topology '{}'", s))),
        }
    }
}

impl TryFrom<String> for FixedTopology {
    type Error = FlockError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Communication mode, resolved once from validated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommMode {
    /// Everyone hears everyone
    Unbounded,

    /// Agents within `range` meters hear each other
    Range(f64),

    /// Graph drawn at reset and held for the episode
    Fixed(FixedTopology),
}

impl CommMode {
    pub fn is_range(&self) -> bool {
        matches!(self, CommMode::Range(_))
    }
}

/// Output of a topology computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyUpdate {
    /// Neighbor adjacency, self-loops included for active agents
    pub adjacency: Adjacency,

    /// Active agents whose only neighbor is themselves (range mode only)
    pub isolated: Vec<bool>,
}

impl TopologyUpdate {
    fn without_isolation(adjacency: Adjacency) -> Self {
        let isolated = vec![false; adjacency.nrows()];
        Self {
            adjacency,
            isolated,
        }
    }

    /// True if at least one agent lost all its neighbors.
    pub fn any_isolated(&self) -> bool {
        self.isolated.iter().any(|&lost| lost)
    }
}

/// Computes the neighbor graph for each new state.
#[derive(Debug, Clone)]
pub struct TopologyEngine {
    mode: CommMode,
    boundary: Boundary,
    fixed_cache: Option<Adjacency>,
}

impl TopologyEngine {
    pub fn new(mode: CommMode, boundary: Boundary) -> Self {
        Self {
            mode,
            boundary,
            fixed_cache: None,
        }
    }

    pub fn mode(&self) -> CommMode {
        self.mode
    }

    /// Switches the communication mode and drops any cached fixed graph.
    pub fn set_mode(&mut self, mode: CommMode) {
        self.mode = mode;
        self.fixed_cache = None;
    }

    /// Fixed graph drawn at the last reset, if any.
    pub fn fixed_cache(&self) -> Option<&Adjacency> {
        self.fixed_cache.as_ref()
    }

    /// Computes the episode's initial graph, redrawing any fixed topology.
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        agents: &[AgentState],
        padding: &PaddingMask,
        rng: &mut R,
    ) -> Result<TopologyUpdate> {
        self.fixed_cache = None;
        self.update(agents, padding, rng)
    }

    /// Computes the graph for a freshly integrated state.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        agents: &[AgentState],
        padding: &PaddingMask,
        rng: &mut R,
    ) -> Result<TopologyUpdate> {
        match self.mode {
            CommMode::Unbounded => {
                Ok(TopologyUpdate::without_isolation(unbounded_adjacency(padding)))
            }
            CommMode::Range(range) => Ok(range_adjacency(agents, padding, self.boundary, range)),
            CommMode::Fixed(kind) => {
                let adjacency = match &self.fixed_cache {
                    Some(cached) => cached.clone(),
                    None => {
                        let drawn = fixed_adjacency(kind, padding, rng)?;
                        self.fixed_cache = Some(drawn.clone());
                        drawn
                    }
                };
                Ok(TopologyUpdate::without_isolation(adjacency))
            }
        }
    }
}

fn empty_adjacency(capacity: usize) -> Adjacency {
    DMatrix::from_element(capacity, capacity, false)
}

/// Complete graph over the active block.
pub fn unbounded_adjacency(padding: &PaddingMask) -> Adjacency {
    let n = padding.capacity();
    DMatrix::from_fn(n, n, |i, j| padding.pair_active(i, j))
}

/// Disk graph: `dist(i, j) <= range`, self-loops included.
pub fn range_adjacency(
    agents: &[AgentState],
    padding: &PaddingMask,
    boundary: Boundary,
    range: f64,
) -> TopologyUpdate {
    let n = padding.capacity();
    let active = padding.active_indices();
    let mut adjacency = empty_adjacency(n);

    for &i in &active {
        for &j in &active {
            let dist = boundary
                .displacement(&agents[i].position, &agents[j].position)
                .norm();
            adjacency[(i, j)] = dist <= range;
        }
    }

    let isolated = isolated_agents(&adjacency, padding);
    TopologyUpdate {
        adjacency,
        isolated,
    }
}

/// Active agents whose row holds exactly one edge (the self-loop).
pub fn isolated_agents(adjacency: &Adjacency, padding: &PaddingMask) -> Vec<bool> {
    (0..padding.capacity())
        .map(|i| {
            let degree = adjacency.row(i).iter().filter(|&&linked| linked).count();
            padding.is_active(i) && degree == 1
        })
        .collect()
}

/// Draws a fixed graph of the given kind over the active agents.
pub fn fixed_adjacency<R: Rng + ?Sized>(
    kind: FixedTopology,
    padding: &PaddingMask,
    rng: &mut R,
) -> Result<Adjacency> {
    match kind {
        FixedTopology::Line => Ok(chain_adjacency(padding, false, rng)),
        FixedTopology::Ring => Ok(chain_adjacency(padding, true, rng)),
        FixedTopology::Star => star_adjacency(padding, rng),
    }
}

fn chain_adjacency<R: Rng + ?Sized>(padding: &PaddingMask, ring: bool, rng: &mut R) -> Adjacency {
    let mut adjacency = empty_adjacency(padding.capacity());
    let mut order = padding.active_indices();
    order.shuffle(rng);

    for &slot in &order {
        adjacency[(slot, slot)] = true;
    }
    for pair in order.windows(2) {
        adjacency[(pair[0], pair[1])] = true;
        adjacency[(pair[1], pair[0])] = true;
    }
    if ring {
        if let (Some(&first), Some(&last)) = (order.first(), order.last()) {
            adjacency[(first, last)] = true;
            adjacency[(last, first)] = true;
        }
    }

    adjacency
}

fn star_adjacency<R: Rng + ?Sized>(padding: &PaddingMask, rng: &mut R) -> Result<Adjacency> {
    let active = padding.active_indices();
    if active.len() < 2 {
        return Err(FlockError::StarTooSmall {
            active: active.len(),
        });
    }

    let mut adjacency = empty_adjacency(padding.capacity());
    let hub = active[rng.gen_range(0..active.len())];

    for &slot in &active {
        adjacency[(slot, slot)] = true;
        adjacency[(hub, slot)] = true;
        adjacency[(slot, hub)] = true;
    }

    Ok(adjacency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agents_at(positions: &[(f64, f64)], capacity: usize) -> (Vec<AgentState>, PaddingMask) {
        let mut agents: Vec<AgentState> = positions
            .iter()
            .map(|&(x, y)| AgentState::new(Vector2::new(x, y), 0.0, 15.0))
            .collect();
        agents.resize(capacity, AgentState::padding());
        (agents, PaddingMask::prefix(positions.len(), capacity))
    }

    fn edge_count(adjacency: &Adjacency) -> usize {
        adjacency.iter().filter(|&&linked| linked).count()
    }

    fn is_symmetric(adjacency: &Adjacency) -> bool {
        adjacency == &adjacency.transpose()
    }

    #[test]
    fn test_unbounded_respects_padding() {
        let padding = PaddingMask::prefix(3, 5);
        let adjacency = unbounded_adjacency(&padding);

        assert_eq!(edge_count(&adjacency), 9);
        assert!(!adjacency[(0, 4)]);
        assert!(!adjacency[(4, 4)]);
    }

    #[test]
    fn test_range_adjacency() {
        let (agents, padding) = agents_at(&[(0.0, 0.0), (10.0, 0.0), (100.0, 0.0)], 4);
        let update = range_adjacency(&agents, &padding, Boundary::Open { size: 250.0 }, 20.0);

        assert!(update.adjacency[(0, 1)]);
        assert!(update.adjacency[(1, 0)]);
        assert!(!update.adjacency[(0, 2)]);
        assert!(update.adjacency[(2, 2)]);
        assert!(!update.adjacency[(3, 3)]);
        assert_eq!(update.isolated, vec![false, false, true, false]);
        assert!(is_symmetric(&update.adjacency));
    }

    #[test]
    fn test_range_zero_isolates_everyone() {
        let (agents, padding) = agents_at(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], 3);
        let update = range_adjacency(&agents, &padding, Boundary::Open { size: 250.0 }, 0.0);

        assert_eq!(update.isolated, vec![true, true, true]);
        assert_eq!(edge_count(&update.adjacency), 3);
    }

    #[test]
    fn test_range_uses_minimum_image() {
        let (agents, padding) = agents_at(&[(-48.0, 0.0), (48.0, 0.0)], 2);
        let update = range_adjacency(&agents, &padding, Boundary::Periodic { size: 100.0 }, 5.0);

        assert!(update.adjacency[(0, 1)]);
        assert!(!update.any_isolated());
    }

    #[test]
    fn test_line_topology() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let padding = PaddingMask::prefix(5, 7);
        let adjacency = fixed_adjacency(FixedTopology::Line, &padding, &mut rng).unwrap();

        // 5 self-loops + 4 undirected edges
        assert_eq!(edge_count(&adjacency), 5 + 8);
        assert!(is_symmetric(&adjacency));

        let degrees: Vec<usize> = (0..5)
            .map(|i| adjacency.row(i).iter().filter(|&&l| l).count() - 1)
            .collect();
        assert_eq!(degrees.iter().filter(|&&d| d == 1).count(), 2);
        assert_eq!(degrees.iter().filter(|&&d| d == 2).count(), 3);
    }

    #[test]
    fn test_ring_topology() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let padding = PaddingMask::prefix(5, 5);
        let adjacency = fixed_adjacency(FixedTopology::Ring, &padding, &mut rng).unwrap();

        assert_eq!(edge_count(&adjacency), 5 + 10);
        for i in 0..5 {
            assert_eq!(adjacency.row(i).iter().filter(|&&l| l).count(), 3);
        }
    }

    #[test]
    fn test_star_topology() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let padding = PaddingMask::prefix(6, 8);
        let adjacency = fixed_adjacency(FixedTopology::Star, &padding, &mut rng).unwrap();

        let degrees: Vec<usize> = (0..8)
            .map(|i| adjacency.row(i).iter().filter(|&&l| l).count())
            .collect();
        assert_eq!(degrees.iter().filter(|&&d| d == 6).count(), 1);
        assert_eq!(degrees.iter().filter(|&&d| d == 2).count(), 5);
        assert_eq!(degrees[6], 0);
        assert_eq!(degrees[7], 0);
        assert!(is_symmetric(&adjacency));
    }

    #[test]
    fn test_star_requires_two_agents() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let padding = PaddingMask::prefix(1, 3);

        let err = fixed_adjacency(FixedTopology::Star, &padding, &mut rng).unwrap_err();
        assert_eq!(err, FlockError::StarTooSmall { active: 1 });
    }

    #[test]
    fn test_fixed_topology_cached_until_reinitialized() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (agents, padding) = agents_at(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)], 4);
        let mut engine = TopologyEngine::new(
            CommMode::Fixed(FixedTopology::Line),
            Boundary::Open { size: 250.0 },
        );

        let first = engine.initialize(&agents, &padding, &mut rng).unwrap();
        for _ in 0..5 {
            let next = engine.update(&agents, &padding, &mut rng).unwrap();
            assert_eq!(next.adjacency, first.adjacency);
        }
        assert_eq!(engine.fixed_cache(), Some(&first.adjacency));
    }
}
