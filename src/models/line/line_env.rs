//! Environment that builds a transit line on a city grid, one station per step.
use std::collections::HashSet;

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::line_action::{ActionMask, LineAction};
use super::line_config::LineEnvConfig;
use super::line_reward::{group_rewards, RewardSpace};
use crate::models::city::city_model::{DemandModel, Location, Segment};
use crate::rl::environment::{Environment, StepOutcome};

type Result<T> = std::result::Result<T, LineEnvError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineEnvError {
    #[error("demand model grid has no cells")]
    EmptyGrid,
    #[error("demand model defines no group OD matrices")]
    MissingGroupDemand,
    #[error("group {group} OD space covers {got} cells but {expected} are expected")]
    DemandSizeMismatch {
        group: usize,
        expected: usize,
        got: usize,
    },
    #[error("station budget must be at least 1")]
    InvalidStationBudget,
    #[error("action {0} is not one of the 8 directions")]
    InvalidAction(usize),
    #[error("start location {0} is outside the grid")]
    StartOutOfBounds(Location),
    #[error("moving {action:?} from {from} leaves the grid")]
    OutOfBounds { from: Location, action: LineAction },
    #[error("moving {action:?} from {from} is masked out")]
    IllegalAction { from: Location, action: LineAction },
    #[error("step called before reset")]
    NotReset,
}

/// Where the growing end of the line is, in three encodings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location: Location,
    pub location_index: usize,
    /// One entry per grid cell, 1 at `location_index`.
    pub location_onehot: Vec<f32>,
}

impl From<Observation> for Vec<f32> {
    fn from(observation: Observation) -> Self {
        observation.location_onehot
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Every built segment, each move logged in both directions.
    pub segments: Vec<Segment>,
    pub action_mask: [u8; 8],
}

pub type LineStep = StepOutcome<Observation, Vec<f32>, StepInfo>;

#[derive(Clone, Debug)]
struct EpisodeState {
    agent_location: Location,
    agent_location_index: usize,
    agent_location_onehot: Vec<f32>,
    stations_placed: usize,
    covered_cells_vid: Vec<usize>,
    covered_cells_gid: Vec<Location>,
    covered_cell_set: HashSet<usize>,
    covered_segments: Vec<Segment>,
    // always the set of entries in covered_segments
    covered_segment_set: HashSet<Segment>,
    action_mask: ActionMask,
}

impl EpisodeState {
    fn new(start: Location, start_index: usize, grid_size: usize) -> Self {
        let mut state = Self {
            agent_location: start,
            agent_location_index: start_index,
            agent_location_onehot: vec![0.0; grid_size],
            stations_placed: 1,
            covered_cells_vid: vec![start_index],
            covered_cells_gid: vec![start],
            covered_cell_set: HashSet::from([start_index]),
            covered_segments: Vec::new(),
            covered_segment_set: HashSet::new(),
            action_mask: ActionMask::default(),
        };
        state.agent_location_onehot[start_index] = 1.0;
        state
    }

    fn move_agent(&mut self, location: Location, index: usize) {
        self.agent_location_onehot[self.agent_location_index] = 0.0;
        self.agent_location = location;
        self.agent_location_index = index;
        self.agent_location_onehot[index] = 1.0;
    }

    fn observation(&self) -> Observation {
        Observation {
            location: self.agent_location,
            location_index: self.agent_location_index,
            location_onehot: self.agent_location_onehot.clone(),
        }
    }

    fn info(&self) -> StepInfo {
        StepInfo {
            segments: self.covered_segments.clone(),
            action_mask: self.action_mask.as_ints(),
        }
    }
}

/// Line-building environment over a [`DemandModel`].
///
/// Each episode starts with one station on the start cell. Every step moves
/// the end of the line to a neighbouring cell, places a station there and
/// rewards each population group with the share of its demand the new
/// segment serves. The episode terminates when the station budget is spent
/// or no legal move is left.
pub struct LineEnv<M: DemandModel> {
    city: M,
    config: LineEnvConfig,
    rng: StdRng,
    state: Option<EpisodeState>,
}

impl<M: DemandModel> LineEnv<M> {
    /// Wires the environment to `city`.
    ///
    /// # Errors
    ///
    /// [`LineEnvError::EmptyGrid`] if `city` has no cells,
    /// [`LineEnvError::MissingGroupDemand`] if it has no group OD matrices,
    /// [`LineEnvError::DemandSizeMismatch`] if a group matrix does not cover
    /// exactly the grid's cells,
    /// [`LineEnvError::InvalidStationBudget`] if the budget is 0.
    pub fn new(city: M, config: LineEnvConfig) -> Result<Self> {
        config.validate()?;
        if city.grid_size() == 0 {
            return Err(LineEnvError::EmptyGrid);
        }
        if city.group_od_matrices().is_empty() {
            return Err(LineEnvError::MissingGroupDemand);
        }
        for (group, g_od) in city.group_od_matrices().iter().enumerate() {
            if g_od.size() != city.grid_size() {
                return Err(LineEnvError::DemandSizeMismatch {
                    group,
                    expected: city.grid_size(),
                    got: g_od.size(),
                });
            }
            if g_od.total() <= 0.0 {
                warn!("Group {group} has no demand, its reward will always be 0");
            }
        }
        Ok(Self {
            city,
            config,
            rng: StdRng::from_entropy(),
            state: None,
        })
    }

    /// Starts a new episode.
    ///
    /// `seed` reseeds the generator used to draw a random start; it has no
    /// effect when `start` is given.
    ///
    /// # Errors
    ///
    /// [`LineEnvError::StartOutOfBounds`] if `start` is not on the grid.
    pub fn reset(
        &mut self,
        seed: Option<u64>,
        start: Option<Location>,
    ) -> Result<(Observation, StepInfo)> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let start = match start {
            Some(location) => location,
            None => {
                let row = self.rng.gen_range(0..self.city.grid_row_count());
                let col = self.rng.gen_range(0..self.city.grid_col_count());
                Location::new(
                    i64::try_from(row).unwrap_or(i64::MAX),
                    i64::try_from(col).unwrap_or(i64::MAX),
                )
            }
        };
        let start_index = self
            .city
            .location_to_index(start)
            .ok_or(LineEnvError::StartOutOfBounds(start))?;

        let mut state = EpisodeState::new(start, start_index, self.city.grid_size());
        state.action_mask = ActionMask::compute(&self.city, start, &state.covered_cell_set);
        debug!(
            "Reset line at {} with legal moves {:?}",
            start,
            state.action_mask.legal_actions()
        );

        let result = (state.observation(), state.info());
        self.state = Some(state);
        Ok(result)
    }

    /// Starts a new episode at `start`, given as a [`Location`] or `(row, col)`.
    ///
    /// # Errors
    ///
    /// Same as [`LineEnv::reset`].
    pub fn reset_at(
        &mut self,
        seed: Option<u64>,
        start: impl Into<Location>,
    ) -> Result<(Observation, StepInfo)> {
        self.reset(seed, Some(start.into()))
    }

    /// Extends the line by one station in direction `action` (0..8).
    ///
    /// # Errors
    ///
    /// Fails without touching the episode if `action` is not a direction,
    /// the move leaves the grid, the episode was never reset, strict mode
    /// is on and the move is masked out, or the model's satisfied-OD mask
    /// does not match its group matrices.
    pub fn step(&mut self, action: usize) -> Result<LineStep> {
        let action = LineAction::try_from(action)?;
        self.step_action(action)
    }

    /// [`LineEnv::step`] with a typed action.
    ///
    /// # Errors
    ///
    /// Same as [`LineEnv::step`].
    pub fn step_action(&mut self, action: LineAction) -> Result<LineStep> {
        let state = self.state.as_mut().ok_or(LineEnvError::NotReset)?;
        let from = state.agent_location;
        let new_location = from.offset(action.value());
        let Some(to_idx) = self.city.location_to_index(new_location) else {
            warn!("Rejected {action:?} from {from}: leaves the grid");
            return Err(LineEnvError::OutOfBounds { from, action });
        };
        if self.config.strict_actions && !state.action_mask.is_legal(action) {
            warn!("Rejected {action:?} from {from}: masked out");
            return Err(LineEnvError::IllegalAction { from, action });
        }

        let from_idx = state.agent_location_index;
        let reward = group_rewards(&self.city, [from_idx, to_idx], &state.covered_segment_set)?;
        state.stations_placed += 1;

        state.covered_segments.push([from_idx, to_idx]);
        state.covered_segments.push([to_idx, from_idx]);
        state.covered_segment_set.insert([from_idx, to_idx]);
        state.covered_segment_set.insert([to_idx, from_idx]);
        state.covered_cells_vid.push(to_idx);
        state.covered_cells_gid.push(new_location);
        state.covered_cell_set.insert(to_idx);

        state.move_agent(new_location, to_idx);
        state.action_mask = ActionMask::compute(&self.city, new_location, &state.covered_cell_set);

        let terminated =
            state.stations_placed >= self.config.nr_stations || state.action_mask.is_stranded();
        debug!(
            "Station {} placed at {} via {:?}, reward {:?}",
            state.stations_placed, new_location, action, reward
        );
        if terminated {
            info!(
                "Line finished with {} stations ({})",
                state.stations_placed,
                if state.action_mask.is_stranded() {
                    "no legal moves left"
                } else {
                    "station budget spent"
                }
            );
        }

        Ok(StepOutcome {
            observation: state.observation(),
            reward,
            terminated,
            truncated: false,
            info: state.info(),
        })
    }

    #[must_use]
    pub fn city(&self) -> &M {
        &self.city
    }

    #[must_use]
    pub fn config(&self) -> &LineEnvConfig {
        &self.config
    }

    #[must_use]
    pub fn nr_stations(&self) -> usize {
        self.config.nr_stations
    }

    #[must_use]
    pub fn nr_groups(&self) -> usize {
        self.city.nr_groups()
    }

    /// Number of discrete states, one per grid cell.
    #[must_use]
    pub fn observation_size(&self) -> usize {
        self.city.grid_size()
    }

    #[must_use]
    pub fn reward_space(&self) -> RewardSpace {
        RewardSpace::unit(self.nr_groups())
    }

    /// Stations placed this episode, 0 before the first reset.
    #[must_use]
    pub fn stations_placed(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.stations_placed)
    }

    #[must_use]
    pub fn agent_location(&self) -> Option<Location> {
        self.state.as_ref().map(|s| s.agent_location)
    }

    /// Visited cells as linear indices, in visiting order.
    #[must_use]
    pub fn covered_cells(&self) -> &[usize] {
        match &self.state {
            Some(s) => &s.covered_cells_vid,
            None => &[],
        }
    }

    /// Visited cells as grid coordinates, in visiting order.
    #[must_use]
    pub fn covered_locations(&self) -> &[Location] {
        match &self.state {
            Some(s) => &s.covered_cells_gid,
            None => &[],
        }
    }

    #[must_use]
    pub fn covered_segments(&self) -> &[Segment] {
        match &self.state {
            Some(s) => &s.covered_segments,
            None => &[],
        }
    }

    /// Current mask; nothing is legal before the first reset.
    #[must_use]
    pub fn action_mask(&self) -> ActionMask {
        self.state
            .as_ref()
            .map_or_else(ActionMask::default, |s| s.action_mask)
    }
}

impl<M: DemandModel> Environment for LineEnv<M> {
    type State = Observation;
    type Action = LineAction;
    type Reward = Vec<f32>;
    type Info = StepInfo;
    type Error = LineEnvError;

    fn reset(&mut self, seed: Option<u64>) -> Result<(Self::State, Self::Info)> {
        LineEnv::reset(self, seed, None)
    }

    fn step(&mut self, action: &Self::Action) -> Result<LineStep> {
        self.step_action(*action)
    }

    fn get_action_mask(&self) -> Vec<bool> {
        self.action_mask().as_bools().to_vec()
    }

    fn all_actions() -> Vec<Self::Action> {
        LineAction::VARIANTS.to_vec()
    }

    fn action_to_index(action: &Self::Action) -> usize {
        action.index()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::seq::SliceRandom;

    use super::*;
    use crate::models::city::{
        city_grid::City,
        od_matrix::{OdMask, OdMatrix},
    };

    /// Model with no size validation of its own.
    struct RawDemand {
        rows: usize,
        cols: usize,
        groups: Vec<OdMatrix>,
        mask_size: usize,
    }

    impl DemandModel for RawDemand {
        fn grid_row_count(&self) -> usize {
            self.rows
        }

        fn grid_col_count(&self) -> usize {
            self.cols
        }

        fn satisfied_od_mask(&self, [from, to]: Segment) -> OdMask {
            let mut mask = OdMask::empty(self.mask_size);
            if from < self.mask_size && to < self.mask_size {
                mask.select(from, to);
            }
            mask
        }

        fn group_od_matrices(&self) -> &[OdMatrix] {
            &self.groups
        }
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// 3x3 city, one group, total demand 10.
    fn scenario_city() -> City {
        let mut od = OdMatrix::zeros(9);
        od.set(0, 1, 3.0);
        od.set(1, 0, 1.0);
        od.set(1, 2, 2.0);
        od.set(2, 5, 4.0);
        City::new(3, 3, vec![od]).unwrap()
    }

    fn uniform_city(rows: usize, cols: usize, nr_groups: usize) -> City {
        let size = rows * cols;
        let mut groups = Vec::with_capacity(nr_groups);
        for g in 0..nr_groups {
            let mut od = OdMatrix::zeros(size);
            for o in 0..size {
                for d in 0..size {
                    if o != d && (o + d + g) % 2 == 0 {
                        od.set(o, d, 1.0);
                    }
                }
            }
            groups.push(od);
        }
        City::new(rows, cols, groups).unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "Expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn test_new_requires_group_demand() {
        let city = City::new(2, 2, vec![]).unwrap();
        assert_eq!(
            LineEnv::new(city, LineEnvConfig::default()).err(),
            Some(LineEnvError::MissingGroupDemand)
        );
        assert_eq!(
            LineEnv::new(scenario_city(), LineEnvConfig::new(0)).err(),
            Some(LineEnvError::InvalidStationBudget)
        );
    }

    #[test]
    fn test_new_rejects_wrong_sized_demand() {
        let mut od = OdMatrix::zeros(4);
        od.set(0, 1, 5.0);
        let model = RawDemand {
            rows: 3,
            cols: 3,
            groups: vec![OdMatrix::zeros(9), od],
            mask_size: 9,
        };
        assert_eq!(
            LineEnv::new(model, LineEnvConfig::default()).err(),
            Some(LineEnvError::DemandSizeMismatch {
                group: 1,
                expected: 9,
                got: 4
            })
        );
    }

    #[test]
    fn test_step_rejects_wrong_sized_mask() {
        let mut od = OdMatrix::zeros(9);
        od.set(0, 1, 5.0);
        let model = RawDemand {
            rows: 3,
            cols: 3,
            groups: vec![od.clone()],
            mask_size: 4,
        };
        let mut env = LineEnv::new(model, LineEnvConfig::default()).unwrap();
        env.reset_at(None, (0, 0)).unwrap();
        assert_eq!(
            env.step(LineAction::Right.index()).unwrap_err(),
            LineEnvError::DemandSizeMismatch {
                group: 0,
                expected: 9,
                got: 4
            }
        );
        assert_eq!(env.stations_placed(), 1);
        assert!(env.covered_segments().is_empty());
        assert_eq!(env.agent_location(), Some(Location::new(0, 0)));

        let model = RawDemand {
            rows: 3,
            cols: 3,
            groups: vec![od],
            mask_size: 9,
        };
        let mut env = LineEnv::new(model, LineEnvConfig::default()).unwrap();
        env.reset_at(None, (0, 0)).unwrap();
        let step = env.step(LineAction::Right.index()).unwrap();
        assert_close(&step.reward, &[1.0]);
    }

    #[test]
    fn test_reset_at_corner() {
        init_logger();
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::new(5)).unwrap();
        let (obs, info) = env.reset_at(None, (0, 0)).unwrap();

        assert_eq!(obs.location, Location::new(0, 0));
        assert_eq!(obs.location_index, 0);
        assert_eq!(obs.location_onehot.len(), 9);
        assert!((obs.location_onehot.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((obs.location_onehot[0] - 1.0).abs() < 1e-6);
        assert!(info.segments.is_empty());
        assert_eq!(info.action_mask, [0, 0, 1, 1, 1, 0, 0, 0]);
        assert_eq!(env.stations_placed(), 1);
        assert_eq!(env.covered_cells(), &[0]);
        assert_eq!(env.covered_locations(), &[Location::new(0, 0)]);
    }

    #[test]
    fn test_reset_accepts_location_or_pair() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::default()).unwrap();
        let (from_pair, _) = env.reset_at(None, (2, 1)).unwrap();
        let (from_location, _) = env.reset(None, Some(Location::new(2, 1))).unwrap();
        assert_eq!(from_pair, from_location);
        assert_eq!(from_pair.location_index, 7);
    }

    #[test]
    fn test_reset_rejects_off_grid_start() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::default()).unwrap();
        assert_eq!(
            env.reset_at(None, (3, 0)).unwrap_err(),
            LineEnvError::StartOutOfBounds(Location::new(3, 0))
        );
        assert_eq!(env.stations_placed(), 0);
    }

    #[test]
    fn test_seeded_reset_is_reproducible() {
        let city = Arc::new(uniform_city(7, 5, 1));
        let mut a = LineEnv::new(Arc::clone(&city), LineEnvConfig::default()).unwrap();
        let mut b = LineEnv::new(Arc::clone(&city), LineEnvConfig::default()).unwrap();
        for seed in 0..20 {
            let (obs_a, _) = a.reset(Some(seed), None).unwrap();
            let (obs_b, _) = b.reset(Some(seed), None).unwrap();
            assert_eq!(obs_a, obs_b);
            assert!(city.location_to_index(obs_a.location).is_some());
            assert_eq!(a.city().grid_size(), b.city().grid_size());
        }
    }

    #[test]
    fn test_mask_after_reset_has_legal_move() {
        for (rows, cols) in [(1, 2), (2, 1), (3, 3), (1, 5), (4, 2)] {
            let city = uniform_city(rows, cols, 1);
            let mut env = LineEnv::new(&city, LineEnvConfig::default()).unwrap();
            for index in 0..city.grid_size() {
                let start = city.index_to_location(index).unwrap();
                let (_, info) = env.reset(None, Some(start)).unwrap();
                assert!(info.action_mask.contains(&1), "{rows}x{cols} at {start}");
            }
        }

        let city = uniform_city(1, 1, 1);
        let mut env = LineEnv::new(&city, LineEnvConfig::default()).unwrap();
        let (_, info) = env.reset_at(None, (0, 0)).unwrap();
        assert_eq!(info.action_mask, [0; 8]);
    }

    #[test]
    fn test_scenario_rewards() {
        init_logger();
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::new(10)).unwrap();
        env.reset_at(None, (0, 0)).unwrap();

        let step = env.step(LineAction::Right.index()).unwrap();
        assert_close(&step.reward, &[0.4]);
        assert_eq!(step.observation.location, Location::new(0, 1));
        assert_eq!(step.info.segments, vec![[0, 1], [1, 0]]);
        assert!(!step.terminated);
        assert!(!step.truncated);

        let step = env.step(LineAction::Right.index()).unwrap();
        assert_close(&step.reward, &[0.2]);
        let step = env.step(LineAction::Down.index()).unwrap();
        assert_close(&step.reward, &[0.4]);
        let step = env.step(LineAction::Down.index()).unwrap();
        assert_close(&step.reward, &[0.0]);
    }

    #[test]
    fn test_retraversed_segment_earns_nothing() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::new(10)).unwrap();
        env.reset_at(None, (0, 0)).unwrap();

        let step = env.step(LineAction::Right.index()).unwrap();
        assert_close(&step.reward, &[0.4]);

        // masked out, but the mask is advisory by default
        assert!(!env.action_mask().is_legal(LineAction::Left));
        let step = env.step(LineAction::Left.index()).unwrap();
        assert_close(&step.reward, &[0.0]);
        assert_eq!(step.observation.location, Location::new(0, 0));
        assert_eq!(env.covered_cells(), &[0, 1, 0]);
        assert_eq!(env.stations_placed(), 3);
        assert_eq!(step.info.segments, vec![[0, 1], [1, 0], [1, 0], [0, 1]]);
    }

    #[test]
    fn test_strict_mode_rejects_masked_action() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::new(10).strict()).unwrap();
        assert!(env.config().strict_actions);
        env.reset_at(None, (0, 0)).unwrap();
        env.step(LineAction::Right.index()).unwrap();

        assert_eq!(
            env.step(LineAction::Left.index()).unwrap_err(),
            LineEnvError::IllegalAction {
                from: Location::new(0, 1),
                action: LineAction::Left
            }
        );
        assert_eq!(env.stations_placed(), 2);
        assert_eq!(env.covered_segments().len(), 2);
        assert_eq!(env.agent_location(), Some(Location::new(0, 1)));

        assert!(env.step(LineAction::Down.index()).is_ok());
    }

    #[test]
    fn test_off_grid_and_invalid_actions_are_rejected() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::default()).unwrap();
        assert_eq!(env.step(2).unwrap_err(), LineEnvError::NotReset);

        env.reset_at(None, (0, 0)).unwrap();
        assert_eq!(
            env.step(LineAction::Up.index()).unwrap_err(),
            LineEnvError::OutOfBounds {
                from: Location::new(0, 0),
                action: LineAction::Up
            }
        );
        assert_eq!(env.step(8).unwrap_err(), LineEnvError::InvalidAction(8));
        assert_eq!(env.stations_placed(), 1);
        assert!(env.covered_segments().is_empty());
    }

    #[test]
    fn test_terminates_on_station_budget() {
        let mut env = LineEnv::new(uniform_city(5, 5, 1), LineEnvConfig::new(3)).unwrap();
        env.reset_at(None, (2, 2)).unwrap();
        let step = env.step(LineAction::Up.index()).unwrap();
        assert!(!step.terminated);
        let step = env.step(LineAction::Up.index()).unwrap();
        assert!(step.terminated);
        assert!(!step.truncated);
        assert!(!env.action_mask().is_stranded());
        assert_eq!(env.stations_placed(), env.nr_stations());
    }

    #[test]
    fn test_terminates_when_stranded() {
        // corridor: the far end is boxed in by the edge and the cells already covered
        let mut env = LineEnv::new(uniform_city(1, 3, 1), LineEnvConfig::new(100)).unwrap();
        env.reset_at(None, (0, 0)).unwrap();
        let step = env.step(LineAction::Right.index()).unwrap();
        assert!(!step.terminated);
        assert_eq!(step.info.action_mask, [0, 0, 1, 0, 0, 0, 0, 0]);

        let step = env.step(LineAction::Right.index()).unwrap();
        assert!(step.terminated);
        assert_eq!(step.info.action_mask, [0; 8]);
        assert!(env.stations_placed() < env.nr_stations());
    }

    #[test]
    fn test_random_masked_episodes() {
        init_logger();
        let city = uniform_city(6, 6, 3);
        let mut env = LineEnv::new(&city, LineEnvConfig::new(20)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let space = env.reward_space();

        for seed in 0..25 {
            env.reset(Some(seed), None).unwrap();
            let mut totals = vec![0.0_f32; env.nr_groups()];
            let mut steps = 0;
            loop {
                let legal = env.action_mask().legal_actions();
                let action = *legal.choose(&mut rng).unwrap();
                let segments_before = env.covered_segments().len();
                let step = env.step_action(action).unwrap();
                steps += 1;

                assert_eq!(env.stations_placed(), steps + 1);
                assert_eq!(step.info.segments.len(), segments_before + 2);
                assert!(space.contains(&step.reward));
                for (t, r) in totals.iter_mut().zip(&step.reward) {
                    *t += r;
                }
                assert!((step.observation.location_onehot.iter().sum::<f32>() - 1.0).abs() < 1e-6);
                assert_eq!(
                    step.terminated,
                    env.stations_placed() >= env.nr_stations() || env.action_mask().is_stranded()
                );
                if step.terminated {
                    break;
                }
            }
            assert!(totals.iter().all(|t| *t <= 1.0 + 1e-4), "{totals:?}");
            let distinct: HashSet<usize> = env.covered_cells().iter().copied().collect();
            assert_eq!(distinct.len(), env.covered_cells().len());
        }
    }

    #[test]
    fn test_environment_trait() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::default()).unwrap();
        assert!(env.get_action_mask().iter().all(|legal| !legal));

        let (obs, _) = Environment::reset(&mut env, Some(3)).unwrap();
        let flat: Vec<f32> = obs.clone().into();
        assert_eq!(flat.len(), env.observation_size());
        assert!((flat[obs.location_index] - 1.0).abs() < 1e-6);

        let actions = LineEnv::<City>::all_actions();
        assert_eq!(actions.len(), 8);
        for (i, a) in actions.iter().enumerate() {
            assert_eq!(LineEnv::<City>::action_to_index(a), i);
        }

        let mask = env.get_action_mask();
        let index = mask.iter().position(|legal| *legal).unwrap();
        let step = Environment::step(&mut env, &actions[index]).unwrap();
        assert_eq!(step.reward.len(), 1);
    }

    #[test]
    fn test_step_payload_serializes() {
        let mut env = LineEnv::new(scenario_city(), LineEnvConfig::default()).unwrap();
        env.reset_at(None, (0, 0)).unwrap();
        let step = env.step(LineAction::Right.index()).unwrap();

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["info"]["segments"], serde_json::json!([[0, 1], [1, 0]]));
        assert_eq!(json["info"]["action_mask"], serde_json::json!([0, 0, 1, 1, 1, 1, 0, 0]));
        assert_eq!(json["observation"]["location"], serde_json::json!({"row": 0, "col": 1}));
        assert_eq!(json["terminated"], serde_json::json!(false));
    }
}
