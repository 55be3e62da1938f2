use serde::{Deserialize, Serialize};

/// Everything a single step of an [`Environment`] reports back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome<S, R, I> {
    pub observation: S,
    pub reward: R,
    pub terminated: bool,
    /// Set when the episode was cut short by something other than its own rules.
    pub truncated: bool,
    pub info: I,
}

pub trait Environment
where
    Self::State: Clone + Into<Vec<f32>>,
    Self::Action: Clone,
{
    type State;
    type Action;
    type Reward;
    type Info;
    type Error;

    /// Starts a new episode, reseeding the environment's randomness if `seed` is given.
    ///
    /// # Errors
    ///
    /// If the environment cannot start an episode.
    fn reset(&mut self, seed: Option<u64>) -> Result<(Self::State, Self::Info), Self::Error>;

    /// # Errors
    ///
    /// If `action` cannot be applied in the current state.
    #[allow(clippy::type_complexity)]
    fn step(
        &mut self,
        action: &Self::Action,
    ) -> Result<StepOutcome<Self::State, Self::Reward, Self::Info>, Self::Error>;

    fn get_action_mask(&self) -> Vec<bool>;

    fn all_actions() -> Vec<Self::Action>;
    fn action_to_index(action: &Self::Action) -> usize;
}
