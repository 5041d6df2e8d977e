//! Reinforcement learning environments
mod grid_world;

pub use grid_world::{BuildEnvError, GridWorld, GridWorldConfig};

/// A permutation of indices. Index `i` maps to `perm[i]`.
pub type Permutation = Vec<usize>;

/// Observation-space and action-space permutations of an environment.
///
/// The `i`-th observation permutation pairs with the `i`-th action permutation.
pub type Twists = (Vec<Permutation>, Vec<Permutation>);

/// A reinforcement learning environment with internal state.
///
/// Environments are built from keyword arguments by a registered factory
/// and then owned by the algorithm they are assembled into.
pub trait Environment {
    /// Reset to an initial state.
    fn reset(&mut self);

    /// Take an action in the current state.
    ///
    /// Must not be called once [`Environment::is_final`] is true.
    fn step(&mut self, action: usize);

    /// Whether the current state ends the episode.
    fn is_final(&self) -> bool;

    /// Reward of the most recent transition.
    fn reward(&self) -> f32;

    /// For each action, whether it is legal in the current state.
    fn masks(&self) -> Vec<bool> {
        vec![true; self.num_actions()]
    }

    /// Raw internal state.
    fn state(&self) -> Vec<i64>;

    /// Observation features of the current state. Has `obs_shape().product()` elements.
    fn observe(&self) -> Vec<f32>;

    /// Shape of the observation features.
    fn obs_shape(&self) -> Vec<usize>;

    /// Number of discrete actions.
    fn num_actions(&self) -> usize;

    /// Symmetries of the environment.
    ///
    /// Only known once the environment has been constructed since they
    /// may depend on its arguments.
    fn twists(&self) -> Twists {
        (Vec::new(), Vec::new())
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn reset(&mut self) {
        E::reset(self)
    }
    fn step(&mut self, action: usize) {
        E::step(self, action)
    }
    fn is_final(&self) -> bool {
        E::is_final(self)
    }
    fn reward(&self) -> f32 {
        E::reward(self)
    }
    fn masks(&self) -> Vec<bool> {
        E::masks(self)
    }
    fn state(&self) -> Vec<i64> {
        E::state(self)
    }
    fn observe(&self) -> Vec<f32> {
        E::observe(self)
    }
    fn obs_shape(&self) -> Vec<usize> {
        E::obs_shape(self)
    }
    fn num_actions(&self) -> usize {
        E::num_actions(self)
    }
    fn twists(&self) -> Twists {
        E::twists(self)
    }
}

/// Apply a permutation to a slice: `out[perm[i]] = values[i]`.
///
/// Returns `None` if `perm` is not a permutation of `0..values.len()`.
pub fn permute<T: Clone>(values: &[T], perm: &[usize]) -> Option<Vec<T>> {
    if values.len() != perm.len() {
        return None;
    }
    let mut out: Vec<Option<T>> = vec![None; values.len()];
    for (value, &target) in values.iter().zip(perm) {
        let slot = out.get_mut(target)?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(value.clone());
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permute_moves_values() {
        assert_eq!(permute(&['a', 'b', 'c'], &[2, 0, 1]), Some(vec!['b', 'c', 'a']));
    }

    #[test]
    fn permute_identity() {
        assert_eq!(permute(&[1, 2, 3], &[0, 1, 2]), Some(vec![1, 2, 3]));
    }

    #[test]
    fn permute_rejects_non_permutation() {
        assert_eq!(permute(&[1, 2], &[0, 0]), None);
        assert_eq!(permute(&[1, 2], &[0, 2]), None);
        assert_eq!(permute(&[1, 2], &[0]), None);
    }
}
