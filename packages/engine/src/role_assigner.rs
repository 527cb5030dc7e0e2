use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{GameConfig, Role};

#[derive(Debug, Clone)]
pub struct RoleAssigner {
    spy_ratio: f64,
    double_agent_enabled: bool,
    double_agent_probability: f64,
}

impl RoleAssigner {
    pub fn new(spy_ratio: f64, double_agent_enabled: bool, double_agent_probability: f64) -> Self {
        Self {
            spy_ratio: spy_ratio.clamp(0.0, 1.0),
            double_agent_enabled,
            double_agent_probability: double_agent_probability.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.spy_ratio,
            config.double_agent_enabled,
            config.double_agent_probability,
        )
    }

    pub fn spy_count(&self, player_count: usize) -> usize {
        ((player_count as f64 * self.spy_ratio).floor() as usize).max(1)
    }

    /// Deals `player_count` roles in random order.
    ///
    /// At least one spy is always dealt. With the double agent enabled, one
    /// loyal slot may be turned into the double agent before shuffling.
    pub fn assign<R: Rng + ?Sized>(&self, player_count: usize, rng: &mut R) -> Vec<Role> {
        let mut roles = vec![Role::Loyal; player_count];

        let spies = self.spy_count(player_count).min(player_count);
        roles.iter_mut().take(spies).for_each(|r| *r = Role::Spy);

        if self.double_agent_enabled && rng.gen_bool(self.double_agent_probability) {
            let loyal_slots: Vec<usize> = roles
                .iter()
                .enumerate()
                .filter(|(_, r)| **r == Role::Loyal)
                .map(|(i, _)| i)
                .collect();
            if let Some(&slot) = loyal_slots.choose(rng) {
                roles[slot] = Role::Double;
            }
        }

        roles.shuffle(rng);
        roles
    }
}
