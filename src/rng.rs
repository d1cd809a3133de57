use rand::{rngs::StdRng, Rng, SeedableRng};

/// The one random source of a generation run. Every stage borrows it mutably;
/// nothing holds a generator of its own.
pub struct LevelRng(pub StdRng);

impl LevelRng {
    pub fn seeded(seed: u64) -> Self {
        LevelRng(StdRng::seed_from_u64(seed))
    }

    /// A configured seed of 0 means "pick one". Returns the seed actually used so
    /// the run can be reproduced.
    pub fn from_config_seed(seed: u64) -> (Self, u64) {
        let resolved = if seed == 0 {
            let mut entropy = StdRng::from_entropy();
            // 0 is reserved for "random"
            entropy.gen_range(1..u64::MAX)
        } else {
            seed
        };
        (LevelRng::seeded(resolved), resolved)
    }

    pub fn roll_chance(&mut self, chance: f32) -> bool {
        self.0.gen::<f32>() < chance
    }
}

pub struct RandomEntry<T> {
    value: T,
    weight: i32,
}

/// Weighted table, rolled against the run generator.
pub struct RandomTable<T> {
    entries: Vec<RandomEntry<T>>,
    total_weight: i32,
}

impl<T: Clone> RandomTable<T> {
    pub fn new() -> Self {
        RandomTable {
            entries: Vec::new(),
            total_weight: 0,
        }
    }

    pub fn add(mut self, value: T, weight: i32) -> Self {
        if weight > 0 {
            self.total_weight += weight;
            self.entries.push(RandomEntry { value, weight });
        }
        self
    }

    pub fn roll(&self, rng: &mut LevelRng) -> Option<T> {
        if self.total_weight == 0 {
            return None;
        }

        let mut roll = rng.0.gen_range(1..=self.total_weight);
        for entry in &self.entries {
            if roll <= entry.weight {
                return Some(entry.value.clone());
            }
            roll -= entry.weight;
        }

        None
    }
}

impl<T: Clone> Default for RandomTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
