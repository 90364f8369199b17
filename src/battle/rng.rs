//! Per-battle seeded random streams
//!
//! One seed, three independent ChaCha streams. Combat rolls, formation
//! placement and cosmetic effects each draw from their own stream, so how
//! many particles a frame spawns can never shift a combat roll.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const COMBAT_STREAM: u64 = 0;
const PLACEMENT_STREAM: u64 = 1;
const COSMETIC_STREAM: u64 = 2;

#[derive(Debug, Clone)]
pub struct BattleRng {
    seed: u64,
    combat: ChaCha8Rng,
    placement: ChaCha8Rng,
    cosmetic: ChaCha8Rng,
}

impl BattleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            combat: stream(seed, COMBAT_STREAM),
            placement: stream(seed, PLACEMENT_STREAM),
            cosmetic: stream(seed, COSMETIC_STREAM),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Evasion, damage, crit and return-fire rolls
    pub fn combat(&mut self) -> &mut ChaCha8Rng {
        &mut self.combat
    }

    /// Scattered formation offsets
    pub fn placement(&mut self) -> &mut ChaCha8Rng {
        &mut self.placement
    }

    /// Particle jitter and weather; never feeds back into simulation
    pub fn cosmetic(&mut self) -> &mut ChaCha8Rng {
        &mut self.cosmetic
    }
}

fn stream(seed: u64, id: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(id);
    rng
}
