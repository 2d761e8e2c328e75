//! "Surprise me" prompts for the setup screen.

use crate::game::ids::IdMinter;

pub const SURPRISE_PROMPTS: &[&str] = &[
    "If aliens landed tomorrow…",
    "I woke up and chose…",
    "In a parallel universe…",
    "The pigeons formed a union because…",
    "If I had 24 hours with $1M…",
    "The worst superpower is…",
    "My villain origin story…",
];

/// A random prompt from [`SURPRISE_PROMPTS`].
pub fn surprise(rng: &mut IdMinter) -> &'static str {
    rng.pick(SURPRISE_PROMPTS).copied().unwrap_or(SURPRISE_PROMPTS[0])
}
