//! Weighted choice between the three reactions.

use std::fmt;

/// What the bot does to a supervised user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Mention the user with a random meme image.
    Image,
    /// Ask the LLM for a scolding reply.
    Scold,
    /// Poke the user, where the platform allows it.
    Poke,
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reaction::Image => "image",
            Reaction::Scold => "scold",
            Reaction::Poke => "poke",
        };
        f.write_str(s)
    }
}

/// Relative weights of each reaction; only ratios matter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionWeights {
    image: f64,
    scold: f64,
    poke: f64,
}

impl Default for ReactionWeights {
    /// 40% image, 40% scold, 20% poke.
    fn default() -> Self {
        Self { image: 0.4, scold: 0.4, poke: 0.2 }
    }
}

impl ReactionWeights {
    /// Weights must be finite, non-negative, and not all zero.
    pub fn new(image: f64, scold: f64, poke: f64) -> Result<Self, String> {
        for (name, w) in [("image", image), ("scold", scold), ("poke", poke)] {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("weight '{name}' must be a non-negative number, got {w}"));
            }
        }
        if image + scold + poke <= 0.0 {
            return Err("at least one weight must be positive".to_string());
        }
        Ok(Self { image, scold, poke })
    }

    /// Map a uniform draw `r` in `[0, 1)` onto a reaction.
    ///
    /// With the defaults: `r < 0.4` is image, `0.4 <= r < 0.8` is scold,
    /// anything above is poke.
    pub fn select(&self, r: f64) -> Reaction {
        let x = r * (self.image + self.scold + self.poke);
        if x < self.image {
            Reaction::Image
        } else if x < self.image + self.scold {
            Reaction::Scold
        } else {
            Reaction::Poke
        }
    }
}
