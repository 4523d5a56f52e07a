//! `Settings` gathers every numeric constant of the pooling algorithm in one immutable value.
//!
//! A region or network receives its settings at construction and never changes them afterwards.
//! All fields have documented defaults, so a partial JSON document is enough to vary a single
//! parameter in an experiment.

use super::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Hyperparameters of regions and networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// A proximal segment is active when its total activation is strictly greater than this.
    pub proximal_activation_threshold: f32,

    /// A distal segment is active when its total activation is strictly greater than this.
    pub distal_activation_threshold: f32,

    /// Overlap a cell must exceed for the step to count towards its overlap duty cycle.
    pub min_overlap: f32,

    /// Permanence above which a synapse is connected.
    pub connected_permanence: f32,

    /// Length of the sliding window used for both duty cycles.
    pub duty_history: usize,

    /// Slope of the boost function below the minimum duty cycle.
    pub boost_multiplier: f32,

    /// Fraction of the average receptive field size used as inhibition radius.
    pub inhibition_radius_discount: f32,

    /// Floor applied to a positive inhibition radius.
    pub min_inhibition_radius: f32,

    /// Center of the initial permanence of proximal synapses.
    pub init_permanence: f32,

    /// Width of the uniform jitter around `init_permanence`.
    pub init_permanence_jitter: f32,

    /// Initial permanence of distal synapses.
    pub distal_init_permanence: f32,

    /// Minimum absolute contribution for a synapse to be reinforced during learning.
    pub synapse_learn_threshold: f32,

    /// Permanence increase for reinforced synapses.
    pub permanence_inc: f32,

    /// Permanence decrease for every other synapse of a learning cell.
    pub permanence_dec: f32,

    /// Rank `k` of the neighbor overlap a cell has to match to become active.
    pub desired_local_activity: usize,

    /// Enables boost factors and weak-cell permanence bumps.
    pub boosting: bool,

    /// Boosting only starts once the network time is strictly greater than this.
    pub boost_start: u64,

    /// Probability that a new synapse is inhibitory.
    pub chance_of_inhibitory: f32,

    /// Weight of the distal bias in the overlap score.
    pub distal_bias_effect: f32,

    /// Weight of the active proximal segment count in the overlap score.
    pub overlap_effect: f32,

    /// Probability of a distal synapse towards any other cell of the region.
    pub distal_synapse_chance: f32,

    /// Proximal synapse probability at the largest distance.
    pub proximal_synapse_chance_min: f32,

    /// Proximal synapse probability at distance zero.
    pub proximal_synapse_chance_max: f32,

    pub proximal_segments: usize,

    pub distal_segments: usize,

    /// Lower bound of the per-cell activation fade rate.
    pub fade_rate_min: f32,

    /// Upper bound of the per-cell activation fade rate.
    pub fade_rate_max: f32,

    /// Fraction of the neighbors' maximum active duty cycle used as minimum duty cycle.
    pub min_duty_cycle_fraction: f32,

    /// Weak cells get their proximal permanences raised by this fraction of `connected_permanence`.
    pub weak_cell_bump_fraction: f32,

    /// Seed of the random source used for initialization.
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proximal_activation_threshold: 2.0,
            distal_activation_threshold: 4.0,
            min_overlap: 2.0,
            connected_permanence: 0.2,
            duty_history: 100,
            boost_multiplier: 2.0,
            inhibition_radius_discount: 0.6,
            min_inhibition_radius: 1.0,
            init_permanence: 0.2,
            init_permanence_jitter: 0.05,
            distal_init_permanence: 0.1,
            synapse_learn_threshold: 0.3,
            permanence_inc: 0.02,
            permanence_dec: 0.005,
            desired_local_activity: 2,
            boosting: true,
            boost_start: 50,
            chance_of_inhibitory: 0.5,
            distal_bias_effect: 0.3,
            overlap_effect: 0.7,
            distal_synapse_chance: 0.4,
            proximal_synapse_chance_min: 0.05,
            proximal_synapse_chance_max: 0.5,
            proximal_segments: 2,
            distal_segments: 5,
            fade_rate_min: 0.2,
            fade_rate_max: 0.5,
            min_duty_cycle_fraction: 0.01,
            weak_cell_bump_fraction: 0.1,
            seed: 42,
        }
    }
}

impl Settings {
    /// Parses settings from a JSON document. Missing fields keep their defaults.
    pub fn from_json(document: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every parameter lies in its valid range.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("connected_permanence", self.connected_permanence),
            ("init_permanence", self.init_permanence),
            ("distal_init_permanence", self.distal_init_permanence),
            ("permanence_inc", self.permanence_inc),
            ("permanence_dec", self.permanence_dec),
            ("chance_of_inhibitory", self.chance_of_inhibitory),
            ("distal_synapse_chance", self.distal_synapse_chance),
            ("proximal_synapse_chance_min", self.proximal_synapse_chance_min),
            ("proximal_synapse_chance_max", self.proximal_synapse_chance_max),
            ("fade_rate_min", self.fade_rate_min),
            ("fade_rate_max", self.fade_rate_max),
            ("min_duty_cycle_fraction", self.min_duty_cycle_fraction),
            ("weak_cell_bump_fraction", self.weak_cell_bump_fraction),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("{value} is outside [0, 1]")));
            }
        }

        let non_negative = [
            ("proximal_activation_threshold", self.proximal_activation_threshold),
            ("distal_activation_threshold", self.distal_activation_threshold),
            ("min_overlap", self.min_overlap),
            ("boost_multiplier", self.boost_multiplier),
            ("inhibition_radius_discount", self.inhibition_radius_discount),
            ("min_inhibition_radius", self.min_inhibition_radius),
            ("init_permanence_jitter", self.init_permanence_jitter),
            ("synapse_learn_threshold", self.synapse_learn_threshold),
            ("distal_bias_effect", self.distal_bias_effect),
            ("overlap_effect", self.overlap_effect),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("{value} must be finite and non-negative")));
            }
        }

        if self.proximal_synapse_chance_min > self.proximal_synapse_chance_max {
            return Err(invalid(
                "proximal_synapse_chance_min",
                "must not exceed proximal_synapse_chance_max".to_string(),
            ));
        }
        if self.fade_rate_min > self.fade_rate_max {
            return Err(invalid(
                "fade_rate_min",
                "must not exceed fade_rate_max".to_string(),
            ));
        }
        if self.desired_local_activity == 0 {
            return Err(invalid("desired_local_activity", "must be at least 1".to_string()));
        }
        if self.duty_history == 0 {
            return Err(invalid("duty_history", "must be at least 1".to_string()));
        }

        Ok(())
    }
}

fn invalid(name: &'static str, message: String) -> HtmError {
    HtmError::InvalidParameter { name, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "boosting": false, "seed": 7 }"#).unwrap();
        assert!(!settings.boosting);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.duty_history, 100);
        assert_eq!(settings.connected_permanence, 0.2);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let settings = Settings {
            connected_permanence: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(HtmError::InvalidParameter { name: "connected_permanence", .. })
        ));

        let settings = Settings {
            desired_local_activity: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            fade_rate_min: 0.6,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            Settings::from_json("{ boosting: "),
            Err(HtmError::Config(_))
        ));
    }
}
