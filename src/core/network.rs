//! The `Network` chains regions into a hierarchy.
//!
//! Region `i` reads the activations of region `i - 1` as its input, the first region reads the
//! external input. Each call to [`Network::process`] feeds one input vector through every region
//! in order and then advances the network time by one step. The time gates the boosting warm-up
//! of every region.

use super::{
    error::{HtmError, Result},
    region::Region,
    report::format_levels,
    settings::Settings,
};
use rand::{rngs::StdRng, SeedableRng};
use std::fmt;

/// An ordered chain of regions sharing one time counter.
pub struct Network {
    settings: Settings,

    regions: Vec<Region>,

    /// Number of processed steps. Never reset.
    t: u64,
}

impl Network {
    /// Builds one region per entry of `cells_per_region`. The first region reads `n_inputs`
    /// inputs, every following region reads the cells of the previous one.
    ///
    /// All regions are initialized from one generator seeded with `settings.seed`.
    pub fn new(n_inputs: usize, cells_per_region: &[usize], settings: Settings) -> Result<Self> {
        if cells_per_region.is_empty() {
            return Err(HtmError::EmptyNetwork);
        }
        settings.validate()?;

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut regions = Vec::with_capacity(cells_per_region.len());
        let mut inputs = n_inputs;
        for (index, &n_cells) in cells_per_region.iter().enumerate() {
            regions.push(Region::new(index, inputs, n_cells, &settings, &mut rng)?);
            inputs = n_cells;
        }

        let network = Self {
            settings,
            regions,
            t: 0,
        };
        log::info!("Initialized {network}");
        Ok(network)
    }

    /// Steps every region in order, each on the output of the previous one, advances time and
    /// returns the activations of the last region.
    pub fn process(&mut self, input: &[f32], learning: bool) -> Result<Vec<f32>> {
        log::debug!("Processing inputs at T{}", self.t);

        let mut signal = input.to_vec();
        for region in &mut self.regions {
            log::trace!(
                "Step processing for region {}\n{} << Input",
                region.index(),
                format_levels(&signal)
            );
            signal = region.step(&signal, learning, self.t)?;
        }

        self.t += 1;
        Ok(signal)
    }

    /// Current network time.
    #[inline]
    pub fn t(&self) -> u64 {
        self.t
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Width of the input the first region expects.
    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.regions[0].n_inputs()
    }

    /// Width of the output of the last region.
    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.regions[self.regions.len() - 1].n_cells()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<HTMNetwork regions={}>", self.regions.len())
    }
}
