//! The `Region` is the pooling engine of the network. It:
//! - Owns a square grid of cells, each with proximal segments into the region's input and distal segments
//!   into the other cells of the region.
//! - Computes a distal bias per cell from its active distal segments (lateral, predictive context).
//! - Computes an overlap score per cell from its active proximal segments, the distal bias and its boost.
//! - Enforces sparse activity via local inhibition: a cell wins when its overlap reaches the k-th highest
//!   overlap among its neighbors within the inhibition radius.
//! - Snaps winners to full activation and lets every other cell fade.
//! - Learns: adapts the synapse permanences of winning cells, tracks duty cycles, boosts under-active cells
//!   and recomputes the inhibition radius from the connected receptive fields.
//!
//! What are duty cycles?
//! - They are sliding-window frequencies over the last `duty_history` steps.
//! - The active duty cycle tracks how often a cell won the inhibition.
//! - The overlap duty cycle tracks how often a cell's overlap exceeded `min_overlap`.
//! - A cell whose active duty cycle falls below a fraction of its most active neighbor's gets boosted,
//!   and if its overlap duty cycle falls below that minimum too, its proximal permanences are raised.
//!
//! Every phase of a step only writes the entries of the cell it processes. Phases run in strict order
//! because each one reads the per-cell vectors written by the previous one.

use super::{
    cell::Cell,
    error::{HtmError, Result},
    report::{format_flags, format_levels, PermanenceSummary},
    segment::{Adaptation, SegmentKind},
    settings::Settings,
    topology::{average, Layout},
};
use rand::Rng;
use std::fmt;

/// A region of cells competing to represent their input.
#[derive(Debug, Clone)]
pub struct Region {
    /// Position of the region in its network.
    index: usize,

    settings: Settings,

    /// Square layouts of the cells and of the input.
    layout: Layout,

    /// All cells of the region, indexed by cell index.
    cells: Vec<Cell>,

    /// The input of the current step.
    input: Vec<f32>,

    /// Boosted, bias-adjusted proximal activation score of each cell.
    overlap: Vec<f32>,

    /// Multiplier applied to each cell's overlap. Above 1.0 for under-active cells.
    boost: Vec<f32>,

    /// Number of active distal segments of each cell.
    bias: Vec<u32>,

    /// Sliding average of how often each cell won the inhibition.
    active_duty_cycle: Vec<f32>,

    /// Sliding average of how often each cell's overlap exceeded `min_overlap`.
    overlap_duty_cycle: Vec<f32>,

    /// The cells that won the inhibition in the last step.
    activating: Vec<bool>,

    /// Radius of the local inhibition, the discounted average connected receptive field size.
    inhibition_radius: f32,
}

impl Region {
    /// Creates region `index` with `n_cells` cells reading `n_inputs` inputs, initializing every
    /// cell's segments from `rng`.
    ///
    /// Both counts must be perfect squares.
    pub fn new<R: Rng>(
        index: usize,
        n_inputs: usize,
        n_cells: usize,
        settings: &Settings,
        rng: &mut R,
    ) -> Result<Self> {
        settings.validate()?;
        let layout = Layout::new(n_cells, n_inputs)?;
        let cells = (0..n_cells)
            .map(|i| Cell::new(i, &layout, settings, rng))
            .collect();

        let region = Self::with_layout(index, layout, cells, settings.clone());
        log::info!("Initialized {region}");
        Ok(region)
    }

    /// Creates a region from already built cells. Cell `i` of `cells` must have index `i`.
    pub fn from_cells(
        index: usize,
        n_inputs: usize,
        cells: Vec<Cell>,
        settings: &Settings,
    ) -> Result<Self> {
        settings.validate()?;
        let layout = Layout::new(cells.len(), n_inputs)?;
        if let Some(cell) = cells.iter().enumerate().find(|(i, cell)| cell.index() != *i) {
            return Err(HtmError::InvalidParameter {
                name: "cells",
                message: format!("cell at position {} has index {}", cell.0, cell.1.index()),
            });
        }

        Ok(Self::with_layout(index, layout, cells, settings.clone()))
    }

    fn with_layout(index: usize, layout: Layout, cells: Vec<Cell>, settings: Settings) -> Self {
        let n_cells = cells.len();
        Self {
            index,
            settings,
            layout,
            cells,
            input: vec![0.0; layout.inputs.len()],
            overlap: vec![0.0; n_cells],
            boost: vec![1.0; n_cells],
            bias: vec![0; n_cells],
            active_duty_cycle: vec![0.0; n_cells],
            overlap_duty_cycle: vec![0.0; n_cells],
            activating: vec![false; n_cells],
            inhibition_radius: 0.0,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.layout.inputs.len()
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn input(&self) -> &[f32] {
        &self.input
    }

    #[inline]
    pub fn overlap(&self) -> &[f32] {
        &self.overlap
    }

    #[inline]
    pub fn boost(&self) -> &[f32] {
        &self.boost
    }

    #[inline]
    pub fn bias(&self) -> &[u32] {
        &self.bias
    }

    #[inline]
    pub fn active_duty_cycle(&self) -> &[f32] {
        &self.active_duty_cycle
    }

    #[inline]
    pub fn overlap_duty_cycle(&self) -> &[f32] {
        &self.overlap_duty_cycle
    }

    #[inline]
    pub fn activating(&self) -> &[bool] {
        &self.activating
    }

    #[inline]
    pub fn inhibition_radius(&self) -> f32 {
        self.inhibition_radius
    }

    /// Current activation level of every cell.
    pub fn activations(&self) -> Vec<f32> {
        self.cells.iter().map(Cell::activation).collect()
    }

    /// Processes one input vector and returns the activation of every cell:
    /// - Computes the distal biases from the current cell activations.
    /// - Computes the boosted, biased overlaps with the input.
    /// - Inhibits to pick the activating cells.
    /// - Maxes out the activation of activating cells and fades the others.
    ///
    /// If learning is enabled, synapse permanences, duty cycles, boost factors and the inhibition
    /// radius are updated afterwards. `t` is the network time, which gates boosting.
    pub fn step(&mut self, input: &[f32], learning: bool, t: u64) -> Result<Vec<f32>> {
        self.validate_input(input)?;
        self.input.clear();
        self.input.extend_from_slice(input);

        self.bias = self.calculate_distal_biases();
        let bias: Vec<f32> = self.bias.iter().map(|&b| b as f32).collect();
        log::trace!("{} << Bias", format_levels(&bias));

        self.overlap = self.calculate_overlaps();
        log::trace!("{} << Overlap", format_levels(&self.overlap));

        self.activating = self.inhibit();
        log::trace!("{} << Activating", format_flags(&self.activating));

        self.update_activations();
        log::trace!("{} << Activations", format_levels(&self.activations()));

        if log::log_enabled!(log::Level::Debug) {
            let summary = PermanenceSummary::of(&self.cells, SegmentKind::Distal, &self.settings);
            log::debug!("R{} - distal {}", self.index, summary);
        }

        if learning {
            log::trace!("{} << Active Duty Cycle", format_levels(&self.active_duty_cycle));
            log::trace!("{} << Overlap Duty Cycle", format_levels(&self.overlap_duty_cycle));
            self.learn(t);
        }

        Ok(self.activations())
    }

    /// Checks the input width and that every value lies in [-1, 1].
    pub fn validate_input(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.n_inputs() {
            return Err(HtmError::InputSizeMismatch {
                expected: self.n_inputs(),
                actual: input.len(),
            });
        }
        if let Some((index, &value)) = input
            .iter()
            .enumerate()
            .find(|(_, value)| !(-1.0..=1.0).contains(*value))
        {
            return Err(HtmError::InputOutOfRange { index, value });
        }
        Ok(())
    }

    /// Counts the active distal segments of every cell, reading the current cell activations.
    /// Cells with many active distal segments are the ones predicted by their lateral context.
    pub fn calculate_distal_biases(&self) -> Vec<u32> {
        let activations = self.activations();
        self.cells
            .iter()
            .map(|cell| {
                cell.active_segment_count(SegmentKind::Distal, &activations, &self.settings) as u32
            })
            .collect()
    }

    /// Overlap of every cell: the active proximal segment count weighted by `overlap_effect`, plus
    /// the distal bias weighted by `distal_bias_effect`, multiplied by the cell's boost factor.
    pub fn calculate_overlaps(&self) -> Vec<f32> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let active =
                    cell.active_segment_count(SegmentKind::Proximal, &self.input, &self.settings);
                let overlap = active as f32 * self.settings.overlap_effect
                    + self.settings.distal_bias_effect * self.bias[i] as f32;
                overlap * self.boost[i]
            })
            .collect()
    }

    /// Implements local inhibition. A cell activates when its overlap is strictly positive and at
    /// least the `desired_local_activity`-th highest overlap among its neighbors.
    ///
    /// Ties at that rank all activate, so a neighborhood can hold more than
    /// `desired_local_activity` active cells.
    pub fn inhibit(&self) -> Vec<bool> {
        (0..self.n_cells())
            .map(|i| {
                let overlap = self.overlap[i];
                let neighbors = self.neighbors_of(i);
                let kth = self.kth_score(&neighbors, self.settings.desired_local_activity);
                overlap > 0.0 && overlap >= kth
            })
            .collect()
    }

    /// All cells within the inhibition radius of `cell`, excluding the cell itself.
    pub fn neighbors_of(&self, cell: usize) -> Vec<usize> {
        self.layout
            .cells
            .neighborhood(cell, self.inhibition_radius)
            .collect()
    }

    /// The `k`-th highest overlap among `cells`. With fewer than `k` cells the lowest one is used,
    /// without any cell the score is 0.
    pub fn kth_score(&self, cells: &[usize], k: usize) -> f32 {
        if cells.is_empty() {
            return 0.0;
        }
        let mut overlaps: Vec<f32> = cells.iter().map(|&c| self.overlap[c]).collect();
        overlaps.sort_unstable_by(|a, b| b.total_cmp(a));
        overlaps[k.clamp(1, overlaps.len()) - 1]
    }

    /// Highest active duty cycle among `cells`, 0 without any cell.
    pub fn max_duty_cycle(&self, cells: &[usize]) -> f32 {
        cells
            .iter()
            .map(|&c| self.active_duty_cycle[c])
            .fold(0.0, f32::max)
    }

    /// Boost factor of `cell` for the given minimum duty cycle: 1.0 when its active duty cycle
    /// reaches the minimum, growing linearly with the shortfall below it.
    pub fn boost_function(&self, cell: usize, min_duty_cycle: f32) -> f32 {
        let active = self.active_duty_cycle[cell];
        if active >= min_duty_cycle {
            1.0
        } else {
            1.0 + (min_duty_cycle - active) * self.settings.boost_multiplier
        }
    }

    /// Activating cells snap to full activation, all others fade.
    pub fn update_activations(&mut self) {
        for (cell, &activating) in self.cells.iter_mut().zip(&self.activating) {
            if activating {
                cell.activate();
            } else {
                cell.decay();
            }
        }
    }

    /// Learning phase, run after the activations of the step are updated:
    /// - Adapts every synapse of every activating cell.
    /// - Updates each cell's duty cycles.
    /// - Past the boosting warm-up, recomputes boost factors and bumps the proximal permanences of
    ///   cells whose overlap duty cycle is below their minimum duty cycle.
    /// - Recomputes the inhibition radius.
    pub fn learn(&mut self, t: u64) {
        let activations = self.activations();
        let mut proximal = Adaptation::default();
        let mut distal = Adaptation::default();

        for (cell, &activating) in self.cells.iter_mut().zip(&self.activating) {
            // Non-activating cells never learn.
            if !activating {
                continue;
            }
            for segment in cell.segments_mut(SegmentKind::Proximal) {
                proximal += segment.adapt(&self.input, activating, &self.settings);
            }
            for segment in cell.segments_mut(SegmentKind::Distal) {
                distal += segment.adapt(&activations, activating, &self.settings);
            }
        }

        log::debug!(
            "R{} - Distal: +{}/-{} ({} changed), Proximal: +{}/-{} ({} changed)",
            self.index,
            distal.increased,
            distal.decreased,
            distal.changed,
            proximal.increased,
            proximal.decreased,
            proximal.changed
        );

        // Minimum duty cycles come from the duty cycles before this step's update. A loop that
        // updates cell by cell lets each cell see its already updated lower-index neighbors, so
        // its boost factors and bumps differ numerically from these.
        let fraction = self.settings.min_duty_cycle_fraction;
        let min_duty_cycles: Vec<f32> = (0..self.n_cells())
            .map(|i| fraction * self.max_duty_cycle(&self.neighbors_of(i)))
            .collect();

        let boosting = self.settings.boosting && t > self.settings.boost_start;
        let bump = self.settings.weak_cell_bump_fraction * self.settings.connected_permanence;
        let mut bumped = 0;

        for (i, &min_duty_cycle) in min_duty_cycles.iter().enumerate() {
            let sufficient_overlap = self.overlap[i] > self.settings.min_overlap;
            let (active_duty, overlap_duty) = self.cells[i].update_duty_cycles(
                self.activating[i],
                sufficient_overlap,
                &self.settings,
            );
            self.active_duty_cycle[i] = active_duty;
            self.overlap_duty_cycle[i] = overlap_duty;

            if boosting {
                self.boost[i] = self.boost_function(i, min_duty_cycle);

                // The minimum comes from the neighbors' active duty cycles, not their overlap
                // duty cycles.
                if self.overlap_duty_cycle[i] < min_duty_cycle {
                    self.cells[i].bump_proximal_permanences(bump);
                    bumped += 1;
                }
            }
        }

        if bumped > 0 {
            log::debug!("R{} - Boosting {} due to low overlap duty cycle", self.index, bumped);
        }

        self.update_inhibition_radius();
    }

    /// Sets the inhibition radius to the discounted average connected receptive field size,
    /// floored at `min_inhibition_radius` once positive.
    pub fn update_inhibition_radius(&mut self) {
        let field_sizes: Vec<f32> = self
            .cells
            .iter()
            .map(|cell| cell.connected_receptive_field_size(&self.layout.inputs, &self.settings))
            .collect();

        let radius = average(&field_sizes) * self.settings.inhibition_radius_discount;
        self.inhibition_radius = if radius > 0.0 && radius < self.settings.min_inhibition_radius {
            self.settings.min_inhibition_radius
        } else {
            radius
        };
        log::trace!("R{} - inhibition radius {}", self.index, self.inhibition_radius);
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Region inputs={} cells={} />",
            self.n_inputs(),
            self.n_cells()
        )
    }
}
