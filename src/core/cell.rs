//! A `Cell` is the competitive unit of a region.
//!
//! It owns a fixed number of proximal segments (feed-forward input) and distal segments (lateral
//! input from the other cells of the region). Instead of a binary state it keeps a continuous
//! activation level: winning the inhibition snaps it to 1.0, otherwise it fades by a per-cell
//! rate drawn once at creation.
//!
//! The cell also remembers whether it was active and whether its overlap was sufficient over the
//! last `duty_history` steps. The means of these histories are its duty cycles.

use super::{
    segment::{Segment, SegmentKind},
    settings::Settings,
    topology::{distance, Grid, Layout},
};
use rand::Rng;
use std::{collections::VecDeque, fmt};

/// Represents one cell of a region.
#[derive(Debug, Clone)]
pub struct Cell {
    index: usize,

    /// Coordinates on the cell grid.
    coords: (usize, usize),

    proximal_segments: Vec<Segment>,

    distal_segments: Vec<Segment>,

    /// Activation level in [0, 1].
    activation: f32,

    /// Amount of activation lost per step while not active.
    fade_rate: f32,

    /// Most recent first.
    recent_active_duty: VecDeque<bool>,

    /// Most recent first.
    recent_overlap_duty: VecDeque<bool>,
}

impl Cell {
    /// Creates cell `index` and initializes its proximal and distal segments.
    pub fn new<R: Rng>(index: usize, layout: &Layout, settings: &Settings, rng: &mut R) -> Self {
        let fade_rate = if settings.fade_rate_min < settings.fade_rate_max {
            rng.random_range(settings.fade_rate_min..settings.fade_rate_max)
        } else {
            settings.fade_rate_min
        };

        let proximal_segments = (0..settings.proximal_segments)
            .map(|i| Segment::proximal(index, i, layout, settings, rng))
            .collect();
        let distal_segments = (0..settings.distal_segments)
            .map(|i| Segment::distal(index, i, layout.cells.len(), settings, rng))
            .collect();

        let cell = Self::from_segments(
            index,
            layout.cells,
            proximal_segments,
            distal_segments,
            fade_rate,
        );
        log::trace!("Initialized {cell}");
        cell
    }

    /// Creates a cell from explicit segments.
    pub fn from_segments(
        index: usize,
        grid: Grid,
        proximal_segments: Vec<Segment>,
        distal_segments: Vec<Segment>,
        fade_rate: f32,
    ) -> Self {
        Self {
            index,
            coords: grid.coordinates(index),
            proximal_segments,
            distal_segments,
            activation: 0.0,
            fade_rate,
            recent_active_duty: VecDeque::new(),
            recent_overlap_duty: VecDeque::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn coords(&self) -> (usize, usize) {
        self.coords
    }

    #[inline]
    pub fn activation(&self) -> f32 {
        self.activation
    }

    #[inline]
    pub fn fade_rate(&self) -> f32 {
        self.fade_rate
    }

    #[inline]
    pub fn proximal_segments(&self) -> &[Segment] {
        &self.proximal_segments
    }

    #[inline]
    pub fn distal_segments(&self) -> &[Segment] {
        &self.distal_segments
    }

    #[inline]
    pub fn segments(&self, kind: SegmentKind) -> &[Segment] {
        match kind {
            SegmentKind::Proximal => &self.proximal_segments,
            SegmentKind::Distal => &self.distal_segments,
        }
    }

    #[inline]
    pub(crate) fn segments_mut(&mut self, kind: SegmentKind) -> &mut [Segment] {
        match kind {
            SegmentKind::Proximal => &mut self.proximal_segments,
            SegmentKind::Distal => &mut self.distal_segments,
        }
    }

    #[inline]
    pub fn recent_active_duty(&self) -> &VecDeque<bool> {
        &self.recent_active_duty
    }

    #[inline]
    pub fn recent_overlap_duty(&self) -> &VecDeque<bool> {
        &self.recent_overlap_duty
    }

    /// Selected by inhibition: maxes out the activation.
    #[inline]
    pub fn activate(&mut self) {
        self.activation = 1.0;
    }

    /// Not selected: the activation fades by the cell's rate, floored at 0.
    #[inline]
    pub fn decay(&mut self) {
        self.activation = (self.activation - self.fade_rate).max(0.0);
    }

    /// Number of active segments of `kind` given the values they read.
    pub fn active_segment_count(
        &self,
        kind: SegmentKind,
        sources: &[f32],
        settings: &Settings,
    ) -> usize {
        self.segments(kind)
            .iter()
            .filter(|segment| segment.is_active(sources, settings))
            .count()
    }

    /// Sources of all connected synapses across the segments of `kind`.
    pub fn connected_sources(&self, kind: SegmentKind, settings: &Settings) -> Vec<usize> {
        self.segments(kind)
            .iter()
            .flat_map(|segment| {
                segment
                    .connected_synapses(settings)
                    .map(move |i| segment.synapses()[i].source)
            })
            .collect()
    }

    /// Records this step's active and sufficient-overlap flags and returns the resulting
    /// `(active_duty_cycle, overlap_duty_cycle)` means over the truncated histories.
    pub fn update_duty_cycles(
        &mut self,
        active: bool,
        overlap: bool,
        settings: &Settings,
    ) -> (f32, f32) {
        let limit = settings.duty_history;

        self.recent_active_duty.push_front(active);
        self.recent_active_duty.truncate(limit);
        self.recent_overlap_duty.push_front(overlap);
        self.recent_overlap_duty.truncate(limit);

        (
            duty_cycle(&self.recent_active_duty),
            duty_cycle(&self.recent_overlap_duty),
        )
    }

    /// Largest distance from this cell to the input position of any connected proximal synapse,
    /// 0 when none is connected.
    pub fn connected_receptive_field_size(&self, inputs: &Grid, settings: &Settings) -> f32 {
        let center = (self.coords.0 as f32, self.coords.1 as f32);
        self.connected_sources(SegmentKind::Proximal, settings)
            .into_iter()
            .map(|source| distance(inputs.point(source), center))
            .fold(0.0, f32::max)
    }

    /// Raises the permanence of every proximal synapse by `amount`.
    pub fn bump_proximal_permanences(&mut self, amount: f32) {
        for segment in &mut self.proximal_segments {
            segment.bump_permanences(amount);
        }
    }
}

fn duty_cycle(history: &VecDeque<bool>) -> f32 {
    if history.is_empty() {
        return 0.0;
    }
    history.iter().filter(|&&flag| flag).count() as f32 / history.len() as f32
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Cell index={} activation={:.1} />",
            self.index, self.activation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::Synapse;
    use rand::{rngs::StdRng, SeedableRng};

    fn proximal(synapses: &[(usize, f32)]) -> Segment {
        Segment::from_synapses(
            SegmentKind::Proximal,
            0,
            synapses
                .iter()
                .map(|&(source, permanence)| Synapse::new(source, true, permanence))
                .collect(),
        )
    }

    #[test]
    fn new_cell_builds_configured_segments() {
        let settings = Settings::default();
        let layout = Layout::new(9, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let cell = Cell::new(4, &layout, &settings, &mut rng);

        assert_eq!(cell.proximal_segments().len(), 2);
        assert_eq!(cell.distal_segments().len(), 5);
        assert_eq!(cell.coords(), (1, 1));
        assert_eq!(cell.activation(), 0.0);
        assert!((0.2..0.5).contains(&cell.fade_rate()));
    }

    #[test]
    fn activation_fades_and_floors_at_zero() {
        let grid = Grid::new("cell", 4).unwrap();
        let mut cell = Cell::from_segments(0, grid, Vec::new(), Vec::new(), 0.4);

        cell.activate();
        assert_eq!(cell.activation(), 1.0);
        cell.decay();
        assert!((cell.activation() - 0.6).abs() < 1e-6);
        cell.decay();
        cell.decay();
        assert_eq!(cell.activation(), 0.0);
    }

    #[test]
    fn duty_history_is_capped_and_most_recent_first() {
        let settings = Settings::default();
        let grid = Grid::new("cell", 4).unwrap();
        let mut cell = Cell::from_segments(0, grid, Vec::new(), Vec::new(), 0.3);

        for step in 0..150 {
            cell.update_duty_cycles(step % 2 == 0, false, &settings);
        }
        let (active, overlap) = cell.update_duty_cycles(true, true, &settings);

        assert_eq!(cell.recent_active_duty().len(), 100);
        assert_eq!(cell.recent_overlap_duty().len(), 100);
        assert_eq!(cell.recent_active_duty().front(), Some(&true));
        assert!((active - 0.5).abs() < 1e-6);
        assert!((overlap - 0.01).abs() < 1e-6);
    }

    #[test]
    fn receptive_field_is_max_distance_of_connected_sources() {
        let settings = Settings::default();
        let grid = Grid::new("cell", 4).unwrap();
        let inputs = Grid::new("input", 16).unwrap();
        let cell = Cell::from_segments(
            0,
            grid,
            vec![proximal(&[(1, 0.5), (5, 0.3)]), proximal(&[(15, 0.1)])],
            Vec::new(),
            0.3,
        );

        let size = cell.connected_receptive_field_size(&inputs, &settings);
        assert!((size - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn receptive_field_without_connections_is_zero() {
        let settings = Settings::default();
        let grid = Grid::new("cell", 4).unwrap();
        let inputs = Grid::new("input", 4).unwrap();
        let cell = Cell::from_segments(3, grid, vec![proximal(&[(0, 0.1)])], Vec::new(), 0.3);
        assert_eq!(cell.connected_receptive_field_size(&inputs, &settings), 0.0);
    }

    #[test]
    fn bump_only_touches_proximal_synapses() {
        let grid = Grid::new("cell", 4).unwrap();
        let distal =
            Segment::from_synapses(SegmentKind::Distal, 0, vec![Synapse::new(1, true, 0.1)]);
        let mut cell = Cell::from_segments(0, grid, vec![proximal(&[(0, 0.1)])], vec![distal], 0.3);

        cell.bump_proximal_permanences(0.02);

        let proximal = cell.proximal_segments()[0].synapses()[0].permanence.value();
        let distal = cell.distal_segments()[0].synapses()[0].permanence.value();
        assert!((proximal - 0.12).abs() < 1e-6);
        assert_eq!(distal, 0.1);
    }
}
