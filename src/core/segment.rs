//! A `Segment` is a dendrite segment of a cell: an ordered set of synapses of one kind.
//!
//! Proximal segments read the external input of the region (feed-forward), distal segments read
//! the activation levels of the other cells of the same region (lateral, predictive context).
//! A segment does not point back to its region. The values a segment reads are handed in as a
//! `sources` slice: the current input vector for proximal segments, the cell activations for
//! distal ones.
//!
//! Each synapse is either excitatory or inhibitory, fixed at creation. Its contribution is the
//! source value, negated for inhibitory synapses. Only connected synapses (permanence strictly
//! above the connected threshold) count towards the segment's total activation.
//!
//! Synapses are created once when the segment is initialized and never removed, so the number of
//! synapses of a segment is constant after initialization.

use super::{settings::Settings, topology::Layout};
use rand::Rng;
use std::{fmt, ops::AddAssign};

/// Learned synapse strength, always within [0, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Permanence(f32);

impl Permanence {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 1.0;

    /// Creates a permanence, clamping `value` into [0, 1]. NaN maps to 0.
    #[inline]
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self(Self::MIN)
        } else {
            Self(value.clamp(Self::MIN, Self::MAX))
        }
    }

    #[inline]
    pub fn value(self) -> f32 {
        self.0
    }

    #[inline]
    pub fn increment(&mut self, amount: f32) {
        *self = Self::new(self.0 + amount);
    }

    #[inline]
    pub fn decrement(&mut self, amount: f32) {
        *self = Self::new(self.0 - amount);
    }

    /// Connected means strictly above `threshold`.
    #[inline]
    pub fn is_connected(self, threshold: f32) -> bool {
        self.0 > threshold
    }
}

/// A connection from a segment to a source (an input index or a cell index).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synapse {
    /// Index into the input vector (proximal) or into the cells of the region (distal).
    pub source: usize,

    /// Inhibitory synapses contribute the negated source value.
    pub excitatory: bool,

    pub permanence: Permanence,
}

impl Synapse {
    pub fn new(source: usize, excitatory: bool, permanence: f32) -> Self {
        Self {
            source,
            excitatory,
            permanence: Permanence::new(permanence),
        }
    }

    #[inline]
    fn sign(&self) -> f32 {
        if self.excitatory {
            1.0
        } else {
            -1.0
        }
    }
}

/// Whether a segment feeds on the external input or on the other cells of its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Proximal,
    Distal,
}

impl SegmentKind {
    /// Total activation a segment of this kind must exceed to be active.
    #[inline]
    pub fn activation_threshold(self, settings: &Settings) -> f32 {
        match self {
            SegmentKind::Proximal => settings.proximal_activation_threshold,
            SegmentKind::Distal => settings.distal_activation_threshold,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Proximal => write!(f, "Proximal"),
            SegmentKind::Distal => write!(f, "Distal"),
        }
    }
}

/// Whether a synapse with `excitatory` polarity gets reinforced on a cell with the given state.
///
/// Excitatory synapses are reinforced on activating cells, inhibitory synapses on cells that stay
/// inactive. Learning only runs for activating cells, so in practice only the first case occurs
/// and inhibitory synapses of learning cells always decay.
#[inline]
pub fn reinforces(excitatory: bool, activating: bool) -> bool {
    (activating && excitatory) || (!activating && !excitatory)
}

/// Counters of a learning pass over synapses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Adaptation {
    pub increased: usize,
    pub decreased: usize,
    /// Synapses whose connected state flipped.
    pub changed: usize,
}

impl AddAssign for Adaptation {
    fn add_assign(&mut self, other: Self) {
        self.increased += other.increased;
        self.decreased += other.decreased;
        self.changed += other.changed;
    }
}

/// A dendrite segment of a cell.
#[derive(Debug, Clone)]
pub struct Segment {
    kind: SegmentKind,
    index: usize,
    pub(crate) synapses: Vec<Synapse>,
}

impl Segment {
    /// Creates a segment from explicit synapses.
    pub fn from_synapses(kind: SegmentKind, index: usize, synapses: Vec<Synapse>) -> Self {
        Self {
            kind,
            index,
            synapses,
        }
    }

    /// Creates and initializes a proximal segment of cell `owner`.
    ///
    /// Every input gets a synapse with a probability that decreases linearly with its distance to
    /// the cell, from `proximal_synapse_chance_max` at distance zero to
    /// `proximal_synapse_chance_min` at the layout's diagonal. Past the diagonal the chance keeps
    /// falling, and once it is negative the input never gets a synapse.
    pub fn proximal<R: Rng>(
        owner: usize,
        index: usize,
        layout: &Layout,
        settings: &Settings,
        rng: &mut R,
    ) -> Self {
        let mut segment = Self::from_synapses(SegmentKind::Proximal, index, Vec::new());
        let min = settings.proximal_synapse_chance_min;
        let max = settings.proximal_synapse_chance_max;
        let diagonal = layout.diagonal();

        for source in 0..layout.inputs.len() {
            let dist = layout.cell_to_input_distance(owner, source);
            let chance = (max - min) * (1.0 - dist / diagonal) + min;
            if rng.random::<f32>() < chance {
                segment.add_synapse(source, None, settings, rng);
            }
        }

        log::trace!("Initialized {segment} of cell {owner}");
        segment
    }

    /// Creates and initializes a distal segment of cell `owner` in a region of `n_cells` cells.
    /// Every other cell gets a synapse with probability `distal_synapse_chance`.
    pub fn distal<R: Rng>(
        owner: usize,
        index: usize,
        n_cells: usize,
        settings: &Settings,
        rng: &mut R,
    ) -> Self {
        let mut segment = Self::from_synapses(SegmentKind::Distal, index, Vec::new());

        for source in (0..n_cells).filter(|&source| source != owner) {
            if rng.random::<f32>() < settings.distal_synapse_chance {
                segment.add_synapse(source, Some(settings.distal_init_permanence), settings, rng);
            }
        }

        log::trace!("Initialized {segment} of cell {owner}");
        segment
    }

    /// Appends a synapse with a random polarity. Without an explicit permanence it starts at
    /// `init_permanence` plus a uniform jitter of `init_permanence_jitter` total width.
    pub fn add_synapse<R: Rng>(
        &mut self,
        source: usize,
        permanence: Option<f32>,
        settings: &Settings,
        rng: &mut R,
    ) {
        let excitatory = rng.random::<f32>() > settings.chance_of_inhibitory;
        let permanence = permanence.unwrap_or_else(|| {
            settings.init_permanence + settings.init_permanence_jitter * (rng.random::<f32>() - 0.5)
        });
        self.synapses.push(Synapse::new(source, excitatory, permanence));
    }

    /// Synapses are never pruned; the synapse count is constant after initialization.
    pub fn remove_synapse(&mut self, _index: usize) {}

    #[inline]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.synapses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.synapses.is_empty()
    }

    /// Contribution of synapse `i` given the current source values.
    /// Signed by polarity, or the magnitude of the source value if `absolute` is set.
    #[inline]
    pub fn contribution(&self, i: usize, sources: &[f32], absolute: bool) -> f32 {
        let synapse = &self.synapses[i];
        let value = sources[synapse.source];
        if absolute {
            value.abs()
        } else {
            value * synapse.sign()
        }
    }

    #[inline]
    pub fn is_connected(&self, i: usize, settings: &Settings) -> bool {
        self.synapses[i]
            .permanence
            .is_connected(settings.connected_permanence)
    }

    /// Indices (within this segment) of the connected synapses.
    pub fn connected_synapses<'a>(
        &'a self,
        settings: &Settings,
    ) -> impl Iterator<Item = usize> + 'a {
        let threshold = settings.connected_permanence;
        self.synapses
            .iter()
            .enumerate()
            .filter(move |(_, synapse)| synapse.permanence.is_connected(threshold))
            .map(|(i, _)| i)
    }

    /// Signed sum of the contributions of all connected synapses.
    pub fn total_activation(&self, sources: &[f32], settings: &Settings) -> f32 {
        self.connected_synapses(settings)
            .map(|i| self.contribution(i, sources, false))
            .sum()
    }

    /// Active when the total activation is strictly above the kind's threshold.
    #[inline]
    pub fn is_active(&self, sources: &[f32], settings: &Settings) -> bool {
        self.total_activation(sources, settings) > self.kind.activation_threshold(settings)
    }

    /// Mean permanence over all synapses, 0 for an empty segment.
    pub fn mean_permanence(&self) -> f32 {
        if self.synapses.is_empty() {
            return 0.0;
        }
        self.synapses
            .iter()
            .map(|synapse| synapse.permanence.value())
            .sum::<f32>()
            / self.synapses.len() as f32
    }

    /// Raises the permanence of every synapse by `amount`.
    pub fn bump_permanences(&mut self, amount: f32) {
        for synapse in &mut self.synapses {
            synapse.permanence.increment(amount);
        }
    }

    /// Hebbian update of every synapse for a cell in the given activating state.
    ///
    /// A synapse is reinforced by `permanence_inc` when its source magnitude reaches
    /// `synapse_learn_threshold` and its polarity agrees with the cell state, see [`reinforces`].
    /// Every other synapse decays by `permanence_dec`.
    pub fn adapt(&mut self, sources: &[f32], activating: bool, settings: &Settings) -> Adaptation {
        let mut adaptation = Adaptation::default();
        let threshold = settings.connected_permanence;

        for i in 0..self.synapses.len() {
            let strong = self.contribution(i, sources, true) >= settings.synapse_learn_threshold;
            let synapse = &mut self.synapses[i];
            let was_connected = synapse.permanence.is_connected(threshold);

            if strong && reinforces(synapse.excitatory, activating) {
                synapse.permanence.increment(settings.permanence_inc);
                adaptation.increased += 1;
            } else {
                synapse.permanence.decrement(settings.permanence_dec);
                adaptation.decreased += 1;
            }

            if was_connected != synapse.permanence.is_connected(threshold) {
                adaptation.changed += 1;
            }
        }

        adaptation
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Segment type={} index={} potential={}>",
            self.kind,
            self.index,
            self.synapses.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn segment(kind: SegmentKind, synapses: &[(usize, bool, f32)]) -> Segment {
        Segment::from_synapses(
            kind,
            0,
            synapses
                .iter()
                .map(|&(source, excitatory, permanence)| {
                    Synapse::new(source, excitatory, permanence)
                })
                .collect(),
        )
    }

    #[test]
    fn permanence_is_clamped() {
        assert_eq!(Permanence::new(1.7).value(), 1.0);
        assert_eq!(Permanence::new(-0.3).value(), 0.0);
        assert_eq!(Permanence::new(f32::NAN).value(), 0.0);

        let mut permanence = Permanence::new(0.99);
        permanence.increment(0.02);
        assert_eq!(permanence.value(), 1.0);
        permanence.decrement(2.0);
        assert_eq!(permanence.value(), 0.0);
    }

    #[test]
    fn connected_is_strictly_above_threshold() {
        let settings = Settings::default();
        let seg = segment(
            SegmentKind::Proximal,
            &[(0, true, 0.2), (1, true, 0.2001), (2, true, 0.1)],
        );
        assert!(!seg.is_connected(0, &settings));
        assert!(seg.is_connected(1, &settings));
        assert_eq!(seg.connected_synapses(&settings).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn contribution_is_signed_by_polarity() {
        let seg = segment(SegmentKind::Proximal, &[(0, true, 0.5), (1, false, 0.5)]);
        let input = [0.8, 0.6];
        assert_eq!(seg.contribution(0, &input, false), 0.8);
        assert_eq!(seg.contribution(1, &input, false), -0.6);
        assert_eq!(seg.contribution(1, &input, true), 0.6);
    }

    #[test]
    fn total_activation_counts_connected_synapses_only() {
        let settings = Settings::default();
        let seg = segment(
            SegmentKind::Proximal,
            &[(0, true, 0.5), (1, true, 0.5), (2, false, 0.5), (3, true, 0.1)],
        );
        let input = [1.0, 1.0, 0.5, 1.0];
        assert_eq!(seg.total_activation(&input, &settings), 1.5);
    }

    #[test]
    fn activation_threshold_boundary_is_inactive() {
        let settings = Settings::default();
        let proximal = segment(SegmentKind::Proximal, &[(0, true, 0.5), (1, true, 0.5)]);
        assert!(!proximal.is_active(&[1.0, 1.0], &settings));

        let proximal = segment(
            SegmentKind::Proximal,
            &[(0, true, 0.5), (1, true, 0.5), (2, true, 0.5)],
        );
        assert!(proximal.is_active(&[1.0, 1.0, 1.0], &settings));

        let distal = segment(
            SegmentKind::Distal,
            &[(0, true, 0.5), (1, true, 0.5), (2, true, 0.5)],
        );
        assert!(!distal.is_active(&[1.0, 1.0, 1.0], &settings));
    }

    #[test]
    fn no_connected_synapses_means_no_activation() {
        let settings = Settings::default();
        let seg = segment(SegmentKind::Proximal, &[(0, true, 0.1), (1, true, 0.2)]);
        assert_eq!(seg.total_activation(&[1.0, 1.0], &settings), 0.0);
        assert!(!seg.is_active(&[1.0, 1.0], &settings));
    }

    #[test]
    fn adapt_reinforces_strong_excitatory_synapses_on_activating_cells() {
        let settings = Settings::default();
        let mut seg = segment(
            SegmentKind::Proximal,
            &[(0, true, 0.5), (1, true, 0.5), (2, false, 0.5)],
        );
        let adaptation = seg.adapt(&[1.0, 0.1, 1.0], true, &settings);

        let permanences: Vec<f32> = seg.synapses().iter().map(|s| s.permanence.value()).collect();
        for (actual, expected) in permanences.iter().zip([0.52, 0.495, 0.495]) {
            assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
        }
        assert_eq!(adaptation.increased, 1);
        assert_eq!(adaptation.decreased, 2);
        assert_eq!(adaptation.changed, 0);
    }

    #[test]
    fn adapt_counts_connection_changes() {
        let settings = Settings::default();
        let mut seg = segment(SegmentKind::Distal, &[(0, true, 0.19), (1, true, 0.202)]);
        let adaptation = seg.adapt(&[1.0, 0.0], true, &settings);
        assert_eq!(adaptation.changed, 2);
        assert!(seg.is_connected(0, &settings));
        assert!(!seg.is_connected(1, &settings));
    }

    #[test]
    fn polarity_rule_covers_both_cell_states() {
        assert!(reinforces(true, true));
        assert!(!reinforces(false, true));
        assert!(reinforces(false, false));
        assert!(!reinforces(true, false));
    }

    #[test]
    fn distal_segment_never_targets_its_owner() {
        let settings = Settings {
            distal_synapse_chance: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let seg = Segment::distal(2, 0, 9, &settings, &mut rng);
        assert_eq!(seg.len(), 8);
        assert!(seg.synapses().iter().all(|s| s.source != 2));
        assert!(seg
            .synapses()
            .iter()
            .all(|s| s.permanence.value() == settings.distal_init_permanence));
    }

    #[test]
    fn proximal_permanences_start_near_init_permanence() {
        let settings = Settings::default();
        let layout = Layout::new(16, 64).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let seg = Segment::proximal(5, 0, &layout, &settings, &mut rng);

        assert!(!seg.is_empty());
        assert!(seg.len() <= 64);
        for synapse in seg.synapses() {
            let offset = (synapse.permanence.value() - settings.init_permanence).abs();
            assert!(offset <= settings.init_permanence_jitter / 2.0 + 1e-6);
        }
    }

    #[test]
    fn far_inputs_get_no_proximal_synapses() {
        // Cell grid side 2 gives a diagonal of about 5.66, the corner inputs of the 8x8 input
        // grid lie up to 9.9 away from cell 0.
        let layout = Layout::new(4, 64).unwrap();
        let diagonal = layout.diagonal();
        assert!(layout.cell_to_input_distance(0, 63) > diagonal);

        let settings = Settings::default();
        let (min, max) = (
            settings.proximal_synapse_chance_min,
            settings.proximal_synapse_chance_max,
        );
        // Distance at which the linear chance reaches zero.
        let cutoff = diagonal * (1.0 + min / (max - min));

        let exact = Settings {
            proximal_synapse_chance_min: 0.0,
            ..Default::default()
        };

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let seg = Segment::proximal(0, 0, &layout, &settings, &mut rng);
            for synapse in seg.synapses() {
                assert!(layout.cell_to_input_distance(0, synapse.source) <= cutoff);
            }

            let seg = Segment::proximal(0, 0, &layout, &exact, &mut rng);
            for synapse in seg.synapses() {
                assert!(layout.cell_to_input_distance(0, synapse.source) <= diagonal);
            }
        }
    }

    #[test]
    fn remove_synapse_keeps_the_synapse_count() {
        let mut seg = segment(SegmentKind::Proximal, &[(0, true, 0.5), (1, true, 0.5)]);
        seg.remove_synapse(0);
        assert_eq!(seg.len(), 2);
    }
}
