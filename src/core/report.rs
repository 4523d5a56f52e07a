//! Diagnostics for the log side channel: synapse permanence summaries and compact renderings
//! of per-cell vectors. Nothing here feeds back into the algorithm.

use super::{
    cell::Cell,
    segment::SegmentKind,
    settings::Settings,
    topology::average,
};
use std::fmt;

/// Permanence statistics over the segments of one kind in a region.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PermanenceSummary {
    /// Mean of the per-segment mean permanences.
    pub average_permanence: f32,

    /// Fraction of synapses that are connected, 0 without synapses.
    pub connected_fraction: f32,

    pub synapses: usize,
}

impl PermanenceSummary {
    pub fn of(cells: &[Cell], kind: SegmentKind, settings: &Settings) -> Self {
        let mut means = Vec::new();
        let mut synapses = 0;
        let mut connected = 0;

        for segment in cells.iter().flat_map(|cell| cell.segments(kind)) {
            means.push(segment.mean_permanence());
            synapses += segment.len();
            connected += segment.connected_synapses(settings).count();
        }

        Self {
            average_permanence: average(&means),
            connected_fraction: if synapses == 0 {
                0.0
            } else {
                connected as f32 / synapses as f32
            },
            synapses,
        }
    }
}

impl fmt::Display for PermanenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "average permanence: {:.1} ({:.1}% connected of {})",
            self.average_permanence,
            self.connected_fraction * 100.0,
            self.synapses
        )
    }
}

/// Renders a vector of levels as one character per value, normalized by the maximum:
/// `.` for zero, `1`-`5` for the scaled level, `N` for negative values and `?` for NaN.
/// The maximum is appended, e.g. `.5.2 (max: 1.0)`.
pub fn format_levels(values: &[f32]) -> String {
    let max = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    let max = if max.is_finite() { max } else { 0.0 };

    let mut out: String = values
        .iter()
        .map(|&value| {
            let normalized = if max != 0.0 { value / max } else { value };
            if normalized.is_nan() {
                '?'
            } else if normalized < 0.0 {
                'N'
            } else {
                match (normalized * 5.0) as u32 {
                    0 => '.',
                    level => char::from_digit(level.min(9), 10).unwrap_or('?'),
                }
            }
        })
        .collect();
    out.push_str(&format!(" (max: {max:.1})"));
    out
}

/// Renders boolean flags as `1` and `0`.
pub fn format_flags(flags: &[bool]) -> String {
    flags.iter().map(|&flag| if flag { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        segment::{Segment, Synapse},
        topology::Grid,
    };

    #[test]
    fn levels_are_normalized_by_max() {
        assert_eq!(format_levels(&[0.0, 1.0, 0.5, 0.1]), ".52. (max: 1.0)");
        assert_eq!(format_levels(&[0.0, 2.0, -1.0]), ".5N (max: 2.0)");
        assert_eq!(format_levels(&[0.0, 0.0]), ".. (max: 0.0)");
        assert_eq!(format_levels(&[f32::NAN, 1.0]), "?5 (max: 1.0)");
    }

    #[test]
    fn flags_render_as_bits() {
        assert_eq!(format_flags(&[true, false, true]), "101");
    }

    #[test]
    fn summary_over_distal_segments() {
        let settings = Settings::default();
        let grid = Grid::new("cell", 4).unwrap();
        let distal = Segment::from_synapses(
            SegmentKind::Distal,
            0,
            vec![Synapse::new(1, true, 0.1), Synapse::new(2, true, 0.5)],
        );
        let empty = Segment::from_synapses(SegmentKind::Distal, 1, Vec::new());
        let cells = vec![Cell::from_segments(0, grid, Vec::new(), vec![distal, empty], 0.3)];

        let summary = PermanenceSummary::of(&cells, SegmentKind::Distal, &settings);
        assert_eq!(summary.synapses, 2);
        assert!((summary.connected_fraction - 0.5).abs() < 1e-6);
        assert!((summary.average_permanence - 0.15).abs() < 1e-6);
    }

    #[test]
    fn summary_without_synapses_is_zero() {
        let summary = PermanenceSummary::of(&[], SegmentKind::Distal, &Settings::default());
        assert_eq!(summary, PermanenceSummary::default());
    }
}
