//! Static waveform catalog.
//!
//! Each waveform is a named, ordered sequence of pulse segments (4
//! frequencies + 4 intensities per segment) that the scheduler feeds
//! into the device pulse queue. The catalog is immutable and referenced
//! by stable index everywhere else in the coordinator.

/// One pulse segment: four frequency steps and four intensity steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSegment {
    /// Frequency steps.
    pub frequency: [u8; 4],
    /// Intensity steps (0–100).
    pub intensity: [u8; 4],
}

/// A named waveform: an ordered segment sequence.
#[derive(Debug, Clone, Copy)]
pub struct Waveform {
    /// Display name.
    pub name: &'static str,
    /// Segment sequence.
    pub segments: &'static [PulseSegment],
}

/// Segment count at which a waveform counts as "long".
pub const LONG_WAVEFORM_THRESHOLD: usize = 20;

/// Repeats per submission for long waveforms.
pub const LONG_REPEATS: usize = 3;

/// Repeats per submission for short waveforms.
pub const SHORT_REPEATS: usize = 5;

/// Repeats for an immediate "set waveform now" override.
pub const OVERRIDE_REPEATS: usize = 3;

impl Waveform {
    /// Number of repeats per periodic submission.
    ///
    /// The device enforces a maximum queued-segment count per
    /// submission, so long waveforms get fewer repeats.
    #[must_use]
    pub const fn repeats(&self) -> usize {
        if self.segments.len() >= LONG_WAVEFORM_THRESHOLD {
            LONG_REPEATS
        } else {
            SHORT_REPEATS
        }
    }

    /// Returns the segment sequence repeated `count` times.
    #[must_use]
    pub fn repeated(&self, count: usize) -> Vec<PulseSegment> {
        let mut out = Vec::with_capacity(self.segments.len() * count);
        for _ in 0..count {
            out.extend_from_slice(self.segments);
        }
        out
    }
}

/// Looks up a waveform by catalog index.
#[must_use]
pub fn get(index: usize) -> Option<&'static Waveform> {
    CATALOG.get(index)
}

macro_rules! seg {
    (($($f:expr),+), ($($i:expr),+)) => {
        PulseSegment {
            frequency: [$($f),+],
            intensity: [$($i),+],
        }
    };
}

/// The full waveform catalog, in stable index order.
pub static CATALOG: &[Waveform] = &[
    Waveform { name: "Breathe", segments: BREATHE },
    Waveform { name: "Tide", segments: TIDE },
    Waveform { name: "Combo", segments: COMBO },
    Waveform { name: "Quick Pinch", segments: QUICK_PINCH },
    Waveform { name: "Pinch Swell", segments: PINCH_SWELL },
    Waveform { name: "Heartbeat", segments: HEARTBEAT },
    Waveform { name: "Compression", segments: COMPRESSION },
    Waveform { name: "Rhythm Step", segments: RHYTHM_STEP },
    Waveform { name: "Granule Rub", segments: GRANULE_RUB },
    Waveform { name: "Fade Bounce", segments: FADE_BOUNCE },
    Waveform { name: "Wave Ripple", segments: WAVE_RIPPLE },
    Waveform { name: "Rainfall", segments: RAINFALL },
    Waveform { name: "Shift Tap", segments: SHIFT_TAP },
    Waveform { name: "Signal Light", segments: SIGNAL_LIGHT },
    Waveform { name: "Tease 1", segments: TEASE_1 },
    Waveform { name: "Tease 2", segments: TEASE_2 },
];

static BREATHE: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 5, 10, 20)),
    seg!((10, 10, 10, 10), (20, 25, 30, 40)),
    seg!((10, 10, 10, 10), (40, 45, 50, 60)),
    seg!((10, 10, 10, 10), (60, 65, 70, 80)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

static TIDE: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 4, 8, 17)),
    seg!((10, 10, 10, 10), (17, 21, 25, 33)),
    seg!((10, 10, 10, 10), (50, 50, 50, 50)),
    seg!((10, 10, 10, 10), (50, 54, 58, 67)),
    seg!((10, 10, 10, 10), (67, 71, 75, 83)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 98, 96, 92)),
    seg!((10, 10, 10, 10), (92, 90, 88, 84)),
    seg!((10, 10, 10, 10), (84, 82, 80, 76)),
    seg!((10, 10, 10, 10), (68, 68, 68, 68)),
];

static COMBO: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 92, 84, 67)),
    seg!((10, 10, 10, 10), (67, 58, 50, 33)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 1)),
    seg!((10, 10, 10, 10), (2, 2, 2, 2)),
];

static QUICK_PINCH: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

static PINCH_SWELL: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (29, 29, 29, 29)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (52, 52, 52, 52)),
    seg!((10, 10, 10, 10), (2, 2, 2, 2)),
    seg!((10, 10, 10, 10), (73, 73, 73, 73)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (87, 87, 87, 87)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
];

static HEARTBEAT: &[PulseSegment] = &[
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (75, 75, 75, 75)),
    seg!((10, 10, 10, 10), (75, 77, 79, 83)),
    seg!((10, 10, 10, 10), (83, 85, 88, 92)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
];

static COMPRESSION: &[PulseSegment] = &[
    seg!((25, 25, 24, 24), (100, 100, 100, 100)),
    seg!((24, 23, 23, 23), (100, 100, 100, 100)),
    seg!((22, 22, 22, 21), (100, 100, 100, 100)),
    seg!((21, 21, 20, 20), (100, 100, 100, 100)),
    seg!((20, 19, 19, 19), (100, 100, 100, 100)),
    seg!((18, 18, 18, 17), (100, 100, 100, 100)),
    seg!((17, 16, 16, 16), (100, 100, 100, 100)),
    seg!((15, 15, 15, 14), (100, 100, 100, 100)),
    seg!((14, 14, 13, 13), (100, 100, 100, 100)),
    seg!((13, 12, 12, 12), (100, 100, 100, 100)),
    seg!((11, 11, 11, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
];

static RHYTHM_STEP: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 5, 10, 20)),
    seg!((10, 10, 10, 10), (20, 25, 30, 40)),
    seg!((10, 10, 10, 10), (40, 45, 50, 60)),
    seg!((10, 10, 10, 10), (60, 65, 70, 80)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 6, 12, 25)),
    seg!((10, 10, 10, 10), (25, 31, 38, 50)),
    seg!((10, 10, 10, 10), (50, 56, 62, 75)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 8, 16, 33)),
    seg!((10, 10, 10, 10), (33, 42, 50, 67)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 12, 25, 50)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
];

static GRANULE_RUB: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
];

static FADE_BOUNCE: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (1, 1, 1, 1)),
    seg!((10, 10, 10, 10), (1, 9, 18, 34)),
    seg!((10, 10, 10, 10), (34, 42, 50, 67)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

static WAVE_RIPPLE: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 12, 25, 50)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (73, 73, 73, 73)),
];

static RAINFALL: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (34, 34, 34, 34)),
    seg!((10, 10, 10, 10), (34, 42, 50, 67)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

static SHIFT_TAP: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((110, 110, 110, 110), (100, 100, 100, 100)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

static SIGNAL_LIGHT: &[PulseSegment] = &[
    seg!((197, 197, 197, 197), (100, 100, 100, 100)),
    seg!((197, 197, 197, 197), (100, 100, 100, 100)),
    seg!((197, 197, 197, 197), (100, 100, 100, 100)),
    seg!((197, 197, 197, 197), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 8, 16, 33)),
    seg!((10, 10, 10, 10), (33, 42, 50, 67)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
];

static TEASE_1: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 6, 12, 25)),
    seg!((10, 10, 10, 10), (25, 31, 38, 50)),
    seg!((10, 10, 10, 10), (50, 56, 62, 75)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
];

static TEASE_2: &[PulseSegment] = &[
    seg!((10, 10, 10, 10), (1, 1, 1, 1)),
    seg!((10, 10, 10, 10), (1, 4, 6, 12)),
    seg!((10, 10, 10, 10), (12, 15, 18, 23)),
    seg!((10, 10, 10, 10), (23, 26, 28, 34)),
    seg!((10, 10, 10, 10), (34, 37, 40, 45)),
    seg!((10, 10, 10, 10), (45, 48, 50, 56)),
    seg!((10, 10, 10, 10), (56, 59, 62, 67)),
    seg!((10, 10, 10, 10), (67, 70, 72, 78)),
    seg!((10, 10, 10, 10), (78, 81, 84, 89)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (100, 100, 100, 100)),
    seg!((10, 10, 10, 10), (0, 0, 0, 0)),
    seg!((0, 0, 0, 0), (0, 0, 0, 0)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size() {
        assert_eq!(CATALOG.len(), 16);
    }

    #[test]
    fn test_long_waveforms_get_three_repeats() {
        let compression = get(6).unwrap();
        assert_eq!(compression.name, "Compression");
        assert!(compression.segments.len() >= LONG_WAVEFORM_THRESHOLD);
        assert_eq!(compression.repeats(), LONG_REPEATS);

        let rhythm = get(7).unwrap();
        assert_eq!(rhythm.name, "Rhythm Step");
        assert_eq!(rhythm.repeats(), LONG_REPEATS);
    }

    #[test]
    fn test_short_waveforms_get_five_repeats() {
        for (index, waveform) in CATALOG.iter().enumerate() {
            if waveform.segments.len() < LONG_WAVEFORM_THRESHOLD {
                assert_eq!(waveform.repeats(), SHORT_REPEATS, "index {index}");
            }
        }
    }

    #[test]
    fn test_repeated_concatenates() {
        let ripple = get(10).unwrap();
        let repeated = ripple.repeated(5);
        assert_eq!(repeated.len(), ripple.segments.len() * 5);
        assert_eq!(repeated[0], ripple.segments[0]);
        assert_eq!(repeated[ripple.segments.len()], ripple.segments[0]);
    }

    #[test]
    fn test_out_of_range_lookup() {
        assert!(get(16).is_none());
        assert!(get(usize::MAX).is_none());
    }

    #[test]
    fn test_intensities_within_range() {
        for waveform in CATALOG {
            for segment in waveform.segments {
                for level in segment.intensity {
                    assert!(level <= 100, "{}: intensity {level}", waveform.name);
                }
            }
        }
    }
}
