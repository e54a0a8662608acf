//! Colour assignment.
//!
//! Two independent jobs: give every plotted series a display colour from
//! its variant's colour family, and classify table cells into threshold
//! bands with fixed fill colours.

use crate::models::{Band, Rgba, SeriesRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sequential colour ramp from light (intensity 0) to dark (intensity 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFamily {
    Blues,
    Oranges,
    Greens,
    Reds,
    Purples,
    YlOrBr,
    Greys,
}

impl ColorFamily {
    /// Light, middle and dark stops of the ramp.
    fn stops(&self) -> [Rgba; 3] {
        let (light, mid, dark) = match self {
            ColorFamily::Blues => ((0xf7, 0xfb, 0xff), (0x6b, 0xae, 0xd6), (0x08, 0x30, 0x6b)),
            ColorFamily::Oranges => ((0xff, 0xf5, 0xeb), (0xfd, 0x8d, 0x3c), (0x7f, 0x27, 0x04)),
            ColorFamily::Greens => ((0xf7, 0xfc, 0xf5), (0x74, 0xc4, 0x76), (0x00, 0x44, 0x1b)),
            ColorFamily::Reds => ((0xff, 0xf5, 0xf0), (0xfb, 0x6a, 0x4a), (0x67, 0x00, 0x0d)),
            ColorFamily::Purples => ((0xfc, 0xfb, 0xfd), (0x9e, 0x9a, 0xc8), (0x3f, 0x00, 0x7d)),
            ColorFamily::YlOrBr => ((0xff, 0xff, 0xe5), (0xfe, 0x99, 0x29), (0x66, 0x25, 0x06)),
            ColorFamily::Greys => ((0xff, 0xff, 0xff), (0x96, 0x96, 0x96), (0x00, 0x00, 0x00)),
        };
        let rgb = |(r, g, b): (u8, u8, u8)| Rgba::from_rgb8(r, g, b);
        [rgb(light), rgb(mid), rgb(dark)]
    }

    /// Colour at `intensity` (clamped to `0.0..=1.0`).
    pub fn at(&self, intensity: f64) -> Rgba {
        let t = intensity.clamp(0.0, 1.0);
        let [light, mid, dark] = self.stops();
        if t <= 0.5 {
            light.lerp(&mid, t * 2.0)
        } else {
            mid.lerp(&dark, (t - 0.5) * 2.0)
        }
    }
}

/// Ordered variant → colour family registry with a neutral fallback.
///
/// Registry order is also the canonical column order of summary tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<(String, ColorFamily)>,
    fallback: ColorFamily,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            [
                ("3M62006035", ColorFamily::Blues),
                ("3M6200P100", ColorFamily::Oranges),
                ("EMProML", ColorFamily::Greens),
                ("EMProS", ColorFamily::Reds),
                ("FFP3", ColorFamily::Purples),
                ("Versaflo", ColorFamily::YlOrBr),
            ]
            .into_iter()
            .map(|(name, family)| (name.to_string(), family))
            .collect(),
        )
    }
}

impl Palette {
    /// Build a palette; unknown variants fall back to greys.
    pub fn new(entries: Vec<(String, ColorFamily)>) -> Self {
        Self {
            entries,
            fallback: ColorFamily::Greys,
        }
    }

    /// Registered variants in canonical order.
    pub fn entries(&self) -> &[(String, ColorFamily)] {
        &self.entries
    }

    pub fn family_for(&self, variant: &str) -> ColorFamily {
        self.entries
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(_, family)| *family)
            .unwrap_or(self.fallback)
    }

    /// Canonical position of a known variant.
    pub fn rank(&self, variant: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == variant)
    }

    /// Sort variants: known ones by registry order, then unknown ones
    /// lexicographically.
    pub fn sort_variants(&self, variants: impl IntoIterator<Item = String>) -> Vec<String> {
        let mut variants: Vec<String> = variants.into_iter().collect();
        variants.sort_by(|a, b| match (self.rank(a), self.rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        variants.dedup();
        variants
    }
}

/// Brightness range used to tell same-variant series apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadeRange {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Default for ShadeRange {
    fn default() -> Self {
        Self {
            low: 0.3,
            mid: 0.6,
            high: 0.9,
        }
    }
}

impl ShadeRange {
    /// Intensity of the `k`-th of `n` same-variant series.
    ///
    /// A lone series sits at `mid`; otherwise the first and last sit
    /// exactly on `low` and `high` with the rest evenly spaced between.
    pub fn intensity(&self, k: usize, n: usize) -> f64 {
        if n <= 1 {
            return self.mid;
        }
        let t = k as f64 / (n - 1) as f64;
        self.low * (1.0 - t) + self.high * t
    }
}

/// Fit factor thresholds separating the bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: 100.0,
            high: 1000.0,
        }
    }
}

impl Thresholds {
    /// Band for a cell value; `None` means the cell has no data.
    pub fn classify(&self, value: Option<f64>) -> Band {
        match value {
            None => Band::NoData,
            Some(v) if v >= self.high => Band::Pass,
            Some(v) if v < self.low => Band::Fail,
            Some(_) => Band::Borderline,
        }
    }
}

impl Band {
    /// Table fill colour for this band.
    pub fn fill(&self) -> Rgba {
        match self {
            Band::Pass => Rgba::new(0.80, 1.00, 0.80, 1.0),
            Band::Borderline => Rgba::new(1.00, 1.00, 0.70, 1.0),
            Band::Fail => Rgba::new(1.00, 0.80, 0.80, 1.0),
            Band::NoData => Rgba::TRANSPARENT,
        }
    }
}

/// Readable text colour on `fill`; `None` for transparent fills.
pub fn text_color(fill: &Rgba) -> Option<Rgba> {
    if fill.is_transparent() {
        None
    } else if fill.brightness() > 0.5 {
        Some(Rgba::BLACK)
    } else {
        Some(Rgba::WHITE)
    }
}

/// Read-only colour configuration, built once and passed to the engine.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    palette: Palette,
    shades: ShadeRange,
    thresholds: Thresholds,
}

impl ColorAssigner {
    pub fn new(palette: Palette, shades: ShadeRange, thresholds: Thresholds) -> Self {
        Self {
            palette,
            shades,
            thresholds,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Colour and shade for each record of one exercise group, in order.
    ///
    /// Occurrence indices count per variant in the order records appear.
    pub fn assign_series(&self, records: &[SeriesRecord]) -> Vec<(Rgba, f64)> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *totals.entry(record.key.variant.as_str()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        records
            .iter()
            .map(|record| {
                let variant = record.key.variant.as_str();
                let n = totals.get(variant).copied().unwrap_or(1);
                let k = seen.entry(variant).or_default();
                let shade = self.shades.intensity(*k, n);
                *k += 1;
                (self.palette.family_for(variant).at(shade), shade)
            })
            .collect()
    }

    /// Legend swatch for a variant (its family at mid intensity).
    pub fn legend_swatch(&self, variant: &str) -> Rgba {
        self.palette.family_for(variant).at(self.shades.mid)
    }

    pub fn band_for(&self, value: Option<f64>) -> Band {
        self.thresholds.classify(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CleanedSeries, TrialKey};

    fn record(subject: &str, variant: &str) -> SeriesRecord {
        SeriesRecord {
            key: TrialKey::new(subject, variant, "Cough"),
            series: CleanedSeries::from_absolute(vec![(0, 1.0)]).unwrap(),
            mean: 1.0,
            geometric_mean: 1.0,
        }
    }

    #[test]
    fn test_single_series_gets_mid() {
        let shades = ShadeRange::default();
        assert_eq!(shades.intensity(0, 1), 0.6);
    }

    #[test]
    fn test_shade_bounds_and_distinct() {
        let shades = ShadeRange::default();
        for n in 2..=25 {
            let values: Vec<f64> = (0..n).map(|k| shades.intensity(k, n)).collect();
            assert_eq!(values[0], shades.low, "n={}", n);
            assert_eq!(values[n - 1], shades.high, "n={}", n);
            for pair in values.windows(2) {
                assert!(pair[0] < pair[1], "n={} not strictly increasing", n);
            }
        }
    }

    #[test]
    fn test_three_series_evenly_spaced() {
        let shades = ShadeRange::default();
        assert!((shades.intensity(1, 3) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_assign_series_per_variant_indices() {
        let assigner = ColorAssigner::default();
        let records = vec![
            record("Alice", "FFP3"),
            record("Alice", "EMProS"),
            record("Bob", "FFP3"),
            record("Carol", "FFP3"),
        ];
        let assigned = assigner.assign_series(&records);
        let shades: Vec<f64> = assigned.iter().map(|(_, s)| *s).collect();

        assert_eq!(shades[0], 0.3);
        assert_eq!(shades[1], 0.6);
        assert!((shades[2] - 0.6).abs() < 1e-12);
        assert_eq!(shades[3], 0.9);

        // Same family, distinct colours
        assert_ne!(assigned[0].0, assigned[2].0);
        assert_ne!(assigned[2].0, assigned[3].0);
        assert_eq!(assigned[0].0, ColorFamily::Purples.at(0.3));
        assert_eq!(assigned[1].0, ColorFamily::Reds.at(0.6));
    }

    #[test]
    fn test_unknown_variant_uses_greys() {
        let assigner = ColorAssigner::default();
        let assigned = assigner.assign_series(&[record("Alice", "Mystery")]);
        assert_eq!(assigned[0].0, ColorFamily::Greys.at(0.6));
        assert_eq!(assigner.legend_swatch("Mystery"), ColorFamily::Greys.at(0.6));
    }

    #[test]
    fn test_family_ramp_endpoints() {
        assert_eq!(ColorFamily::Blues.at(0.0).to_hex(), "#f7fbff");
        assert_eq!(ColorFamily::Blues.at(0.5).to_hex(), "#6baed6");
        assert_eq!(ColorFamily::Blues.at(1.0).to_hex(), "#08306b");
        assert_eq!(ColorFamily::Greys.at(2.0), ColorFamily::Greys.at(1.0));
    }

    #[test]
    fn test_family_colors_darken() {
        for family in [
            ColorFamily::Blues,
            ColorFamily::Oranges,
            ColorFamily::Greens,
            ColorFamily::Reds,
            ColorFamily::Purples,
            ColorFamily::YlOrBr,
            ColorFamily::Greys,
        ] {
            assert!(family.at(0.3).brightness() > family.at(0.6).brightness());
            assert!(family.at(0.6).brightness() > family.at(0.9).brightness());
        }
    }

    #[test]
    fn test_palette_sort_variants() {
        let palette = Palette::default();
        let sorted = palette.sort_variants(
            ["Zeta", "FFP3", "Alpha", "3M62006035", "EMProS"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(sorted, vec!["3M62006035", "EMProS", "FFP3", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_thresholds_partition() {
        let t = Thresholds::default();
        assert_eq!(t.classify(None), Band::NoData);
        assert_eq!(t.classify(Some(0.5)), Band::Fail);
        assert_eq!(t.classify(Some(99.999)), Band::Fail);
        assert_eq!(t.classify(Some(100.0)), Band::Borderline);
        assert_eq!(t.classify(Some(999.9)), Band::Borderline);
        assert_eq!(t.classify(Some(1000.0)), Band::Pass);
        assert_eq!(t.classify(Some(1e9)), Band::Pass);
    }

    #[test]
    fn test_band_fill_and_text_color() {
        assert!(Band::NoData.fill().is_transparent());
        assert_eq!(text_color(&Band::NoData.fill()), None);
        for band in [Band::Pass, Band::Borderline, Band::Fail] {
            assert_eq!(text_color(&band.fill()), Some(Rgba::BLACK));
        }
        assert_eq!(
            text_color(&ColorFamily::Blues.at(1.0)),
            Some(Rgba::WHITE)
        );
    }
}
