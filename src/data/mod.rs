//! Synthetic sample data for the production lines.
//!
//! Values are drawn from `rand_distr::Normal` through an injected random
//! source, so a seeded session reproduces the exact same series.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SpcError, SpcResult};
use crate::logging::{self, obj, v_num, v_str, Domain};
use crate::scrap::ScrapReasonDataset;

// =============================================================================
// Production lines
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionLine {
    #[serde(rename = "Line 1")]
    Line1,
    #[serde(rename = "Line 2")]
    Line2,
    #[serde(rename = "Line 3")]
    Line3,
}

impl ProductionLine {
    pub const ALL: [ProductionLine; 3] = [Self::Line1, Self::Line2, Self::Line3];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Line1 => "Line 1",
            Self::Line2 => "Line 2",
            Self::Line3 => "Line 3",
        }
    }

    /// Accepts the display label ("Line 2") or the compact form ("line2").
    pub fn from_label(s: &str) -> Option<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL
            .into_iter()
            .find(|l| compact.eq_ignore_ascii_case(&l.label().replace(' ', "")))
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Line1 => "LINE1",
            Self::Line2 => "LINE2",
            Self::Line3 => "LINE3",
        }
    }

    pub fn default_profile(&self) -> LineProfile {
        let mean = match self {
            Self::Line1 => 100.0,
            Self::Line2 => 95.0,
            Self::Line3 => 105.0,
        };
        LineProfile { line: *self, mean, std_dev: 5.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineProfile {
    pub line: ProductionLine,
    pub mean: f64,
    pub std_dev: f64,
}

impl LineProfile {
    pub fn validate(&self) -> SpcResult<()> {
        let reason = if !self.mean.is_finite() {
            "mean must be finite"
        } else if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            "std_dev must be finite and non-negative"
        } else {
            return Ok(());
        };
        Err(self.invalid(reason))
    }

    /// N(mean, std_dev) for this line.
    pub fn distribution(&self) -> SpcResult<Normal<f64>> {
        self.validate()?;
        Normal::new(self.mean, self.std_dev).map_err(|e| self.invalid(&e.to_string()))
    }

    fn invalid(&self, reason: &str) -> SpcError {
        SpcError::InvalidProfile {
            line: self.line.label().to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Time series
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronologically ordered samples for one line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<SamplePoint>,
}

impl TimeSeries {
    /// Builds a series from arbitrary points, sorting them by date.
    pub fn from_points(mut points: Vec<SamplePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

// =============================================================================
// Random source
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomSource {
    Seeded(u64),
    Entropy,
}

impl RandomSource {
    pub fn into_rng(self) -> StdRng {
        match self {
            Self::Seeded(seed) => StdRng::seed_from_u64(seed),
            Self::Entropy => StdRng::from_entropy(),
        }
    }
}

/// `n` daily samples ending at `end`, each drawn from `dist`.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, dist: &Normal<f64>, n: usize, end: NaiveDate) -> TimeSeries {
    let points = (0..n)
        .map(|i| SamplePoint {
            date: end - Duration::days((n - 1 - i) as i64),
            value: dist.sample(rng),
        })
        .collect();
    TimeSeries { points }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// =============================================================================
// Session data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineData {
    pub profile: LineProfile,
    pub series: TimeSeries,
}

/// Everything a dashboard session renders from, built once at session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionData {
    pub lines: Vec<LineData>,
    pub scrap: ScrapReasonDataset,
}

impl SessionData {
    pub fn line(&self, line: ProductionLine) -> Option<&LineData> {
        self.lines.iter().find(|d| d.profile.line == line)
    }

    /// SHA-256 over every date and value bit pattern, for comparing seeded runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for data in &self.lines {
            hasher.update(data.profile.line.label().as_bytes());
            for p in data.series.points() {
                hasher.update(p.date.to_string().as_bytes());
                hasher.update(p.value.to_bits().to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Generates one series per profile from a single random stream, in profile order.
pub fn generate_session(
    profiles: &[LineProfile],
    n: usize,
    source: RandomSource,
    end: NaiveDate,
    scrap: ScrapReasonDataset,
) -> SpcResult<SessionData> {
    let mut rng = source.into_rng();
    let mut lines = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let dist = profile.distribution()?;
        let series = generate(&mut rng, &dist, n, end);
        logging::debug(
            Domain::Data,
            "series_generated",
            obj(&[
                ("line", v_str(profile.line.label())),
                ("points", v_num(series.len() as f64)),
                ("mean_target", v_num(profile.mean)),
                ("std_target", v_num(profile.std_dev)),
            ]),
        );
        lines.push(LineData { profile: *profile, series });
    }
    Ok(SessionData { lines, scrap })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn normal(mean: f64, std_dev: f64) -> Normal<f64> {
        Normal::new(mean, std_dev).unwrap()
    }

    fn profiles() -> Vec<LineProfile> {
        ProductionLine::ALL.iter().map(|l| l.default_profile()).collect()
    }

    #[test]
    fn test_generate_length_and_order() {
        let mut rng = RandomSource::Seeded(1).into_rng();
        for n in [1usize, 2, 30, 365] {
            let s = generate(&mut rng, &normal(100.0, 5.0), n, end());
            assert_eq!(s.len(), n);
            assert!(s.points().windows(2).all(|w| w[0].date < w[1].date));
            assert_eq!(s.last_date(), Some(end()));
        }
    }

    #[test]
    fn test_dates_are_consecutive_days() {
        let mut rng = RandomSource::Seeded(2).into_rng();
        let s = generate(&mut rng, &normal(0.0, 1.0), 30, end());
        assert_eq!(s.first_date(), Some(end() - Duration::days(29)));
        assert!(s
            .points()
            .windows(2)
            .all(|w| w[1].date - w[0].date == Duration::days(1)));
        // 2024 is a leap year
        assert!(s.dates().any(|d| d == NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = generate(&mut RandomSource::Seeded(42).into_rng(), &normal(95.0, 5.0), 30, end());
        let b = generate(&mut RandomSource::Seeded(42).into_rng(), &normal(95.0, 5.0), 30, end());
        let c = generate(&mut RandomSource::Seeded(43).into_rng(), &normal(95.0, 5.0), 30, end());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_std_is_constant() {
        let s = generate(&mut RandomSource::Seeded(3).into_rng(), &normal(12.5, 0.0), 10, end());
        assert!(s.values().all(|v| v == 12.5));
    }

    #[test]
    fn test_generated_moments() {
        let mut rng = RandomSource::Seeded(9).into_rng();
        let n = 20_000;
        let s = generate(&mut rng, &normal(95.0, 5.0), n, end());
        let mean = s.values().sum::<f64>() / n as f64;
        let var = s.values().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 95.0).abs() < 0.25, "mean was {}", mean);
        assert!((var.sqrt() - 5.0).abs() < 0.25, "std was {}", var.sqrt());
        assert!(s.values().all(|x| x.is_finite()));
    }

    #[test]
    fn test_line_labels() {
        assert_eq!(ProductionLine::from_label("Line 2"), Some(ProductionLine::Line2));
        assert_eq!(ProductionLine::from_label("line3"), Some(ProductionLine::Line3));
        assert_eq!(ProductionLine::from_label("Line 4"), None);
        assert_eq!(ProductionLine::from_label(""), None);
        for l in ProductionLine::ALL {
            assert_eq!(ProductionLine::from_label(l.label()), Some(l));
        }
    }

    #[test]
    fn test_session_fingerprint_tracks_seed() {
        let s1 = generate_session(&profiles(), 30, RandomSource::Seeded(5), end(), ScrapReasonDataset::default()).unwrap();
        let s2 = generate_session(&profiles(), 30, RandomSource::Seeded(5), end(), ScrapReasonDataset::default()).unwrap();
        let s3 = generate_session(&profiles(), 30, RandomSource::Seeded(6), end(), ScrapReasonDataset::default()).unwrap();
        assert_eq!(s1.fingerprint(), s2.fingerprint());
        assert_ne!(s1.fingerprint(), s3.fingerprint());
        assert_eq!(s1.fingerprint().len(), 64);
        assert_eq!(s1.lines.len(), 3);
        assert!(s1.lines.iter().all(|d| d.series.len() == 30));
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let bad = vec![LineProfile { line: ProductionLine::Line1, mean: f64::NAN, std_dev: 5.0 }];
        let err = generate_session(&bad, 30, RandomSource::Seeded(1), end(), ScrapReasonDataset::default()).unwrap_err();
        assert!(matches!(err, SpcError::InvalidProfile { .. }));

        let neg = LineProfile { line: ProductionLine::Line2, mean: 1.0, std_dev: -1.0 };
        assert!(neg.validate().is_err());
        assert!(matches!(neg.distribution(), Err(SpcError::InvalidProfile { .. })));
        let inf = LineProfile { line: ProductionLine::Line3, mean: 1.0, std_dev: f64::INFINITY };
        assert!(inf.distribution().is_err());
        assert!(ProductionLine::Line1.default_profile().distribution().is_ok());
    }
}
