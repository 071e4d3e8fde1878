//! Session controller: selection state plus the views derived from it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::chart::{self, ChartSpec};
use crate::data::{ProductionLine, SessionData};
use crate::error::{SpcError, SpcResult};
use crate::logging::{self, obj, v_str, Domain};
use crate::stats::{self, SpcSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Swaps the bounds when they arrive reversed.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub active_line: ProductionLine,
    pub date_range: DateRange,
}

/// The two numeric readouts of the drill-down section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReadout {
    pub line: ProductionLine,
    pub average: String,
    pub std_dev: String,
}

impl MetricReadout {
    fn from_summary(line: ProductionLine, summary: &SpcResult<SpcSummary>) -> Self {
        match summary {
            Ok(s) => Self {
                line,
                average: format!("{:.2}", s.mean),
                std_dev: format!("{:.2}", s.std_dev),
            },
            Err(_) => Self {
                line,
                average: "n/a".to_string(),
                std_dev: "n/a".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub line: ProductionLine,
    pub summary: Option<SpcSummary>,
    pub chart: ChartSpec,
}

/// Everything the page needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selection: Selection,
    pub line_charts: Vec<LineChart>,
    pub scrap_chart: ChartSpec,
    pub metrics: MetricReadout,
}

pub struct DashboardController {
    data: SessionData,
    selection: Selection,
    metrics: MetricReadout,
}

impl DashboardController {
    /// Starts on Line 1 with the date range spanning Line 1's series.
    pub fn new(data: SessionData) -> Self {
        let active_line = ProductionLine::Line1;
        let fallback = crate::data::today();
        let (start, end) = data
            .line(active_line)
            .map(|d| {
                (
                    d.series.first_date().unwrap_or(fallback),
                    d.series.last_date().unwrap_or(fallback),
                )
            })
            .unwrap_or((fallback, fallback));
        let selection = Selection {
            active_line,
            date_range: DateRange::new(start, end),
        };
        let metrics = MetricReadout::from_summary(active_line, &summary_for(&data, active_line));
        Self { data, selection, metrics }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn metrics(&self) -> &MetricReadout {
        &self.metrics
    }

    /// Recomputes the readouts for `line` only.
    pub fn on_line_selected(&mut self, line: ProductionLine) {
        self.selection.active_line = line;
        let summary = summary_for(&self.data, line);
        if let Err(err) = &summary {
            logging::warn(
                Domain::Stats,
                "summary_unavailable",
                obj(&[("line", v_str(line.label())), ("error", v_str(&err.to_string()))]),
            );
        }
        self.metrics = MetricReadout::from_summary(line, &summary);
        logging::info(
            Domain::Session,
            "line_selected",
            obj(&[
                ("line", v_str(line.label())),
                ("average", v_str(&self.metrics.average)),
                ("std_dev", v_str(&self.metrics.std_dev)),
            ]),
        );
    }

    /// Stores the range. No series is filtered by it.
    pub fn on_date_range_changed(&mut self, range: DateRange) {
        self.selection.date_range = range;
        logging::info(
            Domain::Session,
            "date_range_changed",
            obj(&[
                ("start", v_str(&range.start.to_string())),
                ("end", v_str(&range.end.to_string())),
                ("filtering", v_str("inactive")),
            ]),
        );
    }

    pub fn control_charts(&self) -> Vec<LineChart> {
        let _scope = logging::ProfileScope::new("control_charts");
        ProductionLine::ALL
            .iter()
            .map(|&line| {
                let title = chart::control_chart_title(line.label());
                let summary = summary_for(&self.data, line);
                let chart = match (&summary, self.data.line(line)) {
                    (Ok(s), Some(d)) => chart::render_control_chart(&d.series, s, line.label()),
                    (Err(err), _) => chart::placeholder(&title, &err.to_string()),
                    (Ok(_), None) => chart::placeholder(&title, "No data for this line"),
                };
                LineChart { line, summary: summary.ok(), chart }
            })
            .collect()
    }

    pub fn scrap_chart(&self) -> ChartSpec {
        chart::render_scrap_bar_chart(self.data.scrap.reasons())
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            selection: self.selection,
            line_charts: self.control_charts(),
            scrap_chart: self.scrap_chart(),
            metrics: self.metrics.clone(),
        }
    }
}

fn summary_for(data: &SessionData, line: ProductionLine) -> SpcResult<SpcSummary> {
    match data.line(line) {
        Some(d) => stats::summarize(&d.series),
        None => Err(SpcError::InvalidInput(format!("no series for {}", line.label()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_session, LineData, RandomSource, TimeSeries};
    use crate::scrap::ScrapReasonDataset;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    fn session(seed: u64) -> SessionData {
        let profiles: Vec<_> = ProductionLine::ALL.iter().map(|l| l.default_profile()).collect();
        generate_session(&profiles, 30, RandomSource::Seeded(seed), end(), ScrapReasonDataset::default()).unwrap()
    }

    #[test]
    fn test_initial_selection() {
        let c = DashboardController::new(session(1));
        let sel = c.selection();
        assert_eq!(sel.active_line, ProductionLine::Line1);
        assert_eq!(sel.date_range.end, end());
        assert_eq!(sel.date_range.start, end() - chrono::Duration::days(29));
        assert_eq!(c.metrics().line, ProductionLine::Line1);
    }

    #[test]
    fn test_select_line2_metrics() {
        let mut c = DashboardController::new(session(1234));
        c.on_line_selected(ProductionLine::Line2);
        let expected = stats::summarize(&c.data().line(ProductionLine::Line2).unwrap().series).unwrap();
        assert_eq!(c.metrics().line, ProductionLine::Line2);
        assert_eq!(c.metrics().average, format!("{:.2}", expected.mean));
        assert_eq!(c.metrics().std_dev, format!("{:.2}", expected.std_dev));
        let avg: f64 = c.metrics().average.parse().unwrap();
        // 30 samples with sd 5: standard error is under 1
        assert!((avg - 95.0).abs() < 4.0, "average was {}", avg);
        assert_eq!(c.metrics().average.split('.').nth(1).unwrap().len(), 2);
    }

    #[test]
    fn test_selection_is_reproducible_with_seed() {
        let mut a = DashboardController::new(session(77));
        let mut b = DashboardController::new(session(77));
        a.on_line_selected(ProductionLine::Line3);
        b.on_line_selected(ProductionLine::Line3);
        assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn test_date_range_does_not_change_charts() {
        let mut c = DashboardController::new(session(5));
        let before = c.control_charts();
        let scrap_before = c.scrap_chart();
        c.on_date_range_changed(DateRange::new(end() - chrono::Duration::days(3), end()));
        assert_eq!(c.selection().date_range.start, end() - chrono::Duration::days(3));
        assert_eq!(c.control_charts(), before);
        assert_eq!(c.scrap_chart(), scrap_before);
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let r = DateRange::new(end(), end() - chrono::Duration::days(5));
        assert!(r.start < r.end);
    }

    #[test]
    fn test_line_selection_leaves_charts_alone() {
        let mut c = DashboardController::new(session(8));
        let before = c.control_charts();
        c.on_line_selected(ProductionLine::Line3);
        assert_eq!(c.control_charts(), before);
    }

    #[test]
    fn test_empty_series_falls_back() {
        let mut data = session(9);
        data.lines[1] = LineData {
            profile: data.lines[1].profile,
            series: TimeSeries::default(),
        };
        let mut c = DashboardController::new(data);
        c.on_line_selected(ProductionLine::Line2);
        assert_eq!(c.metrics().average, "n/a");
        let charts = c.control_charts();
        assert!(charts[1].chart.is_placeholder());
        assert!(charts[1].summary.is_none());
        assert!(!charts[0].chart.is_placeholder());
    }

    #[test]
    fn test_view_has_three_tabs_and_bar_chart() {
        let v = DashboardController::new(session(10)).view();
        let lines: Vec<_> = v.line_charts.iter().map(|c| c.line).collect();
        assert_eq!(lines, ProductionLine::ALL.to_vec());
        assert_eq!(v.scrap_chart.bar_labels().first(), Some(&"Other"));
        assert_eq!(v.scrap_chart.bar_labels().last(), Some(&"Material Defect"));
    }
}
