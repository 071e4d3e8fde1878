//! Chart specs: a renderer-neutral description of each figure, plus the
//! conversion into a Plotly `{data, layout}` object for the browser.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::data::TimeSeries;
use crate::scrap::ScrapReason;
use crate::stats::{self, SpcSummary};

pub const BAR_FILL: &str = "rgb(158,202,225)";
pub const BAR_BORDER: &str = "rgb(8,48,107)";
pub const BAR_BORDER_WIDTH: f64 = 1.5;
pub const BAR_OPACITY: f64 = 0.6;
pub const LIMIT_COLOR: &str = "red";
pub const SCRAP_TITLE: &str = "Percentage Breakdown of Top Scrap Reasons";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDash {
    Solid,
    Dash,
    Dot,
}

impl LineDash {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dash => "dash",
            Self::Dot => "dot",
        }
    }
}

/// Horizontal line across the full x range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub label: String,
    pub y: f64,
    pub dash: LineDash,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
    pub mode: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub fill: String,
    pub border: String,
    pub border_width: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Line(LineTrace),
    Bar(BarTrace),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub hover_mode: Option<String>,
    pub y_category_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub traces: Vec<Trace>,
    pub reference_lines: Vec<ReferenceLine>,
    pub layout: Layout,
    /// Set only on placeholder charts.
    pub message: Option<String>,
}

impl ChartSpec {
    pub fn is_placeholder(&self) -> bool {
        self.message.is_some()
    }

    pub fn reference_line(&self, label: &str) -> Option<&ReferenceLine> {
        self.reference_lines.iter().find(|r| r.label == label)
    }

    /// Bar labels bottom to top.
    pub fn bar_labels(&self) -> Vec<&str> {
        self.traces
            .iter()
            .filter_map(|t| match t {
                Trace::Bar(b) => Some(b.labels.iter().map(String::as_str)),
                Trace::Line(_) => None,
            })
            .flatten()
            .collect()
    }

    pub fn to_plotly(&self) -> Value {
        let data: Vec<Value> = self.traces.iter().map(trace_json).collect();

        let mut shapes = Vec::new();
        let mut annotations = Vec::new();
        for r in &self.reference_lines {
            shapes.push(json!({
                "type": "line", "xref": "paper", "x0": 0, "x1": 1,
                "y0": r.y, "y1": r.y,
                "line": {"dash": r.dash.as_str(), "color": r.color},
            }));
            annotations.push(json!({
                "xref": "paper", "x": 1, "y": r.y, "text": r.label,
                "showarrow": false, "xanchor": "right", "yanchor": "bottom",
            }));
        }
        if let Some(msg) = &self.message {
            annotations.push(json!({
                "xref": "paper", "yref": "paper", "x": 0.5, "y": 0.5,
                "text": msg, "showarrow": false,
            }));
        }

        let mut layout = json!({
            "title": {"text": self.title},
            "shapes": shapes,
            "annotations": annotations,
        });
        if let Some(t) = &self.layout.x_title {
            layout["xaxis"] = json!({"title": {"text": t}});
        }
        if let Some(t) = &self.layout.y_title {
            layout["yaxis"] = json!({"title": {"text": t}});
        }
        if let Some(order) = &self.layout.y_category_order {
            layout["yaxis"]["categoryorder"] = json!(order);
        }
        if let Some(mode) = &self.layout.hover_mode {
            layout["hovermode"] = json!(mode);
        }
        if self.is_placeholder() {
            layout["xaxis"] = json!({"visible": false});
            layout["yaxis"] = json!({"visible": false});
        }
        json!({"data": data, "layout": layout})
    }
}

fn trace_json(trace: &Trace) -> Value {
    match trace {
        Trace::Line(t) => {
            let x: Vec<String> = t.x.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
            let mut v = json!({
                "type": "scatter", "name": t.name, "mode": t.mode, "x": x, "y": t.y,
            });
            if let Some(c) = &t.color {
                v["marker"] = json!({"color": c, "size": 10});
            }
            v
        }
        Trace::Bar(b) => json!({
            "type": "bar", "orientation": "h",
            "x": b.values, "y": b.labels,
            "marker": {
                "color": b.fill,
                "line": {"color": b.border, "width": b.border_width},
            },
            "opacity": b.opacity,
        }),
    }
}

/// Chart with no data that shows `message` in its plot area.
pub fn placeholder(title: &str, message: &str) -> ChartSpec {
    ChartSpec {
        title: title.to_string(),
        traces: Vec::new(),
        reference_lines: Vec::new(),
        layout: Layout::default(),
        message: Some(message.to_string()),
    }
}

pub fn control_chart_title(label: &str) -> String {
    format!("SPC Chart - {}", label)
}

/// Lines-and-markers chart of the series with Mean, UCL and LCL reference lines.
/// Points outside the limits get their own highlighted marker trace.
pub fn render_control_chart(series: &TimeSeries, summary: &SpcSummary, label: &str) -> ChartSpec {
    let title = control_chart_title(label);
    if series.is_empty() {
        return placeholder(&title, "No data for this line");
    }

    let mut traces = vec![Trace::Line(LineTrace {
        name: label.to_string(),
        x: series.dates().collect(),
        y: series.values().collect(),
        mode: "lines+markers".to_string(),
        color: None,
    })];
    let flagged = stats::out_of_control(series, summary);
    if !flagged.is_empty() {
        traces.push(Trace::Line(LineTrace {
            name: "Out of control".to_string(),
            x: flagged.iter().map(|p| p.date).collect(),
            y: flagged.iter().map(|p| p.value).collect(),
            mode: "markers".to_string(),
            color: Some(LIMIT_COLOR.to_string()),
        }));
    }

    let reference = |label: &str, y: f64, dash: LineDash| ReferenceLine {
        label: label.to_string(),
        y,
        dash,
        color: LIMIT_COLOR.to_string(),
    };
    ChartSpec {
        title,
        traces,
        reference_lines: vec![
            reference("Mean", summary.mean, LineDash::Dash),
            reference("UCL", summary.upper_control_limit, LineDash::Dot),
            reference("LCL", summary.lower_control_limit, LineDash::Dot),
        ],
        layout: Layout {
            x_title: Some("Date".to_string()),
            y_title: Some("Value".to_string()),
            hover_mode: Some("x unified".to_string()),
            y_category_order: None,
        },
        message: None,
    }
}

/// Horizontal bars sorted ascending by percentage, so the largest reason
/// ends up on top.
pub fn render_scrap_bar_chart(reasons: &[ScrapReason]) -> ChartSpec {
    if reasons.is_empty() {
        return placeholder(SCRAP_TITLE, "No scrap reasons recorded");
    }

    let mut sorted: Vec<&ScrapReason> = reasons.iter().collect();
    // stable sort keeps input order for equal percentages
    sorted.sort_by(|a, b| a.percentage.total_cmp(&b.percentage));

    ChartSpec {
        title: SCRAP_TITLE.to_string(),
        traces: vec![Trace::Bar(BarTrace {
            labels: sorted.iter().map(|r| r.label.clone()).collect(),
            values: sorted.iter().map(|r| r.percentage).collect(),
            fill: BAR_FILL.to_string(),
            border: BAR_BORDER.to_string(),
            border_width: BAR_BORDER_WIDTH,
            opacity: BAR_OPACITY,
        })],
        reference_lines: Vec::new(),
        layout: Layout {
            x_title: Some("Percentage".to_string()),
            y_title: Some("Reason".to_string()),
            hover_mode: None,
            y_category_order: Some("total ascending".to_string()),
        },
        message: None,
    }
}
