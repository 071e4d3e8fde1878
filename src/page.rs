//! HTML page assembly. Figures are embedded as Plotly JSON and drawn
//! client-side; every interaction is a plain GET back to `/`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::DashboardConfig;
use crate::dashboard::DashboardView;
use crate::data::ProductionLine;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// Escapes the five HTML-significant characters for text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON safe to inline inside a `<script>` element.
fn script_json(v: &Value) -> String {
    v.to_string().replace("</", "<\\/")
}

fn tab_id(line: ProductionLine) -> &'static str {
    match line {
        ProductionLine::Line1 => "line1",
        ProductionLine::Line2 => "line2",
        ProductionLine::Line3 => "line3",
    }
}

pub fn render_page(cfg: &DashboardConfig, view: &DashboardView) -> String {
    let title = escape_html(&cfg.page_title);
    let max_width = if cfg.wide_layout { "none" } else { "960px" };
    let sel = &view.selection;
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; }}
aside {{ width: 240px; padding: 1rem; background: #f0f2f6; min-height: 100vh; }}
main {{ flex: 1; padding: 1rem 2rem; max-width: {max_width}; }}
.tabs button {{ border: none; background: none; padding: .5rem 1rem; cursor: pointer; }}
.tabs button.active {{ border-bottom: 2px solid #ff4b4b; }}
.tab {{ display: none; }}
.tab.active {{ display: block; }}
.metrics {{ display: flex; gap: 2rem; }}
.metric .value {{ font-size: 2rem; }}
</style>
</head>
<body>
<aside>
<h2>Filters</h2>
<form method="get" action="/">
<label>Select Date Range</label><br>
<input type="hidden" name="line" value="{line}">
<input type="date" name="start" value="{start}">
<input type="date" name="end" value="{end}">
<button type="submit">Apply</button>
</form>
</aside>
<main>
<h1>{title}</h1>
<h2>Statistical Process Control</h2>
<div class="tabs">
"#,
        line = escape_html(sel.active_line.label()),
        start = sel.date_range.start.format("%Y-%m-%d"),
        end = sel.date_range.end.format("%Y-%m-%d"),
    );

    for (i, lc) in view.line_charts.iter().enumerate() {
        let active = if i == 0 { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            r#"<button{active} data-tab="{id}">{label}</button>"#,
            id = tab_id(lc.line),
            label = escape_html(lc.line.label()),
        );
    }
    html.push_str("</div>\n");
    for (i, lc) in view.line_charts.iter().enumerate() {
        let active = if i == 0 { " active" } else { "" };
        let _ = writeln!(
            html,
            r#"<div class="tab{active}" id="tab-{id}"><div id="chart-{id}"></div></div>"#,
            id = tab_id(lc.line),
        );
    }

    html.push_str("<h2>Top Scrap Reasons</h2>\n<div id=\"chart-scrap\"></div>\n");

    html.push_str("<h2>Drill Down Analysis</h2>\n<form method=\"get\" action=\"/\">\n");
    html.push_str("<label for=\"line\">Select Production Line</label>\n");
    let _ = writeln!(
        html,
        r#"<input type="hidden" name="start" value="{}"><input type="hidden" name="end" value="{}">"#,
        sel.date_range.start.format("%Y-%m-%d"),
        sel.date_range.end.format("%Y-%m-%d"),
    );
    html.push_str("<select id=\"line\" name=\"line\" onchange=\"this.form.submit()\">\n");
    for line in ProductionLine::ALL {
        let selected = if line == sel.active_line { " selected" } else { "" };
        let label = escape_html(line.label());
        let _ = writeln!(html, r#"<option value="{label}"{selected}>{label}</option>"#);
    }
    html.push_str("</select>\n</form>\n");

    let _ = write!(
        html,
        r#"<div class="metrics">
<div class="metric"><div>Average Value</div><div class="value" id="metric-average">{avg}</div></div>
<div class="metric"><div>Standard Deviation</div><div class="value" id="metric-std">{std}</div></div>
</div>
</main>
<script>
const figures = {{
"#,
        avg = escape_html(&view.metrics.average),
        std = escape_html(&view.metrics.std_dev),
    );
    for lc in &view.line_charts {
        let _ = writeln!(html, "\"chart-{}\": {},", tab_id(lc.line), script_json(&lc.chart.to_plotly()));
    }
    let _ = writeln!(html, "\"chart-scrap\": {}", script_json(&view.scrap_chart.to_plotly()));
    html.push_str(
        r#"};
for (const [id, fig] of Object.entries(figures)) {
  Plotly.newPlot(id, fig.data, fig.layout, {responsive: true});
}
document.querySelectorAll('.tabs button').forEach(btn => btn.addEventListener('click', () => {
  document.querySelectorAll('.tabs button, .tab').forEach(el => el.classList.remove('active'));
  btn.classList.add('active');
  document.getElementById('tab-' + btn.dataset.tab).classList.add('active');
  Plotly.Plots.resize('chart-' + btn.dataset.tab);
}));
</script>
</body>
</html>
"#,
    );
    html
}

/// Writes the rendered page, creating parent directories as needed.
pub fn export(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashboardController;
    use crate::data::{generate_session, RandomSource};
    use crate::scrap::ScrapReasonDataset;
    use chrono::NaiveDate;

    fn controller() -> DashboardController {
        let cfg = DashboardConfig::default();
        let end = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let data = generate_session(&cfg.profiles, 30, RandomSource::Seeded(3), end, ScrapReasonDataset::default()).unwrap();
        DashboardController::new(data)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_page_sections() {
        let cfg = DashboardConfig::default();
        let html = render_page(&cfg, &controller().view());
        assert!(html.contains("<title>Manufacturing Dashboard</title>"));
        assert!(html.contains("Statistical Process Control"));
        assert!(html.contains("Top Scrap Reasons"));
        assert!(html.contains("Drill Down Analysis"));
        assert!(html.contains("SPC Chart - Line 3"));
        assert_eq!(html.matches("<option ").count(), 3);
        assert_eq!(html.matches("data-tab=").count(), 3);
        assert!(html.contains("value=\"2024-07-01\""));
        assert!(html.contains("max-width: none"));
    }

    #[test]
    fn test_page_shows_selected_metrics() {
        let cfg = DashboardConfig::default();
        let mut c = controller();
        c.on_line_selected(ProductionLine::Line2);
        let html = render_page(&cfg, &c.view());
        assert!(html.contains(r#"<option value="Line 2" selected>"#));
        let avg = format!(r#"id="metric-average">{}<"#, c.metrics().average);
        assert!(html.contains(&avg));
    }

    #[test]
    fn test_title_is_escaped_and_narrow_layout() {
        let cfg = DashboardConfig {
            page_title: "<b>Plant</b>".to_string(),
            wide_layout: false,
            ..DashboardConfig::default()
        };
        let html = render_page(&cfg, &controller().view());
        assert!(html.contains("&lt;b&gt;Plant&lt;/b&gt;"));
        assert!(!html.contains("<b>Plant</b>"));
        assert!(html.contains("max-width: 960px"));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dashboard.html");
        export(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
