//! Minimal single-threaded HTTP front end for one dashboard session.
//!
//! Endpoints:
//!   GET /               - the dashboard page (`line`, `start`, `end` query params)
//!   GET /api/charts     - every figure as Plotly JSON
//!   GET /api/metrics    - drill-down readouts (`line` query param)
//!   GET /api/selection  - current selection
//!   GET /api/health     - health check

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};

use chrono::NaiveDate;
use serde_json::json;

use crate::config::DashboardConfig;
use crate::dashboard::{DashboardController, DateRange};
use crate::data::ProductionLine;
use crate::logging::{self, obj, v_num, v_str, Domain};
use crate::page;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    /// Parses `GET /path?a=b HTTP/1.1`.
    pub fn parse(request_line: &str) -> Option<Self> {
        let mut parts = request_line.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next()?;
        if !target.starts_with('/') {
            return None;
        }
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Some(Self { method, path: path.to_string(), query })
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Self { status, content_type: "application/json", body: body.to_string() }
    }

    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn text(status: u16, body: &str) -> Self {
        Self { status, content_type: "text/plain", body: body.to_string() }
    }

    fn bad_request(msg: &str) -> Self {
        Self::json(400, json!({ "error": msg }))
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("bad date {:?}: {}", s, e))
}

/// Applies `line`, `start` and `end` from the query to the controller.
/// Parameters are validated before anything is mutated.
fn apply_selection(controller: &mut DashboardController, req: &Request) -> Result<(), String> {
    let line = match req.param("line") {
        Some(label) => Some(ProductionLine::from_label(label).ok_or_else(|| format!("unknown line {:?}", label))?),
        None => None,
    };
    let current = controller.selection().date_range;
    let start = req.param("start").map(parse_date).transpose()?;
    let end = req.param("end").map(parse_date).transpose()?;

    if let Some(line) = line {
        if line != controller.selection().active_line {
            controller.on_line_selected(line);
        }
    }
    if start.is_some() || end.is_some() {
        let range = DateRange::new(start.unwrap_or(current.start), end.unwrap_or(current.end));
        if range != current {
            controller.on_date_range_changed(range);
        }
    }
    Ok(())
}

pub fn handle(controller: &mut DashboardController, cfg: &DashboardConfig, request_line: &str) -> Response {
    let Some(req) = Request::parse(request_line) else {
        return Response::bad_request("malformed request line");
    };
    if req.method != "GET" {
        return Response::text(405, "Method Not Allowed");
    }

    match req.path.as_str() {
        "/" | "/index.html" => {
            if let Err(msg) = apply_selection(controller, &req) {
                return Response::bad_request(&msg);
            }
            let _scope = logging::ProfileScope::new("render_page");
            Response::html(page::render_page(cfg, &controller.view()))
        }
        "/api/charts" => {
            let lines: Vec<_> = controller
                .control_charts()
                .into_iter()
                .map(|lc| {
                    json!({
                        "line": lc.line,
                        "summary": lc.summary,
                        "figure": lc.chart.to_plotly(),
                    })
                })
                .collect();
            Response::json(200, json!({ "lines": lines, "scrap": controller.scrap_chart().to_plotly() }))
        }
        "/api/metrics" => {
            if let Err(msg) = apply_selection(controller, &req) {
                return Response::bad_request(&msg);
            }
            Response::json(200, json!(controller.metrics()))
        }
        "/api/selection" => Response::json(200, json!(controller.selection())),
        "/api/health" => Response::json(200, json!({ "status": "ok" })),
        _ => Response::text(404, "Not Found"),
    }
}

fn read_request_line(stream: &TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    // drain headers; bodies are never read
    let mut header = String::new();
    loop {
        header.clear();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
    }
    Ok(request_line.trim_end().to_string())
}

/// Serves requests one at a time until the listener fails. A client that
/// sends nothing is dropped after `cfg.read_timeout`.
pub fn serve(listener: TcpListener, mut controller: DashboardController, cfg: &DashboardConfig) {
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(err) => {
                logging::warn(Domain::Server, "accept_failed", obj(&[("error", v_str(&err.to_string()))]));
                continue;
            }
        };
        if let Err(err) = stream.set_read_timeout(Some(cfg.read_timeout)) {
            logging::warn(Domain::Server, "set_timeout_failed", obj(&[("error", v_str(&err.to_string()))]));
        }
        let request_line = match read_request_line(&stream) {
            Ok(line) if line.is_empty() => continue,
            Ok(line) => line,
            Err(err) => {
                let event = match err.kind() {
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => "read_timeout",
                    _ => "read_failed",
                };
                logging::warn(Domain::Server, event, obj(&[("error", v_str(&err.to_string()))]));
                continue;
            }
        };

        let response = handle(&mut controller, cfg, &request_line);
        logging::info(
            Domain::Server,
            "request",
            obj(&[
                ("request", v_str(&request_line)),
                ("status", v_num(response.status as f64)),
                ("bytes", v_num(response.body.len() as f64)),
            ]),
        );
        if let Err(err) = stream.write_all(response.to_http().as_bytes()) {
            logging::warn(
                Domain::Server,
                "write_failed",
                obj(&[("request", v_str(&request_line)), ("error", v_str(&err.to_string()))]),
            );
        }
    }
}
