use std::net::TcpListener;

use anyhow::{Context, Result};
use serde_json::json;

use spc_dashboard::config::DashboardConfig;
use spc_dashboard::dashboard::DashboardController;
use spc_dashboard::data::{self, generate_session};
use spc_dashboard::logging::{self, obj, v_num, v_str, Domain};
use spc_dashboard::scrap::ScrapReasonDataset;
use spc_dashboard::{page, server};

fn main() -> Result<()> {
    let cfg = DashboardConfig::from_env();
    let source = cfg.random_source();

    let session = generate_session(&cfg.profiles, cfg.points, source, data::today(), ScrapReasonDataset::default())
        .context("generating session data")?;
    logging::info(
        Domain::System,
        "session_start",
        obj(&[
            ("title", v_str(&cfg.page_title)),
            ("wide_layout", json!(cfg.wide_layout)),
            ("points", v_num(cfg.points as f64)),
            ("seed", json!(cfg.seed)),
            ("fingerprint", v_str(&session.fingerprint())),
        ]),
    );
    let controller = DashboardController::new(session);

    if let Some(path) = &cfg.export_path {
        let html = page::render_page(&cfg, &controller.view());
        page::export(path, &html).with_context(|| format!("writing {}", path.display()))?;
        logging::info(
            Domain::Render,
            "page_exported",
            obj(&[("path", v_str(&path.to_string_lossy())), ("bytes", v_num(html.len() as f64))]),
        );
        return Ok(());
    }

    let addr = cfg.socket_addr()?;
    let listener = TcpListener::bind(addr).with_context(|| format!("binding {}", addr))?;
    logging::info(
        Domain::Server,
        "listening",
        obj(&[("url", v_str(&format!("http://{}", addr)))]),
    );
    server::serve(listener, controller, &cfg);
    Ok(())
}
