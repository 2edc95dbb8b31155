// 🖼️ Summary image - post-refresh snapshot rendered as SVG
//
// Cosmetic side effect. Nothing here may fail a refresh: `publish_summary`
// logs and moves on.

use crate::db;
use crate::models::{format_timestamp, Country};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const TOP_N: usize = 5;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;
const LINE_HEIGHT: u32 = 25;

/// Row count plus the top countries by estimated GDP at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    pub total_countries: i64,
    pub top_countries: Vec<Country>,
    pub generated_at: DateTime<Utc>,
}

impl SummarySnapshot {
    /// Read the snapshot from committed state.
    pub fn capture(conn: &Connection, generated_at: DateTime<Utc>) -> rusqlite::Result<Self> {
        Ok(SummarySnapshot {
            total_countries: db::count_countries(conn)?,
            top_countries: db::top_countries_by_gdp(conn, TOP_N)?,
            generated_at,
        })
    }

    /// Text lines in display order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Country Data Summary".to_string(),
            String::new(),
            format!("Total Countries: {}", self.total_countries),
            String::new(),
            format!("Top {} Countries by Estimated GDP:", TOP_N),
        ];

        for (i, country) in self.top_countries.iter().take(TOP_N).enumerate() {
            let gdp = country
                .estimated_gdp
                .map(|v| format!("${:.2}", v))
                .unwrap_or_else(|| "N/A".to_string());
            lines.push(format!("  {}. {} - {}", i + 1, country.name, gdp));
        }

        lines.push(String::new());
        lines.push(format!("Last Refreshed: {}", format_timestamp(&self.generated_at)));
        lines
    }

    pub fn render_svg(&self) -> String {
        let mut svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                "\n",
                r#"  <rect x="1" y="1" width="{iw}" height="{ih}" fill="white" stroke="rgb(50,50,50)" stroke-width="2"/>"#,
                "\n",
            ),
            w = WIDTH,
            h = HEIGHT,
            iw = WIDTH - 2,
            ih = HEIGHT - 2,
        );

        let mut y = 40;
        for line in self.lines() {
            if !line.is_empty() {
                svg.push_str(&format!(
                    r#"  <text x="30" y="{}" font-family="monospace" font-size="14" fill="black" xml:space="preserve">{}</text>"#,
                    y,
                    escape_xml(&line)
                ));
                svg.push('\n');
            }
            y += LINE_HEIGHT;
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Render and write to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.render_svg())
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write the snapshot on the blocking pool without waiting for it.
/// Must be called from within a tokio runtime.
pub fn publish_summary(snapshot: SummarySnapshot, path: PathBuf) {
    tokio::task::spawn_blocking(move || match snapshot.write_to(&path) {
        Ok(()) => info!(path = %path.display(), "summary image written"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write summary image"),
    });
}
