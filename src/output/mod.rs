use std::collections::BTreeMap;

use serde::Serialize;

use crate::controller::ControllerStats;
use crate::format::Dimension;
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct SliderReport {
    pub dimension: Dimension,
    pub handles: [String; 2],
    pub label: String,
    pub min_value: String,
    pub max_value: String,
}

/// Final state of a session: what the form says and what the listing shows.
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub query: String,
    pub sliders: Vec<SliderReport>,
    pub fields: BTreeMap<String, String>,
    pub genres: Vec<String>,
    pub stats: ControllerStats,
    pub listing: String,
}

impl SessionReport {
    pub fn from_session(session: &Session) -> Self {
        let controller = session.controller();
        let page = controller.page();
        let ids = controller.ids();

        let sliders = [Dimension::Price, Dimension::Size]
            .into_iter()
            .filter_map(|dimension| {
                let slider = controller.slider(dimension)?;
                let slider_ids = ids.slider(dimension);
                Some(SliderReport {
                    dimension,
                    handles: slider.get(),
                    label: page.text_content(slider_ids.label).unwrap_or("").to_string(),
                    min_value: page
                        .form()
                        .value_of(slider_ids.min_input)
                        .unwrap_or("")
                        .to_string(),
                    max_value: page
                        .form()
                        .value_of(slider_ids.max_input)
                        .unwrap_or("")
                        .to_string(),
                })
            })
            .collect();

        Self {
            query: controller.current_query(),
            sliders,
            fields: page.form().entries().into_iter().collect(),
            genres: page.form().checked_values(crate::form::GENRES_FIELD),
            stats: controller.stats(),
            listing: session.listing().to_string(),
        }
    }
}

pub fn render_text(report: &SessionReport) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("query: {}\n", report.query));
    for slider in &report.sliders {
        out.push_str(&format!(
            "{}: {} ({} .. {})\n",
            slider.dimension, slider.label, slider.min_value, slider.max_value
        ));
    }
    if !report.genres.is_empty() {
        out.push_str(&format!("genres: {}\n", report.genres.join(", ")));
    }
    out.push_str(&format!(
        "requests: {} issued, {} applied, {} discarded, {} failed\n",
        report.stats.issued, report.stats.applied, report.stats.discarded, report.stats.failed
    ));
    out.push('\n');
    out.push_str(&report.listing);
    if !report.listing.ends_with('\n') {
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_json(report: &SessionReport) -> Vec<u8> {
    serde_json::to_vec_pretty(report).unwrap_or_else(|_| b"{}\n".to_vec())
}

/// The listing fragment exactly as the server sent it.
pub fn render_html(report: &SessionReport) -> Vec<u8> {
    report.listing.clone().into_bytes()
}

pub fn render(report: &SessionReport, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => render_json(report),
        OutputFormat::Html => render_html(report),
    }
}
