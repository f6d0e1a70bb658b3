//! HTML map rendering.
//!
//! [`LeafletRenderer`] produces a single self-contained page: Leaflet is
//! loaded from a CDN and the markers are embedded as JSON.

use std::fmt::Write as _;

use incident_map_incident_models::AggregatedRecord;
use serde_json::json;

const TEMPLATE: &str = include_str!("../templates/map.html");

/// Overlay names longer than this are cut.
pub const MAX_LAYER_NAME_CHARS: usize = 50;

/// An aggregated record with its marker styling resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRecord<'a> {
    /// The record being drawn.
    pub record: &'a AggregatedRecord,
    /// Fill color, `#rrggbb`.
    pub color: String,
    /// Circle radius in pixels.
    pub radius: f64,
    /// Overlay the marker belongs to, or `None` to add it to the map directly.
    pub overlay: Option<String>,
}

/// Page-level settings for a rendered map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    /// Page title and legend heading.
    pub title: String,
    /// Year shown in the legend.
    pub year: i32,
    /// Data source line in the legend, omitted when `None`.
    pub data_source: Option<String>,
    /// Focus line in the legend, omitted when `None`.
    pub focus: Option<String>,
    /// Initial view center as `[latitude, longitude]`.
    pub center: [f64; 2],
    /// Initial zoom level.
    pub zoom: u8,
    /// Togglable overlays, in display order.
    pub overlays: Vec<String>,
}

/// Turns styled records into a finished document.
pub trait MapRenderer {
    /// Renders `records` with page settings from `style` into a complete
    /// document.
    fn render(&self, records: &[StyledRecord<'_>], style: &MapStyle) -> String;
}

/// Renders an interactive Leaflet map.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeafletRenderer;

impl MapRenderer for LeafletRenderer {
    fn render(&self, records: &[StyledRecord<'_>], style: &MapStyle) -> String {
        let markers: Vec<serde_json::Value> = records
            .iter()
            .map(|styled| {
                let record = styled.record;
                json!({
                    "lat": record.coordinate.latitude,
                    "lon": record.coordinate.longitude,
                    "radius": styled.radius,
                    "color": styled.color,
                    "tooltip": tooltip_text(record),
                    "popup": popup_html(record),
                    "overlay": styled.overlay,
                })
            })
            .collect();

        let overlays = serde_json::Value::from(style.overlays.clone());

        fill_template(
            TEMPLATE,
            &[
                ("title", escape_html(&style.title)),
                ("legend", legend_html(style)),
                ("center_lat", style.center[0].to_string()),
                ("center_lon", style.center[1].to_string()),
                ("zoom", style.zoom.to_string()),
                ("overlays", script_json(&overlays)),
                ("markers", script_json(&serde_json::Value::from(markers))),
            ],
        )
    }
}

/// Cuts `name` to [`MAX_LAYER_NAME_CHARS`] characters.
#[must_use]
pub fn layer_name(name: &str) -> String {
    name.chars().take(MAX_LAYER_NAME_CHARS).collect()
}

/// Formats `n` with comma thousands separators.
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Escapes the five HTML-significant characters in `s`.
#[must_use]
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

fn tooltip_text(record: &AggregatedRecord) -> String {
    format!(
        "{}: {} incidents",
        escape_html(record.category.as_ref()),
        format_count(record.total_count)
    )
}

fn popup_html(record: &AggregatedRecord) -> String {
    let mut html = format!(
        "<b>Zip Code:</b> {}<br><b>Total {}:</b> {}<br><br><b>Incident Types (by frequency):</b>",
        record.location_key,
        escape_html(record.category.as_ref()),
        format_count(record.total_count)
    );
    for (raw_type, count) in record.breakdown.iter() {
        let _ = write!(
            html,
            "<br>\u{2022} {}: {}",
            escape_html(raw_type),
            format_count(count)
        );
    }
    html
}

fn legend_html(style: &MapStyle) -> String {
    let mut html = format!(
        "<div class=\"legend\"><h4>{}</h4><p><b>Year:</b> {}<br><b>Circle Size:</b> Number of incidents<br><b>Circle Color:</b> Incident category",
        escape_html(&style.title),
        style.year
    );
    if let Some(focus) = &style.focus {
        let _ = write!(html, "<br><b>Focus:</b> {}", escape_html(focus));
    }
    if let Some(source) = &style.data_source {
        let _ = write!(html, "<br><b>Data Source:</b> {}", escape_html(source));
    }
    html.push_str("</p></div>");
    html
}

/// Serializes `value` for inlining inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

/// Substitutes `{{name}}` placeholders in a single pass, so substituted
/// text is never rescanned. Unknown placeholders are left as they are.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
            out.push_str(value);
        } else {
            out.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
