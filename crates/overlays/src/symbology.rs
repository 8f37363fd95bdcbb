use aggregation::policy::Tier;
use serde::{Deserialize, Serialize};

/// Fill/stroke for region and cell outlines. Colors are CSS strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonStyle {
    pub stroke_color: String,
    pub stroke_weight: u32,
    pub stroke_opacity: f32,
    pub fill_color: String,
    pub fill_opacity: f32,
}

impl PolygonStyle {
    pub fn new(
        stroke_color: &str,
        stroke_opacity: f32,
        fill_color: &str,
        fill_opacity: f32,
    ) -> Self {
        Self {
            stroke_color: stroke_color.to_string(),
            stroke_weight: 2,
            stroke_opacity,
            fill_color: fill_color.to_string(),
            fill_opacity,
        }
    }
}

impl Default for PolygonStyle {
    fn default() -> Self {
        PolygonStyle::new("#4a90e2", 0.6, "#4a90e2", 0.08)
    }
}

/// Normal and selected looks for every overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyles {
    pub normal: PolygonStyle,
    pub emphasized: PolygonStyle,
    /// Marker z-index; selected markers are drawn one above.
    pub marker_z_index: i32,
    /// `[x, y]` anchor of marker content, as fractions of its box.
    pub marker_anchor: [f64; 2],
}

impl Default for OverlayStyles {
    fn default() -> Self {
        Self {
            normal: PolygonStyle::default(),
            emphasized: PolygonStyle::new("#ff6b00", 0.9, "#ff6b00", 0.25),
            marker_z_index: 3,
            marker_anchor: [0.5, 1.0],
        }
    }
}

impl OverlayStyles {
    pub fn polygon(&self, emphasized: bool) -> &PolygonStyle {
        if emphasized {
            &self.emphasized
        } else {
            &self.normal
        }
    }

    pub fn z_index(&self, emphasized: bool) -> i32 {
        self.marker_z_index + i32::from(emphasized)
    }
}

/// Marker body for one overlay.
///
/// Region tiers show the count bubble above the region name; grid cells show
/// the bubble only.
pub fn marker_html(tier: Tier, label: &str, count: u64, emphasized: bool) -> String {
    let class = if emphasized {
        "marker-container selected"
    } else {
        "marker-container"
    };
    match tier {
        Tier::Grid => {
            format!(r#"<div class="{class}"><div class="circle-count">{count}</div></div>"#)
        }
        _ => format!(
            r#"<div class="{class}"><div class="circle-count">{count}</div><div class="region-label">{}</div></div>"#,
            escape_html(label)
        ),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
