use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// Panel and array parameters, in metres, degrees and counts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    #[serde(deserialize_with = "lenient")]
    pub panel_width: f64,
    #[serde(deserialize_with = "lenient")]
    pub panel_height: f64,
    #[serde(deserialize_with = "lenient")]
    pub panels_per_row: f64,
    #[serde(deserialize_with = "lenient")]
    pub rows_per_array: f64,
    #[serde(deserialize_with = "lenient")]
    pub h_panel_spacing: f64,
    #[serde(deserialize_with = "lenient")]
    pub v_panel_spacing: f64,
    #[serde(deserialize_with = "lenient")]
    pub h_array_spacing: f64,
    #[serde(deserialize_with = "lenient")]
    pub v_array_spacing: f64,
    #[serde(deserialize_with = "lenient")]
    pub azimuth_angle: f64,
    #[serde(deserialize_with = "lenient")]
    pub zenith_angle: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            panel_width: 1.0,
            panel_height: 1.7,
            panels_per_row: 4.0,
            rows_per_array: 3.0,
            h_panel_spacing: 0.1,
            v_panel_spacing: 0.1,
            h_array_spacing: 2.0,
            v_array_spacing: 2.0,
            azimuth_angle: 180.0,
            zenith_angle: 30.0,
        }
    }
}

/// Anything that isn't a number (or a string holding one) reads as NaN and is
/// later replaced by the default.
fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Number(n) => n,
        Loose::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        Loose::Other(_) => f64::NAN,
    })
}

impl LayoutConfig {
    /// Replace every out-of-range field with its default so a layout pass can always run.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();

        let positive = |v: f64| v.is_finite() && v > 0.0;
        let count = |v: f64| v.is_finite() && v >= 1.0;
        let gap = |v: f64| v.is_finite() && v >= 0.0;

        let pick = |name: &str, value: f64, fallback: f64, ok: bool| {
            if ok {
                value
            } else {
                warn!("Layout setting {name} = {value} is out of range, using {fallback}");
                fallback
            }
        };

        Self {
            panel_width: pick("panelWidth", self.panel_width, defaults.panel_width, positive(self.panel_width)),
            panel_height: pick("panelHeight", self.panel_height, defaults.panel_height, positive(self.panel_height)),
            panels_per_row: pick("panelsPerRow", self.panels_per_row, defaults.panels_per_row, count(self.panels_per_row)).floor(),
            rows_per_array: pick("rowsPerArray", self.rows_per_array, defaults.rows_per_array, count(self.rows_per_array)).floor(),
            h_panel_spacing: pick("hPanelSpacing", self.h_panel_spacing, defaults.h_panel_spacing, gap(self.h_panel_spacing)),
            v_panel_spacing: pick("vPanelSpacing", self.v_panel_spacing, defaults.v_panel_spacing, gap(self.v_panel_spacing)),
            h_array_spacing: pick("hArraySpacing", self.h_array_spacing, defaults.h_array_spacing, gap(self.h_array_spacing)),
            v_array_spacing: pick("vArraySpacing", self.v_array_spacing, defaults.v_array_spacing, gap(self.v_array_spacing)),
            azimuth_angle: pick(
                "azimuthAngle",
                self.azimuth_angle,
                defaults.azimuth_angle,
                self.azimuth_angle.is_finite() && (0.0..=360.0).contains(&self.azimuth_angle),
            ),
            zenith_angle: pick(
                "zenithAngle",
                self.zenith_angle,
                defaults.zenith_angle,
                self.zenith_angle.is_finite() && (0.0..90.0).contains(&self.zenith_angle),
            ),
        }
    }

    pub fn panels_per_row(&self) -> usize {
        self.panels_per_row as usize
    }

    pub fn rows_per_array(&self) -> usize {
        self.rows_per_array as usize
    }

    /// Footprint height of one tilted panel.
    pub fn adjusted_panel_height(&self) -> f64 {
        self.panel_height * self.zenith_angle.to_radians().cos()
    }

    /// Width and height of one array of panels, in metres.
    pub fn group_size(&self) -> (f64, f64) {
        let cols = self.panels_per_row;
        let rows = self.rows_per_array;

        let width = cols * self.panel_width + (cols - 1.0) * self.h_panel_spacing;
        let height = rows * self.adjusted_panel_height() + (rows - 1.0) * self.v_panel_spacing;

        (width, height)
    }
}


#[derive(Debug, Deserialize, PartialEq)]
pub enum Action {
    Draw(Vec<[f64; 2]>),
    Subtract(Vec<[f64; 2]>),
    RemoveAt([f64; 2]),
    RemoveGroup(String),
    Clear,
    Recompute,
}

#[derive(Debug, Deserialize)]
pub struct DesignConfig {
    pub name: String,
    pub outdir: PathBuf,
    #[serde(default)]
    pub layout: LayoutConfig,
    pub actions: Vec<Action>,
}
