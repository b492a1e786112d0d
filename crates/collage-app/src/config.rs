//! Job files: what to compose, how, and where to write it.

use crate::error::AppResult;
use collage_core::{CanvasSettings, ExportSettings, LayoutMode, OutputBudget, SerializableColor, WatermarkConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the inputs are composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Composition {
    /// Items on a fixed canvas, centered on import.
    Freeform {
        #[serde(default)]
        canvas: CanvasSettings,
        /// Tile the items with the auto-arrange grid before export.
        #[serde(default)]
        auto_arrange: bool,
    },
    /// Strip or grid layout sized from the images.
    Stitch {
        #[serde(default)]
        layout: LayoutMode,
        #[serde(default)]
        budget: OutputBudget,
        #[serde(default = "SerializableColor::white")]
        background: SerializableColor,
    },
}

impl Default for Composition {
    fn default() -> Self {
        Composition::Freeform {
            canvas: CanvasSettings::default(),
            auto_arrange: false,
        }
    }
}

/// A complete compose-and-export job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    /// Image files, bottom to top (freeform) or in strip order (stitch).
    pub inputs: Vec<PathBuf>,
    /// Output file, or a directory to receive `collage_<scale>x.<ext>`.
    pub output: Option<PathBuf>,
    /// Also write a PNG of the editor view here (freeform only).
    pub preview: Option<PathBuf>,
    pub composition: Composition,
    pub watermark: WatermarkConfig,
    pub export: ExportSettings,
}

impl Job {
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a job file. Relative input paths resolve against the file's directory.
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut job = Self::from_json(&json)?;
        if let Some(dir) = path.parent() {
            for input in &mut job.inputs {
                if input.is_relative() {
                    *input = dir.join(&*input);
                }
            }
        }
        log::debug!("Loaded job {:?} with {} inputs", path, job.inputs.len());
        Ok(job)
    }

    /// Apply every documented default and clamp.
    pub fn sanitized(self) -> Self {
        let composition = match self.composition {
            Composition::Freeform { canvas, auto_arrange } => Composition::Freeform {
                canvas: canvas.sanitized(),
                auto_arrange,
            },
            stitch => stitch,
        };
        Self {
            composition,
            watermark: self.watermark.sanitized(),
            export: self.export.sanitized(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_core::{ExportFormat, GridParams, WatermarkMode};

    #[test]
    fn test_minimal_job_uses_defaults() {
        let job = Job::from_json(r#"{"inputs": ["a.png"]}"#).unwrap();
        assert_eq!(job.inputs, vec![PathBuf::from("a.png")]);
        assert_eq!(job.composition, Composition::default());
        assert_eq!(job.export, ExportSettings::default());
        assert!(!job.watermark.enabled);
        assert!(job.preview.is_none());
    }

    #[test]
    fn test_stitch_job() {
        let job = Job::from_json(
            r##"{
                "composition": {
                    "kind": "stitch",
                    "layout": {"mode": "grid", "cols": 3, "gap": 4},
                    "budget": {"max_width": 2000}
                },
                "watermark": {"enabled": true, "text": "hi", "mode": {"kind": "tiled", "spacing": 120}},
                "export": {"format": "jpeg", "jpeg_quality": 0.8}
            }"##,
        )
        .unwrap();
        let Composition::Stitch {
            layout,
            budget,
            background,
        } = job.composition
        else {
            panic!("expected stitch");
        };
        assert_eq!(
            layout,
            LayoutMode::Grid(GridParams {
                cols: 3,
                gap: 4.0,
                ..GridParams::default()
            })
        );
        assert_eq!(budget.max_width, 2000.0);
        assert_eq!(background, SerializableColor::white());
        assert_eq!(job.watermark.mode, WatermarkMode::Tiled { spacing: 120.0 });
        assert_eq!(job.export.format, ExportFormat::Jpeg);
    }

    #[test]
    fn test_sanitize_applies_floors() {
        let job = Job {
            composition: Composition::Freeform {
                canvas: CanvasSettings {
                    width: 10.0,
                    height: 0.0,
                    ..CanvasSettings::default()
                },
                auto_arrange: false,
            },
            ..Job::default()
        }
        .sanitized();
        let Composition::Freeform { canvas, .. } = job.composition else {
            panic!("expected freeform");
        };
        assert_eq!((canvas.width, canvas.height), (64.0, 800.0));
    }

    #[test]
    fn test_load_resolves_relative_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{"inputs": ["pics/a.png", "/abs/b.png"]}"#).unwrap();
        let job = Job::load(&path).unwrap();
        assert_eq!(job.inputs[0], dir.path().join("pics/a.png"));
        assert_eq!(job.inputs[1], PathBuf::from("/abs/b.png"));
    }

    #[test]
    fn test_json_round_trip() {
        let job = Job {
            inputs: vec!["x.png".into()],
            ..Job::default()
        };
        assert_eq!(Job::from_json(&job.to_json().unwrap()).unwrap(), job);
    }
}
