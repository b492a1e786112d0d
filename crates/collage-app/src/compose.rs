//! Decode the inputs, build the session, export, write.

use crate::config::{Composition, Job};
use crate::error::AppResult;
use collage_core::{DisplayHandle, Editor, HandleReleaser, SourceId, StitchSession};
use collage_render::{
    BitmapStore, DecodeReport, ExportedImage, RenderContext, Renderer, Scene, SkiaRenderer, decode_all,
    encode_png, export_at_scale, export_composition,
};
use std::path::{Path, PathBuf};

/// Releases display handles once no item needs them.
///
/// On the command line the handle is just the input path, so releasing it
/// only needs to be recorded.
#[derive(Debug, Default)]
pub struct LogReleaser {
    pub released: usize,
}

impl HandleReleaser for LogReleaser {
    fn release(&mut self, handle: &DisplayHandle) {
        log::debug!("Released {}", handle.as_str());
        self.released += 1;
    }
}

/// Result of running a job.
#[derive(Debug)]
pub struct ComposeOutcome {
    /// Where the image was written, `None` when there was nothing to export.
    pub path: Option<PathBuf>,
    /// Where the editor preview was written, if one was requested.
    pub preview: Option<PathBuf>,
    pub status: String,
    /// User-facing notice about inputs that were skipped.
    pub notice: Option<String>,
}

/// Everything [`compose`] produced, before anything is written.
#[derive(Debug)]
pub struct Composed {
    pub image: Option<ExportedImage>,
    /// PNG of the editor view (grid, selection), freeform jobs only.
    pub preview: Option<Vec<u8>>,
    pub status: String,
    pub report: DecodeReport,
}

/// Read and decode every input. Files that cannot be read are skipped like
/// files that cannot be decoded.
fn read_inputs(inputs: &[PathBuf]) -> DecodeReport {
    let mut files = Vec::with_capacity(inputs.len());
    let mut unreadable = Vec::new();
    for path in inputs {
        let name = path.display().to_string();
        match std::fs::read(path) {
            Ok(bytes) => files.push((name, bytes)),
            Err(e) => {
                log::warn!("Skipping {}: {}", name, e);
                unreadable.push(name);
            }
        }
    }
    let mut report = decode_all(files);
    report.failed.extend(unreadable);
    report
}

/// Render the editor as it appears on screen.
fn render_preview(renderer: &mut dyn Renderer, editor: &Editor, bitmaps: &BitmapStore) -> AppResult<Option<Vec<u8>>> {
    let scene = Scene::from_editor(editor);
    let frame = renderer.render(&RenderContext::editor_preview(&scene, editor), bitmaps)?;
    if frame.is_empty() {
        return Ok(None);
    }
    Ok(Some(encode_png(&frame)?))
}

/// Build and export the composition described by `job`.
pub fn compose(job: &Job, renderer: &mut dyn Renderer) -> AppResult<Composed> {
    let mut report = read_inputs(&job.inputs);
    let decoded = std::mem::take(&mut report.decoded);
    let mut bitmaps = BitmapStore::new();
    let mut releaser = LogReleaser::default();

    match &job.composition {
        Composition::Freeform { canvas, auto_arrange } => {
            let mut editor = Editor::new(*canvas);
            editor.watermark = job.watermark.clone();
            for (name, bitmap) in decoded {
                let (source, _) = editor.import(name.clone(), bitmap.size(), Some(DisplayHandle::new(name)))?;
                bitmaps.insert(source, bitmap);
            }
            if *auto_arrange {
                editor.auto_arrange();
            }
            let status = editor.status();
            let scene = Scene::from_editor(&editor);
            let image = export_composition(renderer, &scene, &bitmaps, &job.export)?;
            let preview = match job.preview {
                Some(_) => render_preview(renderer, &editor, &bitmaps)?,
                None => None,
            };

            let released: Vec<SourceId> = editor.clear(&mut releaser);
            bitmaps.evict(&released);
            Ok(Composed {
                image,
                preview,
                status,
                report,
            })
        }
        Composition::Stitch {
            layout,
            budget,
            background,
        } => {
            let mut session = StitchSession::new(*layout);
            session.budget = *budget;
            session.background = *background;
            session.watermark = job.watermark.clone();
            for (name, bitmap) in decoded {
                let source = session.push(name.clone(), bitmap.size(), Some(DisplayHandle::new(name)))?;
                bitmaps.insert(source, bitmap);
            }

            let layout = session.layout();
            if layout.exceeds_raster_limit {
                log::warn!(
                    "Layout is {}x{}, beyond what most viewers can display",
                    layout.size.width,
                    layout.size.height
                );
            }
            let status = session.status();
            let scene = Scene::from_stitch(&session, &layout);
            let scale = session.output_scale(&layout) * job.export.sanitized().scale.value();
            let image = export_at_scale(renderer, &scene, &bitmaps, &job.export, scale)?;
            if job.preview.is_some() {
                log::warn!("Stitch jobs have no editor preview");
            }

            let released = session.clear(&mut releaser);
            bitmaps.evict(&released);
            Ok(Composed {
                image,
                preview: None,
                status,
                report,
            })
        }
    }
}

/// Where to write `image`: the output file, or its default name inside a
/// directory (or the working directory when no output was given).
pub fn output_path(output: Option<&Path>, image: &ExportedImage) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(&image.file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&image.file_name),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Run a job end to end with the tiny-skia renderer.
pub fn run(job: &Job) -> AppResult<ComposeOutcome> {
    let mut renderer = SkiaRenderer::new()?;
    let composed = compose(job, &mut renderer)?;
    let notice = composed.report.notice();

    let preview = match (&job.preview, &composed.preview) {
        (Some(path), Some(bytes)) => {
            write_file(path, bytes)?;
            log::info!("Wrote preview {:?}", path);
            Some(path.clone())
        }
        _ => None,
    };

    let Some(image) = composed.image else {
        return Ok(ComposeOutcome {
            path: None,
            preview,
            status: composed.status,
            notice,
        });
    };
    let path = output_path(job.output.as_deref(), &image);
    write_file(&path, &image.bytes)?;
    log::info!("Wrote {:?} ({}x{})", path, image.width, image.height);
    Ok(ComposeOutcome {
        path: Some(path),
        preview,
        status: composed.status,
        notice,
    })
}
