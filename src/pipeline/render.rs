//! CV rasterisation: render the first pages of a PDF to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on a Tokio worker thread. [`try_render_pages`]
//! moves the work onto the blocking pool; a panic inside the renderer comes
//! back as a `JoinError` and is reported like any other rendering failure.
//!
//! ## Locating pdfium
//!
//! The library is bound from [`RenderOptions::library_path`] (filled from
//! `AnalysisConfig::pdfium_library_path` or `PDFIUM_LIB_PATH`), otherwise
//! from the system library search path. When neither resolves, rendering is
//! simply unavailable and the orchestrator falls back to text extraction.

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One rasterised CV page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page index in document order.
    pub index: usize,
    pub image: DynamicImage,
}

/// Rendering parameters derived from [`AnalysisConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    /// Pages after this many are never rasterised.
    pub page_limit: usize,
    pub library_path: Option<PathBuf>,
}

impl RenderOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            page_limit: config.max_pages,
            library_path: config.resolved_pdfium_path(),
        }
    }
}

/// Turns a PDF on disk into page images.
///
/// Implementations are called from the blocking thread pool.
pub trait PageRenderer: Send + Sync {
    fn render(
        &self,
        pdf_path: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<RenderedPage>, PipelineError>;
}

/// pdfium-backed renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumRenderer;

impl PageRenderer for PdfiumRenderer {
    fn render(
        &self,
        pdf_path: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<RenderedPage>, PipelineError> {
        let pdfium = bind_pdfium(options.library_path.as_deref())?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            PipelineError::RenderingUnavailable {
                detail: format!("cannot open '{}': {:?}", pdf_path.display(), e),
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("CV loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(options.dpi as f32 / 72.0)
            .set_maximum_width(options.max_rendered_pixels as i32)
            .set_maximum_height(options.max_rendered_pixels as i32);

        let wanted = total_pages.min(options.page_limit);
        let mut results = Vec::with_capacity(wanted);

        for idx in 0..wanted {
            let page = pages
                .get(idx as u16)
                .map_err(|e| PipelineError::RenderingUnavailable {
                    detail: format!("page {}: {:?}", idx + 1, e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PipelineError::RenderingUnavailable {
                    detail: format!("page {}: {:?}", idx + 1, e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(RenderedPage { index: idx, image });
        }

        if total_pages > wanted {
            debug!(
                "Skipped {} page(s) beyond the limit of {}",
                total_pages - wanted,
                options.page_limit
            );
        }

        Ok(results)
    }
}

/// Bind pdfium from an explicit library file, else the system search path.
fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, PipelineError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path).map_err(|e| {
            PipelineError::RenderingUnavailable {
                detail: format!("cannot load pdfium from '{}': {:?}", path.display(), e),
            }
        })?,
        None => Pdfium::bind_to_system_library().map_err(|e| {
            PipelineError::RenderingUnavailable {
                detail: format!(
                    "pdfium not found on the system library path ({:?}); \
                     set PDFIUM_LIB_PATH",
                    e
                ),
            }
        })?,
    };
    Ok(Pdfium::new(bindings))
}

/// Render on the blocking pool, reporting why rendering was unavailable.
pub async fn try_render_pages(
    renderer: Arc<dyn PageRenderer>,
    pdf_path: &Path,
    options: RenderOptions,
) -> Result<Vec<RenderedPage>, PipelineError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || renderer.render(&path, &options))
        .await
        .map_err(|e| PipelineError::RenderingUnavailable {
            detail: format!("render task panicked: {}", e),
        })?
}

/// Render the CV, returning an empty sequence when rendering is unavailable.
///
/// An empty result is the signal to use the text-extraction path.
pub async fn render_pages(
    renderer: Arc<dyn PageRenderer>,
    pdf_path: &Path,
    options: RenderOptions,
) -> Vec<RenderedPage> {
    match try_render_pages(renderer, pdf_path, options).await {
        Ok(pages) => pages,
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct FixedRenderer(usize);

    impl PageRenderer for FixedRenderer {
        fn render(
            &self,
            _pdf_path: &Path,
            options: &RenderOptions,
        ) -> Result<Vec<RenderedPage>, PipelineError> {
            Ok((0..self.0.min(options.page_limit))
                .map(|index| RenderedPage {
                    index,
                    image: DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))),
                })
                .collect())
        }
    }

    struct PanickingRenderer;

    impl PageRenderer for PanickingRenderer {
        fn render(
            &self,
            _pdf_path: &Path,
            _options: &RenderOptions,
        ) -> Result<Vec<RenderedPage>, PipelineError> {
            panic!("corrupt xref");
        }
    }

    fn options() -> RenderOptions {
        RenderOptions {
            dpi: 300,
            max_rendered_pixels: 2000,
            page_limit: 5,
            library_path: None,
        }
    }

    #[tokio::test]
    async fn renders_in_document_order() {
        let pages = render_pages(Arc::new(FixedRenderer(3)), Path::new("cv.pdf"), options()).await;
        let indices: Vec<usize> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn panicking_renderer_yields_empty_sequence() {
        let pages = render_pages(Arc::new(PanickingRenderer), Path::new("cv.pdf"), options()).await;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn missing_library_is_rendering_unavailable() {
        let mut opts = options();
        opts.library_path = Some(PathBuf::from("/nonexistent/libpdfium.so"));
        let err = try_render_pages(Arc::new(PdfiumRenderer), Path::new("cv.pdf"), opts)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RenderingUnavailable { .. }));
    }

    #[test]
    fn options_take_page_limit_from_max_pages() {
        let config = AnalysisConfig::builder().max_pages(2).dpi(150).build().unwrap();
        let opts = RenderOptions::from_config(&config);
        assert_eq!(opts.page_limit, 2);
        assert_eq!(opts.dpi, 150);
    }
}
