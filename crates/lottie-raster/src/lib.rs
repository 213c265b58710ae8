//! Pixel output for a mounted animation.
//!
//! The retained scene graph is serialized to SVG and handed to resvg, which
//! draws it into a tiny-skia pixmap.

use lottie_core::{Engine, SceneGraph};
use resvg::usvg;
use tiny_skia::{Color, Pixmap, Transform};

/// Largest edge, in pixels, a raster target may have.
const MAX_DIMENSION: u32 = 16_384;

pub type RasterResult<T> = Result<T, RasterError>;

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("scene is not valid SVG: {0}")]
    Svg(#[from] usvg::Error),

    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("png encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Output pixels per scene unit.
    pub scale: f32,
    /// Straight RGBA the pixmap is cleared to; transparent when `None`.
    pub background: Option<[u8; 4]>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: None,
        }
    }
}

pub fn render_svg(svg: &str, options: &RasterOptions) -> RasterResult<Pixmap> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())?;
    let size = tree.size();

    let to_px = |v: f32| -> Option<u32> {
        let px = (v * options.scale).ceil();
        (px.is_finite() && px >= 1.0 && px <= MAX_DIMENSION as f32).then_some(px as u32)
    };
    let (Some(width), Some(height)) = (to_px(size.width()), to_px(size.height())) else {
        return Err(RasterError::InvalidSize {
            width: (size.width() * options.scale).max(0.0) as u32,
            height: (size.height() * options.scale).max(0.0) as u32,
        });
    };

    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::InvalidSize { width, height })?;
    if let Some([r, g, b, a]) = options.background {
        pixmap.fill(Color::from_rgba8(r, g, b, a));
    }

    resvg::render(
        &tree,
        Transform::from_scale(options.scale, options.scale),
        &mut pixmap.as_mut(),
    );
    tracing::debug!(width, height, "scene rasterized");
    Ok(pixmap)
}

pub fn render_scene(scene: &SceneGraph, options: &RasterOptions) -> RasterResult<Pixmap> {
    render_svg(&scene.to_svg_string(), options)
}

pub fn encode_png(pixmap: &Pixmap) -> RasterResult<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| RasterError::Encode(e.to_string()))
}

/// Renders `frame` of a mounted animation and returns it as PNG bytes.
pub fn render_frame_png(
    engine: &mut Engine,
    frame: f32,
    options: &RasterOptions,
) -> RasterResult<Vec<u8>> {
    engine.render_frame(frame);
    let pixmap = render_scene(engine.scene(), options)?;
    encode_png(&pixmap)
}
