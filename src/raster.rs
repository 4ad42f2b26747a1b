//! Rasterization of typeset output: SVG document → RGBA pixmap → PNG bytes.
//!
//! The typesetting runtime hands back a vector document; this module owns
//! the only pixel‑level step of the pipeline. The pixmap dimensions come
//! from the document's own size scaled by the engine's raster scale, so a
//! display‑mode job keeps its natural width here as well.

use resvg::{tiny_skia, usvg};

use crate::error::{Error, Result};

/// Rasterize an SVG document and encode it as PNG.
///
/// `scale` multiplies the document's natural size; callers pass values
/// above `1.0` for high‑density targets.
pub(crate) fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| Error::Raster(format!("invalid typeset output: {e}")))?;

    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    if width == 0 || height == 0 {
        return Err(Error::Raster(format!(
            "typeset output has empty bounds ({}x{} at scale {scale})",
            size.width(),
            size.height()
        )));
    }

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| Error::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    pixmap
        .encode_png()
        .map_err(|e| Error::Raster(format!("png encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20"><rect width="40" height="20" fill="#102030"/></svg>"##;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn ihdr_dimensions(png: &[u8]) -> (u32, u32) {
        let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
        (width, height)
    }

    #[test]
    fn encodes_png_at_natural_size() {
        let png = svg_to_png(RECT_SVG, 1.0).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert_eq!(ihdr_dimensions(&png), (40, 20));
    }

    #[test]
    fn scale_multiplies_pixel_dimensions() {
        let png = svg_to_png(RECT_SVG, 2.0).unwrap();
        assert_eq!(ihdr_dimensions(&png), (80, 40));
    }

    #[test]
    fn rejects_unparseable_output() {
        let err = svg_to_png("<svg", 1.0).unwrap_err();
        assert!(matches!(err, Error::Raster(_)));
    }
}
