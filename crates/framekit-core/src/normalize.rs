//! Image normalization.
//!
//! Dataset rows carry frames in many shapes: decoded images, raw pixel
//! arrays, encoded PNG/JPEG bytes, or paths to files on disk. Everything is
//! funnelled through [`convert_to_image`] into a single [`CanonicalImage`].
//!
//! Conversion is best-effort: any input that cannot be turned into an image
//! yields `None` instead of an error, and callers decide whether that means
//! "skip this sample".

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use serde_json::Value;
use tracing::debug;

use crate::record::Field;

/// Pixel layout of a canonical image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Rgb,
    Rgba,
    Luma,
}

impl ColorMode {
    pub fn channels(self) -> u8 {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
            ColorMode::Luma => 1,
        }
    }

    fn apply(self, image: DynamicImage) -> DynamicImage {
        match (self, image) {
            (ColorMode::Rgb, img @ DynamicImage::ImageRgb8(_)) => img,
            (ColorMode::Rgba, img @ DynamicImage::ImageRgba8(_)) => img,
            (ColorMode::Luma, img @ DynamicImage::ImageLuma8(_)) => img,
            (ColorMode::Rgb, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
            (ColorMode::Rgba, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
            (ColorMode::Luma, img) => DynamicImage::ImageLuma8(img.to_luma8()),
        }
    }
}

/// Element storage of a [`PixelArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// Values already in 0..=255.
    U8(Vec<u8>),
    /// Either normalized 0.0..=1.0 or already in 0..=255.
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelData {
    fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::F32(v) => v.len(),
            PixelData::F64(v) => v.len(),
        }
    }

    fn to_u8(&self) -> Vec<u8> {
        match self {
            PixelData::U8(v) => v.clone(),
            PixelData::F32(v) => {
                scale_floats(&v.iter().map(|&x| f64::from(x)).collect::<Vec<_>>())
            }
            PixelData::F64(v) => scale_floats(v),
        }
    }
}

/// Floats whose maximum is at most 1.0 are treated as normalized and scaled
/// by 255; anything else is cast directly. The cast saturates.
fn scale_floats(values: &[f64]) -> Vec<u8> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let factor = if max <= 1.0 { 255.0 } else { 1.0 };
    values.iter().map(|v| (v * factor) as u8).collect()
}

/// A dense row-major `height x width x channels` pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    height: usize,
    width: usize,
    channels: usize,
    data: PixelData,
}

impl PixelArray {
    /// Build an array from a shape and flat data.
    ///
    /// `shape` is `[h, w]` (single channel) or `[h, w, c]` with `c` in 1, 3
    /// or 4. Returns `None` for any other shape or when the data length does
    /// not match.
    pub fn new(shape: &[usize], data: PixelData) -> Option<Self> {
        let (height, width, channels) = match *shape {
            [h, w] => (h, w, 1),
            [h, w, c] => (h, w, c),
            _ => return None,
        };
        if !matches!(channels, 1 | 3 | 4) {
            return None;
        }
        if height.checked_mul(width)?.checked_mul(channels)? != data.len() {
            return None;
        }
        Some(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Read a nested JSON array (`[[r, g, b], ...]` rows) as pixel data.
    ///
    /// All-integer arrays become `U8` (clamped to 0..=255); arrays with any
    /// fractional value become `F64`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let shape = json_shape(value);
        if shape.len() < 2 {
            return None;
        }
        let mut values = Vec::new();
        let mut all_int = true;
        if !flatten_json(value, 0, &shape, &mut values, &mut all_int) {
            return None;
        }
        let data = if all_int {
            PixelData::U8(values.iter().map(|v| v.clamp(0.0, 255.0) as u8).collect())
        } else {
            PixelData::F64(values)
        };
        Self::new(&shape, data)
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    fn to_dynamic(&self) -> Option<DynamicImage> {
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        let bytes = self.data.to_u8();
        match self.channels {
            1 => GrayImage::from_raw(width, height, bytes).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(width, height, bytes).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}

fn json_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

fn flatten_json(
    value: &Value,
    depth: usize,
    shape: &[usize],
    out: &mut Vec<f64>,
    all_int: &mut bool,
) -> bool {
    match value {
        Value::Array(items) if depth < shape.len() => {
            items.len() == shape[depth]
                && items
                    .iter()
                    .all(|item| flatten_json(item, depth + 1, shape, out, all_int))
        }
        Value::Number(n) if depth == shape.len() => {
            if !(n.is_i64() || n.is_u64()) {
                *all_int = false;
            }
            match n.as_f64() {
                Some(v) => {
                    out.push(v);
                    true
                }
                None => false,
            }
        }
        _ => false,
    }
}

/// Every image representation a dataset row may carry.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Decoded(DynamicImage),
    Array(PixelArray),
    /// PNG or JPEG file contents.
    Encoded(Vec<u8>),
    Path(PathBuf),
}

impl ImageInput {
    /// Interpret a record field as an image input.
    ///
    /// Text is read as a path and numeric JSON arrays as pixel data; every
    /// other field type has no image reading.
    pub fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Image(input) => Some(input.clone()),
            Field::Text(path) if !path.trim().is_empty() => {
                Some(ImageInput::Path(PathBuf::from(path.trim())))
            }
            Field::Json(value @ Value::Array(_)) => {
                PixelArray::from_json(value).map(ImageInput::Array)
            }
            _ => None,
        }
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Decoded(image)
    }
}

impl From<PixelArray> for ImageInput {
    fn from(array: PixelArray) -> Self {
        ImageInput::Array(array)
    }
}

/// The single in-memory form every frame is normalized to.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    image: DynamicImage,
    mode: ColorMode,
}

impl CanonicalImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// True when both dimensions are positive.
    pub fn has_area(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

/// Normalize any [`ImageInput`] to an RGB [`CanonicalImage`].
pub fn convert_to_image(input: &ImageInput) -> Option<CanonicalImage> {
    convert_to_image_with_mode(input, ColorMode::Rgb)
}

/// Normalize any [`ImageInput`] to a [`CanonicalImage`] in `mode`.
pub fn convert_to_image_with_mode(input: &ImageInput, mode: ColorMode) -> Option<CanonicalImage> {
    let decoded = match input {
        ImageInput::Decoded(image) => Some(image.clone()),
        ImageInput::Array(array) => array.to_dynamic(),
        ImageInput::Encoded(bytes) => match image::load_from_memory(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!(error = %e, len = bytes.len(), "failed to decode image bytes");
                None
            }
        },
        ImageInput::Path(path) => load_from_path(path),
    }?;

    Some(CanonicalImage {
        image: mode.apply(decoded),
        mode,
    })
}

/// Normalize a record field, `None` when the field is not an image.
pub fn normalize_field(field: &Field) -> Option<CanonicalImage> {
    ImageInput::from_field(field).and_then(|input| convert_to_image(&input))
}

fn load_from_path(path: &Path) -> Option<DynamicImage> {
    if !path.is_file() {
        debug!(path = %path.display(), "image path does not exist");
        return None;
    }
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
    match decoded {
        Ok(image) => Some(image),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "failed to decode image file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rgb_array(h: usize, w: usize) -> PixelArray {
        PixelArray::new(&[h, w, 3], PixelData::U8(vec![200; h * w * 3])).expect("valid shape")
    }

    #[test]
    fn decoded_image_is_converted_to_rgb() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(4, 2));
        let image = convert_to_image(&ImageInput::Decoded(rgba)).expect("image");
        assert_eq!((image.width(), image.height()), (4, 2));
        assert_eq!(image.mode(), ColorMode::Rgb);
        assert!(matches!(image.as_dynamic(), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn arrays_in_every_channel_count_convert() {
        for channels in [1usize, 3, 4] {
            let data = PixelData::U8(vec![10; 6 * 5 * channels]);
            let array = PixelArray::new(&[6, 5, channels], data).expect("valid shape");
            let image = convert_to_image(&ImageInput::Array(array)).expect("image");
            assert_eq!((image.width(), image.height()), (5, 6), "channels = {channels}");
        }

        let flat = PixelArray::new(&[3, 7], PixelData::U8(vec![0; 21])).expect("2d shape");
        let image = convert_to_image(&flat.into()).expect("image");
        assert_eq!((image.width(), image.height()), (7, 3));
    }

    #[test]
    fn normalized_floats_are_scaled() {
        let array =
            PixelArray::new(&[1, 1, 3], PixelData::F32(vec![0.0, 0.5, 1.0])).expect("shape");
        let image = convert_to_image(&array.into()).expect("image");
        let px = image.as_dynamic().to_rgb8().get_pixel(0, 0).0;
        assert_eq!(px, [0, 127, 255]);

        let data = PixelData::F64(vec![2.0, 100.0, 300.0]);
        let array = PixelArray::new(&[1, 1, 3], data).expect("shape");
        let image = convert_to_image(&array.into()).expect("image");
        let px = image.as_dynamic().to_rgb8().get_pixel(0, 0).0;
        assert_eq!(px, [2, 100, 255]);
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        assert!(PixelArray::new(&[2, 2, 2], PixelData::U8(vec![0; 8])).is_none());
        assert!(PixelArray::new(&[2, 2, 3], PixelData::U8(vec![0; 11])).is_none());
        assert!(PixelArray::new(&[2], PixelData::U8(vec![0; 2])).is_none());
        assert!(PixelArray::from_json(&json!([[1, 2], [3]])).is_none());
        assert!(PixelArray::from_json(&json!([1, 2, 3])).is_none());
    }

    #[test]
    fn json_arrays_become_pixel_data() {
        let value = json!([[[255, 0, 0], [0, 255, 0]], [[0, 0, 255], [9, 9, 9]]]);
        let array = PixelArray::from_json(&value).expect("array");
        assert_eq!(array.shape(), [2, 2, 3]);

        let image = normalize_field(&Field::Json(value)).expect("image");
        assert_eq!(image.as_dynamic().to_rgb8().get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn encoded_bytes_and_paths_decode() {
        let source = convert_to_image(&rgb_array(3, 8).into()).expect("image");
        let png = source.encode_png().expect("encode");

        let from_bytes = convert_to_image(&ImageInput::Encoded(png.clone())).expect("bytes");
        assert_eq!((from_bytes.width(), from_bytes.height()), (8, 3));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        std::fs::write(&path, &png).expect("write");
        let from_path = convert_to_image(&ImageInput::Path(path.clone())).expect("path");
        assert_eq!((from_path.width(), from_path.height()), (8, 3));

        let field = Field::Text(path.to_string_lossy().into_owned());
        assert!(normalize_field(&field).is_some());
    }

    #[test]
    fn bad_inputs_yield_none() {
        assert!(convert_to_image(&ImageInput::Encoded(b"not an image".to_vec())).is_none());
        let missing = ImageInput::Path(PathBuf::from("/nonexistent/frame.png"));
        assert!(convert_to_image(&missing).is_none());
        assert!(normalize_field(&Field::Int(42)).is_none());
        assert!(normalize_field(&Field::Null).is_none());
        assert!(normalize_field(&Field::Bool(true)).is_none());
    }

    #[test]
    fn mode_can_be_selected() {
        let image =
            convert_to_image_with_mode(&rgb_array(2, 2).into(), ColorMode::Luma).expect("luma");
        assert_eq!(image.mode(), ColorMode::Luma);
        assert!(matches!(image.as_dynamic(), DynamicImage::ImageLuma8(_)));
        assert_eq!(ColorMode::Rgba.channels(), 4);
    }
}
