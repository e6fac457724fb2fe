//! Raster images as PDF image XObjects

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::layout::Rect;

/// An image decoded to 8-bit RGB
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Decode PNG, JPEG or any other format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }
    Ok(DecodedImage {
        width,
        height,
        rgb: rgb.into_raw(),
    })
}

/// Add an image XObject to the document.
pub fn add_image_xobject(doc: &mut Document, image: DecodedImage) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(image.width)));
    dict.set("Height", Object::Integer(i64::from(image.height)));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    doc.add_object(Stream::new(dict, image.rgb))
}

/// Largest rectangle with the image's aspect ratio that fits in `bounds`,
/// centred.
pub fn fit_within(width: u32, height: u32, bounds: &Rect) -> Rect {
    let scale = (bounds.width / width as f32).min(bounds.height / height as f32);
    let w = width as f32 * scale;
    let h = height as f32 * scale;
    Rect::new(
        bounds.x + (bounds.width - w) / 2.0,
        bounds.y + (bounds.height - h) / 2.0,
        w,
        h,
    )
}

/// Content op painting image `name` into `rect`
pub fn image_op(name: &str, rect: &Rect) -> String {
    format!(
        "q {:.3} 0 0 {:.3} {:.3} {:.3} cm /{} Do Q\n",
        rect.width, rect.height, rect.x, rect.y, name
    )
}
