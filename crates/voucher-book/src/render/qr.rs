//! Vector QR codes
//!
//! Dark modules are drawn as filled rectangles, one per horizontal run, so the
//! code stays sharp at any print resolution.

use qrcode::{Color, QrCode};

/// Modules of light border around the code
const QUIET_ZONE: usize = 2;

/// Content stream ops drawing `payload` as a QR code of edge `size`, with its
/// lower-left corner at `(x, y)`.
pub fn qr_ops(payload: &str, x: f32, y: f32, size: f32) -> Result<String, String> {
    if payload.is_empty() {
        return Err("empty QR payload".to_string());
    }
    let code = QrCode::new(payload.as_bytes()).map_err(|e| e.to_string())?;
    let width = code.width();
    let colors = code.to_colors();

    let module = size / (width + 2 * QUIET_ZONE) as f32;
    let origin_x = x + QUIET_ZONE as f32 * module;
    let top = y + size - QUIET_ZONE as f32 * module;

    let mut ops = String::from("q 0 g\n");
    for (row, modules) in colors.chunks(width).enumerate() {
        let row_y = top - (row + 1) as f32 * module;
        let mut col = 0;
        while col < width {
            if modules[col] != Color::Dark {
                col += 1;
                continue;
            }
            let start = col;
            while col < width && modules[col] == Color::Dark {
                col += 1;
            }
            ops.push_str(&format!(
                "{:.3} {:.3} {:.3} {:.3} re\n",
                origin_x + start as f32 * module,
                row_y,
                (col - start) as f32 * module,
                module
            ));
        }
    }
    ops.push_str("f Q\n");
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_rectangles() {
        let ops = qr_ops("https://vouchers.test/r/ABCD1234", 10.0, 10.0, 80.0).unwrap();
        assert!(ops.starts_with("q 0 g"));
        assert!(ops.trim_end().ends_with("f Q"));
        assert!(ops.matches(" re").count() > 20);
    }

    #[test]
    fn output_is_stable() {
        let a = qr_ops("payload", 0.0, 0.0, 50.0).unwrap();
        let b = qr_ops("payload", 0.0, 0.0, 50.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_and_oversized_payloads() {
        assert!(qr_ops("", 0.0, 0.0, 50.0).is_err());
        assert!(qr_ops(&"x".repeat(8000), 0.0, 0.0, 50.0).is_err());
    }
}
