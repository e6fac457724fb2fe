//! Text helpers for the built-in Helvetica fonts
//!
//! Strings are written as PDF literal strings in WinAnsiEncoding. Characters
//! outside that encoding are replaced with `?`.

use crate::constants::{HELVETICA_CHAR_WIDTH_RATIO, LINE_HEIGHT_FACTOR};

/// Regular font resource name
pub const FONT_REGULAR: &str = "F1";
/// Bold font resource name
pub const FONT_BOLD: &str = "F2";

/// Map a character to its WinAnsiEncoding byte
fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '\u{20ac}' => Some(0x80),
        '\u{2026}' => Some(0x85),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\n' | '\t' | '\r' => Some(b' '),
        _ => None,
    }
}

/// Encode text as a PDF literal string, parentheses included.
pub fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for c in text.chars() {
        match win_ansi_byte(c).unwrap_or(b'?') {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            byte if byte > 127 => out.push_str(&format!("\\{byte:03o}")),
            byte => out.push(char::from(byte)),
        }
    }
    out.push(')');
    out
}

/// Approximate rendered width of `text` in points
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * HELVETICA_CHAR_WIDTH_RATIO
}

pub fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR
}

/// Largest size in `min..=max` at which `text` fits in `width`
pub fn fit_font_size(text: &str, width: f32, min: f32, max: f32) -> f32 {
    let chars = text.chars().count().max(1) as f32;
    (width / (chars * HELVETICA_CHAR_WIDTH_RATIO)).clamp(min, max)
}

/// Greedy word wrap.
///
/// Words longer than a line are split. When `max_lines` cuts the text short,
/// the last line ends with "...".
pub fn wrap_text(text: &str, font_size: f32, max_width: f32, max_lines: usize) -> Vec<String> {
    if max_lines == 0 {
        return Vec::new();
    }
    let max_chars = ((max_width / (font_size * HELVETICA_CHAR_WIDTH_RATIO)).floor() as usize).max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        if word.is_empty() {
            continue;
        }
        let word: String = word.into_iter().collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let keep = max_chars.saturating_sub(3);
            if last.chars().count() > keep {
                *last = last.chars().take(keep).collect();
            }
            last.push_str("...");
        }
    }
    lines
}

/// `BT ... ET` op drawing one line of text with its baseline at `(x, y)`
pub fn text_op(font: &str, size: f32, x: f32, y: f32, text: &str) -> String {
    format!(
        "BT /{} {:.2} Tf {:.2} {:.2} Td {} Tj ET\n",
        font,
        size,
        x,
        y,
        pdf_string(text)
    )
}

/// Text op centred horizontally on `center_x`
pub fn centered_text_op(font: &str, size: f32, center_x: f32, y: f32, text: &str) -> String {
    let x = center_x - text_width(text, size) / 2.0;
    text_op(font, size, x, y, text)
}
