//! Placement blocks

use crate::constants::{
    BLOCK_BORDER_WIDTH, BLOCK_PADDING_PT, BODY_FONT_SIZE, QR_MIN_SIZE_PT, SHORT_CODE_FONT_SIZE,
    TITLE_FONT_MAX, TITLE_FONT_MIN,
};
use crate::error::RenderError;
use crate::layout::{Rect, voucher_qr_size};
use crate::resolve::{Asset, ResolvedBlock, ResolvedVoucher};

use super::raster::{decode_image, fit_within, image_op};
use super::page::PageCanvas;
use super::qr::qr_ops;
use super::text::{FONT_BOLD, FONT_REGULAR, centered_text_op, fit_font_size, line_height, text_op, wrap_text};

/// Draw one placement inside `bounds`.
pub(crate) fn draw_block(
    canvas: &mut PageCanvas<'_>,
    position: u8,
    bounds: &Rect,
    block: &ResolvedBlock,
) -> Result<(), RenderError> {
    match block {
        ResolvedBlock::Voucher(voucher) => draw_voucher(canvas, position, bounds, voucher)?,
        ResolvedBlock::Image { asset, caption } => {
            draw_image(canvas, position, bounds, asset, caption.as_deref())
        }
        ResolvedBlock::Ad {
            title,
            description,
            image,
        } => draw_ad(
            canvas,
            position,
            bounds,
            title,
            description.as_deref(),
            image.as_ref(),
        ),
        ResolvedBlock::Sponsored {
            title,
            description,
            provider_name,
        } => draw_sponsored(canvas, bounds, title, description.as_deref(), provider_name),
    }
    Ok(())
}

// =============================================================================
// Text Column
// =============================================================================

/// Lines stacked downward from the top of an area, dropped once it is full
struct TextColumn {
    x: f32,
    width: f32,
    bottom: f32,
    cursor: f32,
    ops: String,
}

impl TextColumn {
    fn new(area: &Rect) -> Self {
        Self {
            x: area.x,
            width: area.width,
            bottom: area.y,
            cursor: area.top(),
            ops: String::new(),
        }
    }

    fn line(&mut self, font: &str, size: f32, text: &str) -> bool {
        let height = line_height(size);
        if self.cursor - height < self.bottom {
            return false;
        }
        self.cursor -= height;
        self.ops
            .push_str(&text_op(font, size, self.x, self.cursor + size * 0.25, text));
        true
    }

    fn paragraph(&mut self, font: &str, size: f32, text: &str, max_lines: usize) {
        let room = ((self.cursor - self.bottom) / line_height(size)).floor().max(0.0) as usize;
        for line in wrap_text(text, size, self.width, room.min(max_lines)) {
            self.line(font, size, &line);
        }
    }

    fn gap(&mut self, points: f32) {
        self.cursor -= points;
    }

    fn finish(self) -> String {
        self.ops
    }
}

fn border_op(rect: &Rect) -> String {
    format!(
        "q {} w 0.4 G {:.2} {:.2} {:.2} {:.2} re S Q\n",
        BLOCK_BORDER_WIDTH, rect.x, rect.y, rect.width, rect.height
    )
}

fn title_size(title: &str, area: &Rect) -> f32 {
    fit_font_size(title, area.width, TITLE_FONT_MIN, TITLE_FONT_MAX)
        .min((area.height * 0.3).max(TITLE_FONT_MIN))
}

// =============================================================================
// Vouchers
// =============================================================================

fn draw_voucher(
    canvas: &mut PageCanvas<'_>,
    position: u8,
    bounds: &Rect,
    voucher: &ResolvedVoucher,
) -> Result<(), RenderError> {
    let page_number = canvas.page_number;
    let code_error = |message: String| RenderError::VoucherCode {
        page_number,
        position,
        message,
    };

    let payload = voucher
        .qr_payload
        .as_deref()
        .ok_or_else(|| code_error(format!("no QR payload for voucher {}", voucher.voucher_id)))?;

    let inner = bounds.inset(BLOCK_PADDING_PT);
    let qr_size = voucher_qr_size(bounds);
    if qr_size < QR_MIN_SIZE_PT {
        return Err(code_error(format!(
            "slot leaves {qr_size:.1}pt for the QR code, at least {QR_MIN_SIZE_PT}pt needed"
        )));
    }

    let qr_x = inner.right() - qr_size;
    let qr_y = inner.top() - qr_size;
    let qr = qr_ops(payload, qr_x, qr_y, qr_size).map_err(code_error)?;

    canvas.push(border_op(bounds));
    canvas.push(qr);
    canvas.push(centered_text_op(
        FONT_BOLD,
        SHORT_CODE_FONT_SIZE,
        qr_x + qr_size / 2.0,
        qr_y - SHORT_CODE_FONT_SIZE,
        &format!("{} {}", voucher.short_code, voucher.checksum),
    ));

    let text_area = Rect::new(
        inner.x,
        inner.y,
        (inner.width - qr_size - BLOCK_PADDING_PT).max(0.0),
        inner.height,
    );
    let mut column = TextColumn::new(&text_area);
    column.paragraph(FONT_BOLD, title_size(&voucher.title, &text_area), &voucher.title, 2);
    column.line(FONT_BOLD, BODY_FONT_SIZE + 2.0, &voucher.discount);
    if let Some(provider) = &voucher.provider_name {
        column.line(FONT_REGULAR, BODY_FONT_SIZE, provider);
    }
    if let Some(expires_at) = voucher.expires_at {
        column.line(
            FONT_REGULAR,
            BODY_FONT_SIZE,
            &format!("Valid until {}", expires_at.format("%Y-%m-%d")),
        );
    }
    if let Some(description) = &voucher.description {
        column.gap(2.0);
        column.paragraph(FONT_REGULAR, BODY_FONT_SIZE, description, usize::MAX);
    }
    canvas.push(column.finish());

    Ok(())
}

// =============================================================================
// Images
// =============================================================================

/// Paint an asset fitted into `area`, or a warning note when it cannot be drawn.
fn paint_asset(canvas: &mut PageCanvas<'_>, position: u8, area: &Rect, asset: &Asset) {
    match asset {
        Asset::Loaded(bytes) => match decode_image(bytes) {
            Ok(image) => {
                let fitted = fit_within(image.width, image.height, area);
                let name = canvas.add_image(image);
                canvas.push(image_op(&name, &fitted));
            }
            Err(err) => canvas.warn(position, area, format!("Image could not be decoded: {err}")),
        },
        Asset::Unavailable { url, reason } => {
            canvas.warn(position, area, format!("Image unavailable: {url} ({reason})"))
        }
    }
}

fn draw_image(
    canvas: &mut PageCanvas<'_>,
    position: u8,
    bounds: &Rect,
    asset: &Asset,
    caption: Option<&str>,
) {
    let mut area = *bounds;
    if let Some(caption) = caption {
        let caption_height = line_height(BODY_FONT_SIZE);
        canvas.push(centered_text_op(
            FONT_REGULAR,
            BODY_FONT_SIZE,
            bounds.center_x(),
            bounds.y + BODY_FONT_SIZE * 0.25,
            caption,
        ));
        area.y += caption_height;
        area.height = (area.height - caption_height).max(0.0);
    }
    paint_asset(canvas, position, &area, asset);
}

// =============================================================================
// Ads
// =============================================================================

fn draw_ad(
    canvas: &mut PageCanvas<'_>,
    position: u8,
    bounds: &Rect,
    title: &str,
    description: Option<&str>,
    image: Option<&Asset>,
) {
    canvas.push(border_op(bounds));
    let inner = bounds.inset(BLOCK_PADDING_PT);

    let text_area = match image {
        Some(asset) => {
            let image_width = (inner.width * 0.4).min(inner.height * 1.5);
            let image_area = Rect::new(
                inner.right() - image_width,
                inner.y,
                image_width,
                inner.height,
            );
            paint_asset(canvas, position, &image_area, asset);
            Rect::new(
                inner.x,
                inner.y,
                (inner.width - image_width - BLOCK_PADDING_PT).max(0.0),
                inner.height,
            )
        }
        None => inner,
    };

    let mut column = TextColumn::new(&text_area);
    column.paragraph(FONT_BOLD, title_size(title, &text_area), title, 2);
    if let Some(description) = description {
        column.gap(2.0);
        column.paragraph(FONT_REGULAR, BODY_FONT_SIZE, description, usize::MAX);
    }
    canvas.push(column.finish());
}

fn draw_sponsored(
    canvas: &mut PageCanvas<'_>,
    bounds: &Rect,
    title: &str,
    description: Option<&str>,
    provider_name: &str,
) {
    canvas.push(format!(
        "q 0.94 g {:.2} {:.2} {:.2} {:.2} re f Q\n",
        bounds.x, bounds.y, bounds.width, bounds.height
    ));
    canvas.push(border_op(bounds));

    let inner = bounds.inset(BLOCK_PADDING_PT);
    let footer = line_height(BODY_FONT_SIZE);
    canvas.push(text_op(
        FONT_REGULAR,
        BODY_FONT_SIZE,
        inner.x,
        inner.y + BODY_FONT_SIZE * 0.25,
        &format!("Sponsored by {provider_name}"),
    ));

    let text_area = Rect::new(
        inner.x,
        inner.y + footer,
        inner.width,
        (inner.height - footer).max(0.0),
    );
    let mut column = TextColumn::new(&text_area);
    column.paragraph(FONT_BOLD, title_size(title, &text_area), title, 2);
    if let Some(description) = description {
        column.gap(2.0);
        column.paragraph(FONT_REGULAR, BODY_FONT_SIZE, description, usize::MAX);
    }
    canvas.push(column.finish());
}
