use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::{render::svg, QrCode};
use shared::error::{AppError, AppResult};

/// Renders `payload` as an SVG QR code and returns it as a `data:` URI
/// that clients can drop straight into an `<img>` tag.
pub fn render_data_uri(payload: &str) -> AppResult<String> {
    let image = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::ExternalServiceError(format!("QR コードを生成できません: {e}")))?
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#FFFFFF"))
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}
