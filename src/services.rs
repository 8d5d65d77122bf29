//! HTTP collaborators: inpaint, OCR, translation, and the health probe.

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, RgbaImage};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};
use crate::selection::ImageSelection;

/// The remote side of the session. Implemented over HTTP for real use and
/// stubbed in tests.
pub trait Collaborators: Send + Sync {
    /// `image_png` and `mask_png` share dimensions; the result replaces the
    /// background.
    fn inpaint(&self, image_png: Vec<u8>, mask_png: Vec<u8>) -> Result<RgbaImage>;

    fn ocr(&self, image_png: Vec<u8>, selections: &[ImageSelection]) -> Result<Vec<OcrItem>>;

    fn translate(&self, items: &[OcrItem]) -> Result<Vec<Translation>>;

    fn health(&self) -> Result<()>;
}

#[derive(Debug, Deserialize)]
pub struct InpaintResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub image: Option<String>,
    pub format: Option<String>,
}

/// One selection as the OCR endpoint wants it: string id, image pixels.
#[derive(Debug, Serialize)]
pub struct OcrSelection {
    pub id: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl From<&ImageSelection> for OcrSelection {
    fn from(s: &ImageSelection) -> Self {
        Self {
            id: s.id.to_string(),
            left: s.left,
            top: s.top,
            width: s.width,
            height: s.height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcrItem {
    pub id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: String,
    pub original: String,
    pub translated: String,
}

pub struct HttpServices {
    base_url: String,
    client: Client,
    probe: Client,
}

impl HttpServices {
    pub fn new(base_url: &str, request_timeout: Duration, health_timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(request_timeout).build()?,
            probe: Client::builder().timeout(health_timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn png_part(bytes: Vec<u8>, name: &str) -> Result<Part> {
    Ok(Part::bytes(bytes).file_name(name.to_string()).mime_str("image/png")?)
}

/// Turn a non-2xx answer into an error carrying the body text.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "could not read error body".to_string());
    Err(AnnotateError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Decode a base64 image payload, with or without a `data:` URL prefix.
pub fn decode_image_payload(payload: &str, format: Option<&str>) -> Result<RgbaImage> {
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| AnnotateError::Decode("data URL without payload".to_string()))?,
        None => payload,
    };
    let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
    let decoded = match format.and_then(ImageFormat::from_extension) {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)?,
        None => image::load_from_memory(&bytes)?,
    };
    Ok(decoded.to_rgba8())
}

impl InpaintResponse {
    pub fn into_image(self) -> Result<RgbaImage> {
        if !self.success {
            return Err(AnnotateError::Network(self.message));
        }
        let payload = self
            .image
            .ok_or_else(|| AnnotateError::Decode("inpaint response carried no image".to_string()))?;
        decode_image_payload(&payload, self.format.as_deref())
    }
}

impl Collaborators for HttpServices {
    fn inpaint(&self, image_png: Vec<u8>, mask_png: Vec<u8>) -> Result<RgbaImage> {
        let form = Form::new()
            .part("image", png_part(image_png, "image.png")?)
            .part("mask", png_part(mask_png, "mask.png")?);
        log::info!("POST {}", self.url("inpaint"));
        let response = check_status(self.client.post(self.url("inpaint")).multipart(form).send()?)?;
        let body: InpaintResponse = response.json()?;
        log::debug!("inpaint: {}", body.message);
        body.into_image()
    }

    fn ocr(&self, image_png: Vec<u8>, selections: &[ImageSelection]) -> Result<Vec<OcrItem>> {
        let wire: Vec<OcrSelection> = selections.iter().map(OcrSelection::from).collect();
        let form = Form::new()
            .part("image", png_part(image_png, "image.png")?)
            .text("selections", serde_json::to_string(&wire)?);
        log::info!("POST {} ({} selection(s))", self.url("ocr"), wire.len());
        let response = check_status(self.client.post(self.url("ocr")).multipart(form).send()?)?;
        Ok(response.json()?)
    }

    fn translate(&self, items: &[OcrItem]) -> Result<Vec<Translation>> {
        log::info!("POST {} ({} item(s))", self.url("translate"), items.len());
        let response = check_status(self.client.post(self.url("translate")).json(items).send()?)?;
        Ok(response.json()?)
    }

    fn health(&self) -> Result<()> {
        check_status(self.probe.get(self.url("health")).send()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn payload() -> String {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let bytes = crate::raster::encode_png(&img).unwrap();
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn selections_go_out_with_string_ids() {
        let sel = ImageSelection {
            id: 7,
            left: 1.5,
            top: 2.0,
            width: 30.0,
            height: 40.0,
        };
        let json = serde_json::to_value(vec![OcrSelection::from(&sel)]).unwrap();
        assert_eq!(json[0]["id"], "7");
        assert_eq!(json[0]["left"], 1.5);
    }

    #[test]
    fn payload_decodes_with_or_without_data_prefix() {
        let raw = payload();
        let plain = decode_image_payload(&raw, Some("png")).unwrap();
        let url = decode_image_payload(&format!("data:image/png;base64,{raw}"), None).unwrap();
        assert_eq!(plain.dimensions(), (3, 2));
        assert_eq!(plain, url);
    }

    #[test]
    fn reported_failure_is_a_network_error() {
        let resp: InpaintResponse =
            serde_json::from_str(r#"{"success": false, "message": "Inpainting failed: boom"}"#).unwrap();
        match resp.into_image() {
            Err(AnnotateError::Network(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let resp = InpaintResponse {
            success: true,
            message: String::new(),
            image: Some("!!not base64!!".into()),
            format: Some("png".into()),
        };
        assert!(matches!(resp.into_image(), Err(AnnotateError::Decode(_))));
    }

    #[test]
    fn translation_wire_shape() {
        let t: Vec<Translation> =
            serde_json::from_str(r#"[{"id":"1","original":"元気","translated":"Fine"}]"#).unwrap();
        assert_eq!(t[0].translated, "Fine");
    }
}
