use actix_multipart::{Multipart, MultipartError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::TryStreamExt;
use log::debug;
use sha2::{Digest, Sha256};

use crate::error::AnalyzeError;

pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(
        bytes: Vec<u8>,
        declared_type: Option<&str>,
        file_name: Option<String>,
    ) -> Result<Self, AnalyzeError> {
        let mime_type = resolve_mime_type(&bytes, declared_type)?;
        Ok(Self {
            bytes,
            mime_type,
            file_name,
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

fn resolve_mime_type(bytes: &[u8], declared_type: Option<&str>) -> Result<String, AnalyzeError> {
    if let Some(declared) = declared_type.filter(|t| t.starts_with("image/")) {
        return Ok(declared.to_string());
    }

    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .map_err(|_| {
            AnalyzeError::InvalidImage(format!(
                "unsupported content type {}",
                declared_type.unwrap_or("(none)")
            ))
        })
}

/// Reads the `image` field out of a multipart form. Other fields are drained and ignored.
/// A form with no parts at all (an empty `FormData`) counts as a missing image.
pub async fn read_image(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<UploadedImage, AnalyzeError> {
    let mut found: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut seen_field = false;

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(MultipartError::Incomplete) if found.is_none() => {
                debug!("Multipart stream ended before an image field");
                return Err(AnalyzeError::MissingImage);
            }
            Err(e) if !seen_field => {
                debug!("Multipart form has no readable fields: {}", e);
                return Err(AnalyzeError::MissingImage);
            }
            Err(e) => return Err(e.into()),
        };
        seen_field = true;

        if field.name() != Some(IMAGE_FIELD) || found.is_some() {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let declared_type = field.content_type().map(|mime| mime.essence_str().to_string());
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(AnalyzeError::InvalidImage(format!(
                    "image exceeds the {} byte limit",
                    max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        debug!("Received image field: {} bytes, type {:?}", data.len(), declared_type);
        if !data.is_empty() {
            found = Some((data, declared_type, file_name));
        }
    }

    let (bytes, declared_type, file_name) = found.ok_or(AnalyzeError::MissingImage)?;
    UploadedImage::new(bytes, declared_type.as_deref(), file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn declared_image_type_is_trusted() {
        let image = UploadedImage::new(b"abc".to_vec(), Some("image/webp"), None).unwrap();
        assert_eq!(image.mime_type, "image/webp");
        assert_eq!(image.data_url(), "data:image/webp;base64,YWJj");
    }

    #[test]
    fn generic_type_is_sniffed_from_bytes() {
        let image =
            UploadedImage::new(PNG_MAGIC.to_vec(), Some("application/octet-stream"), None).unwrap();
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn unrecognizable_bytes_are_rejected() {
        let err = UploadedImage::new(b"plain text".to_vec(), Some("text/plain"), None).unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidImage(_)));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let image = UploadedImage::new(b"abc".to_vec(), Some("image/jpeg"), None).unwrap();
        assert_eq!(
            image.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
