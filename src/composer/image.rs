use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use std::path::Path;

/// What a browser file reader reports for files it cannot type.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

pub fn encode_data_url(bytes: &[u8], mime_type: &str) -> String {
    let base64_image = general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime_type, base64_image)
}

/// Media type from magic bytes, then from the file extension.
pub fn sniff_mime_type(bytes: &[u8], file_name: &str) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }
    if bytes.starts_with(b"BM") {
        return "image/bmp";
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        _ => UNKNOWN_MIME_TYPE,
    }
}

/// Encode bytes the UI already holds in memory.
pub fn capture_image_bytes(bytes: &[u8], file_name: &str) -> String {
    let mime_type = sniff_mime_type(bytes, file_name);
    log::debug!("📊 Captured {} ({} bytes, {})", file_name, bytes.len(), mime_type);
    encode_data_url(bytes, mime_type)
}

/// Read a selected photo and turn it into a data URL once the read completes.
pub async fn capture_image(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let image_data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    Ok(capture_image_bytes(&image_data, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InlineImage;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url(&[0, 0, 0], "image/png"), "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_sniff_prefers_magic_bytes() {
        assert_eq!(sniff_mime_type(PNG_HEADER, "photo.jpg"), "image/png");
        assert_eq!(sniff_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0], "photo"), "image/jpeg");
        assert_eq!(sniff_mime_type(b"RIFF\0\0\0\0WEBPVP8 ", "x.bin"), "image/webp");
    }

    #[test]
    fn test_sniff_falls_back_to_extension() {
        assert_eq!(sniff_mime_type(b"????", "IMG_0001.HEIC"), "image/heic");
        assert_eq!(sniff_mime_type(b"????", "notes.txt"), UNKNOWN_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_capture_image_from_file() {
        let path = std::env::temp_dir().join(format!("style-consult-capture-{}.png", std::process::id()));
        tokio::fs::write(&path, PNG_HEADER).await.unwrap();

        let data_url = capture_image(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        let image = InlineImage::parse(&data_url).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(general_purpose::STANDARD.decode(image.data).unwrap(), PNG_HEADER);
    }

    #[tokio::test]
    async fn test_capture_missing_file_fails() {
        let path = std::env::temp_dir().join("style-consult-does-not-exist.png");
        assert!(capture_image(&path).await.is_err());
    }
}
