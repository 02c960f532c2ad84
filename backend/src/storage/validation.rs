/// Extensions accepted by `/predict`. Only the name is checked, never the content.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

/// A file part read from the multipart body, before validation.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An upload that passed validation and may be stored and classified.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_name: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Why an upload was turned away. The message is shown to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("No file part in request.")]
    MissingFilePart,
    #[error("No file selected.")]
    EmptyFilename,
    #[error("Unsupported file type. Please upload a PNG/JPG/GIF/BMP/WEBP.")]
    UnsupportedType,
}

/// Lower-cased text after the last `.`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename).is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
}

pub fn validate_upload(part: Option<FilePart>) -> Result<UploadedImage, UploadRejection> {
    let part = part.ok_or(UploadRejection::MissingFilePart)?;
    if part.filename.is_empty() {
        return Err(UploadRejection::EmptyFilename);
    }
    if !allowed_file(&part.filename) {
        return Err(UploadRejection::UnsupportedType);
    }

    let extension = file_extension(&part.filename).unwrap_or_default();
    Ok(UploadedImage {
        original_name: part.filename,
        extension,
        bytes: part.bytes,
    })
}
