pub mod upload_store;
pub mod validation;

pub use upload_store::{secure_filename, StorageError, StoredUpload, UploadStore};
pub use validation::{allowed_file, validate_upload, FilePart, UploadRejection, UploadedImage};
