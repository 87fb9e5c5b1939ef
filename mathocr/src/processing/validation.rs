/// Extensions accepted on the client-supplied filename.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "heic"];

/// Content types accepted after sniffing the stored bytes.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/bmp",
    "image/tiff",
    "image/heic",
];

/// Lowercased text after the last `.`, if the filename has one.
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
}

/// The lowercased extension when it is in [`ALLOWED_EXTENSIONS`].
pub fn allowed_extension(file_name: &str) -> Option<String> {
    file_extension(file_name).filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}
