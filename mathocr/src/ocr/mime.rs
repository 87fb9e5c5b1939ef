use infer::Infer;

/// Reported when the bytes match no known signature, as `file --mime-type` does.
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Magic-byte content sniffing. Never consults filenames or client headers.
pub trait MimeDetector: Send + Sync {
    fn detect_mime_type(&self, bytes: &[u8]) -> String;
}

/// [`infer`] plus a HEIC check ahead of it: `infer` reports every HEIF brand
/// as `image/heif`, but HEVC-coded stills should come out as `image/heic`.
pub struct InferMimeDetector {
    infer: Infer,
}

const HEIC_BRANDS: &[&[u8; 4]] = &[b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx"];

fn is_heic(buf: &[u8]) -> bool {
    if buf.len() < 12 || &buf[4..8] != b"ftyp" {
        return false;
    }
    let major_brand = &buf[8..12];
    HEIC_BRANDS.iter().any(|brand| major_brand == &brand[..])
}

impl InferMimeDetector {
    pub fn new() -> Self {
        Self {
            infer: Infer::new(),
        }
    }
}

impl Default for InferMimeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeDetector for InferMimeDetector {
    fn detect_mime_type(&self, bytes: &[u8]) -> String {
        if is_heic(bytes) {
            return "image/heic".to_string();
        }
        self.infer
            .get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string())
    }
}
