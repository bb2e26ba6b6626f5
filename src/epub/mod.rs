//! EPUB containers, whose encryption state lives in `META-INF/encryption.xml`.
//!
//! Every file entry except `mimetype` and the encryption manifest itself is a
//! resource. Encrypting one appends an `EncryptedData` record to the outgoing
//! encryption manifest instead of touching the package document.

mod reader;
mod writer;

pub use reader::{EpubReader, EpubResource};
pub use writer::EpubWriter;

/// Location of the media type declaration.
pub const MIMETYPE_LOCATION: &str = "mimetype";

/// Content of the media type declaration.
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// Location of the OCF container document.
pub const CONTAINER_LOCATION: &str = "META-INF/container.xml";

/// Guess a resource's media type from its file extension.
pub fn guess_media_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xhtml" | "xht" => "application/xhtml+xml",
        "html" | "htm" => "text/html",
        "opf" => "application/oebps-package+xml",
        "ncx" => "application/x-dtbncx+xml",
        "xml" => "application/xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "smil" => "application/smil+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Whether content of this type is already compressed.
pub fn is_precompressed(media_type: &str) -> bool {
    if media_type == "image/svg+xml" {
        return false;
    }
    media_type.starts_with("image/")
        || media_type.starts_with("audio/")
        || media_type.starts_with("video/")
        || matches!(media_type, "font/woff" | "font/woff2")
}
