//! Extension to MIME type mapping for served media files.

/// The media types the camera produces, as a fixed lookup. Anything else
/// defers to `mime_guess`, with `application/octet-stream` as the fallback.
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("heic", "image/heic"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn content_type_for(file_name: &str) -> String {
    if let Some(ext) = extension(file_name) {
        if let Some((_, mime)) = MEDIA_TYPES.iter().find(|(e, _)| *e == ext) {
            return (*mime).to_string();
        }
    }
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub fn is_video_file(file_name: &str) -> bool {
    extension(file_name)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{content_type_for, is_video_file};

    #[test]
    fn known_media_extensions() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("clip.mov"), "video/quicktime");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(content_type_for("blob.xyz123"), "application/octet-stream");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn video_flag_only_for_mp4_and_mov() {
        assert!(is_video_file("v.mp4"));
        assert!(is_video_file("v.MOV"));
        assert!(!is_video_file("p.jpg"));
        assert!(!is_video_file("p"));
    }
}
