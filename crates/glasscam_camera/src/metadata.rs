//! Response-shaping metadata derived from filesystem stat. Computed fresh
//! on every gallery request, never persisted.

use std::time::SystemTime;

use chrono::{DateTime, Local};
use glasscam_http::{content_type_for, is_video_file};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PhotoMetadata {
    pub name: String,
    pub size: u64,
    /// `yyyy-MM-dd HH:mm:ss`, local time.
    pub modified: String,
    pub mime_type: String,
    pub url: String,
    pub download_url: String,
    pub is_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl PhotoMetadata {
    pub fn from_stat(name: &str, size: u64, modified: SystemTime) -> Self {
        let stamp: DateTime<Local> = modified.into();
        let encoded = urlencoding::encode(name);
        let url = format!("/api/photo?file={encoded}");
        let download_url = format!("/api/download?file={encoded}");
        let is_video = is_video_file(name);
        let thumbnail_url = (!is_video).then(|| url.clone());

        Self {
            name: name.to_string(),
            size,
            modified: stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            mime_type: content_type_for(name),
            url,
            download_url,
            is_video,
            thumbnail_url,
        }
    }
}
