//! Photos-directory scanning and the embedded gallery page.

use std::path::Path;
use std::time::SystemTime;

use tracing::warn;

/// Extensions that show up in the gallery. Everything else in the photos
/// directory is ignored.
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "webp", "bmp", "mp4", "mov",
];

#[derive(Debug, Clone)]
pub(crate) struct MediaFile {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

pub(crate) fn is_media_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// All media files in `dir`, sorted newest-first by modification time.
pub(crate) async fn scan_media(dir: &Path) -> anyhow::Result<Vec<MediaFile>> {
    let mut out = Vec::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_media_name(&name) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                warn!(target: "glasscam::camera", file = %name, error = ?e, "Stat failed");
                continue;
            }
        };
        out.push(MediaFile {
            name,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    out.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(out)
}

/// Self-contained gallery page served at `/`. Polls `/api/gallery` every
/// ten seconds and degrades to an inline error string on fetch failure.
pub(crate) const GALLERY_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Camera Gallery</title>
<style>
  body { font-family: -apple-system, sans-serif; margin: 0; background: #111; color: #eee; }
  header { padding: 12px 16px; background: #1b1b1b; display: flex; gap: 8px; align-items: center; }
  header h1 { font-size: 1.1em; margin: 0 auto 0 0; }
  button { background: #2d6cdf; color: #fff; border: 0; border-radius: 6px; padding: 8px 14px; cursor: pointer; }
  button:hover { background: #3c7cf0; }
  #meta { padding: 8px 16px; color: #999; font-size: 0.85em; }
  #grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 10px; padding: 16px; }
  .card { background: #1b1b1b; border-radius: 8px; overflow: hidden; }
  .card img, .card video { width: 100%; height: 140px; object-fit: cover; display: block; }
  .card .label { padding: 6px 8px; font-size: 0.75em; color: #bbb; word-break: break-all; }
  .card a { color: #7fb0ff; text-decoration: none; }
  #error { padding: 16px; color: #ff7070; }
</style>
</head>
<body>
<header>
  <h1>Camera Gallery</h1>
  <button onclick="act('take-picture')">Take Picture</button>
  <button onclick="act('start-recording')">Start Recording</button>
  <button onclick="act('stop-recording')">Stop Recording</button>
</header>
<div id="meta"></div>
<div id="error"></div>
<div id="grid"></div>
<script>
async function act(name) {
  try { await fetch('/api/' + name); } catch (e) {}
}
async function refresh() {
  try {
    const resp = await fetch('/api/gallery?limit=100');
    const payload = await resp.json();
    if (payload.status !== 'success') throw new Error(payload.message);
    const data = payload.data;
    document.getElementById('error').textContent = '';
    document.getElementById('meta').textContent =
      data.total_count + ' items, ' + Math.round(data.total_size / 1024) + ' KB total';
    const grid = document.getElementById('grid');
    grid.innerHTML = '';
    for (const item of data.items) {
      const card = document.createElement('div');
      card.className = 'card';
      const media = item.is_video
        ? '<video src="' + item.url + '" controls muted></video>'
        : '<img src="' + item.url + '" loading="lazy">';
      card.innerHTML = media +
        '<div class="label">' + item.name + ' · ' + item.modified +
        ' · <a href="' + item.download_url + '">download</a></div>';
      grid.appendChild(card);
    }
  } catch (e) {
    document.getElementById('error').textContent = 'Error loading gallery';
  }
}
refresh();
setInterval(refresh, 10000);
</script>
</body>
</html>
"#;
