//! Static asset lookup: path resolution under a root, and MIME types.

use std::path::{Path, PathBuf};

/// Resolve a request path to a file under `root`.
///
/// `/` maps to `/index.html`. Returns `None` when the path would leave the
/// root.
#[must_use]
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let request_path = if request_path == "/" {
        "/index.html"
    } else {
        request_path
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains('\\') || s.contains(':') || s.contains('\0') => return None,
            s => segments.push(s),
        }
    }

    let mut path = root.to_path_buf();
    path.extend(segments);
    Some(path)
}

/// Content type for a file, by extension.
#[must_use]
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
