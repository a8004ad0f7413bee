//! Extension → mime-type registry.
//!
//! An explicit per-server value threaded into the file handler at
//! construction, not a process-wide table: instances stay independent
//! and the mapping set is visible in the config.

use std::collections::HashMap;
use std::path::Path;

/// Immutable after construction; shared by cloning into handlers.
#[derive(Debug, Clone)]
pub struct MimeTypes {
    map: HashMap<String, String>,
    default: String,
}

impl MimeTypes {
    /// Built-in mapping with the given default for unknown extensions.
    pub fn new(default: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        for (ext, mime) in [
            ("gmi", "text/gemini"),
            ("gemini", "text/gemini"),
            ("txt", "text/plain"),
            ("md", "text/markdown"),
            ("html", "text/html"),
            ("xml", "text/xml"),
            ("css", "text/css"),
            ("json", "application/json"),
            ("pdf", "application/pdf"),
            ("zip", "application/zip"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
            ("webp", "image/webp"),
            ("svg", "image/svg+xml"),
            ("mp3", "audio/mpeg"),
            ("ogg", "audio/ogg"),
            ("mp4", "video/mp4"),
        ] {
            map.insert(ext.to_string(), mime.to_string());
        }
        Self {
            map,
            default: default.into(),
        }
    }

    /// Layer configured overrides on top of the built-ins.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (ext, mime) in overrides {
            self.map
                .insert(ext.trim_start_matches('.').to_lowercase(), mime.clone());
        }
        self
    }

    pub fn insert(&mut self, extension: impl Into<String>, mime: impl Into<String>) {
        self.map.insert(extension.into(), mime.into());
    }

    /// Mime type for a path, by lowercased extension.
    pub fn lookup(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| self.map.get(&ext))
            .unwrap_or(&self.default)
            .as_str()
    }
}

impl Default for MimeTypes {
    fn default() -> Self {
        Self::new("application/octet-stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_map() {
        let mime = MimeTypes::default();
        assert_eq!(mime.lookup(Path::new("index.gmi")), "text/gemini");
        assert_eq!(mime.lookup(Path::new("a/b/photo.JPG")), "image/jpeg");
    }

    #[test]
    fn unknown_extension_falls_back_to_default() {
        let mime = MimeTypes::new("text/plain");
        assert_eq!(mime.lookup(Path::new("archive.xyz")), "text/plain");
        assert_eq!(mime.lookup(Path::new("no_extension")), "text/plain");
    }

    #[test]
    fn overrides_win_over_builtins() {
        let mut overrides = HashMap::new();
        overrides.insert(".md".to_string(), "text/gemini".to_string());
        let mime = MimeTypes::default().with_overrides(&overrides);
        assert_eq!(mime.lookup(Path::new("notes.md")), "text/gemini");
    }

    #[test]
    fn instances_are_independent() {
        let mut a = MimeTypes::default();
        let b = MimeTypes::default();
        a.insert("gmi", "text/plain");
        assert_eq!(b.lookup(Path::new("x.gmi")), "text/gemini");
    }
}
