use std::ffi::OsStr;

pub fn file_ext(path: impl AsRef<OsStr>) -> Option<String> {
    std::path::Path::new(path.as_ref())
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ext() {
        assert_eq!(file_ext("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_ext("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_ext("README"), None);
        assert_eq!(file_ext(".hidden"), None);
    }
}
