use std::path::{Path, PathBuf};

pub trait PathHelper {
    /// Attempts to join the given path with self,
    /// unless self is an absolute path.
    fn maybe_suffix(&self, p: &Path) -> PathBuf;
    /// Whether the textual form of the path ends with `suffix`.
    ///
    /// Non UTF-8 paths never match.
    fn has_suffix(&self, suffix: &str) -> bool;
}

impl PathHelper for Path {
    fn maybe_suffix(&self, p: &Path) -> PathBuf {
        if self.is_absolute() {
            self.to_path_buf()
        } else {
            p.join(self)
        }
    }
    fn has_suffix(&self, suffix: &str) -> bool {
        self.to_str().map_or(false, |s| s.ends_with(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_matches_text_of_path() {
        assert!(Path::new("_site/posts/index.html").has_suffix(".html"));
        assert!(!Path::new("_site/feed.xml").has_suffix(".html"));
        assert!(!Path::new("_site/page.HTML").has_suffix(".html"));
    }
}
