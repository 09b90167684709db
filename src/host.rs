/*!
 * The host side: anything that runs transforms over emitted files.
 */

use std::{
    fs,
    path::{Path, PathBuf},
};

use semver::{Version, VersionReq};
use tracing::{event, instrument, Level};

use crate::error::Result;

/// A content transform: `(content, output path) -> content`.
pub type Transform = Box<dyn Fn(&str, Option<&Path>) -> Result<String>>;

/// What a plugin needs from the tool it plugs into.
pub trait TransformHost {
    /// Checks the host version against a semver requirement.
    fn version_check(&self, requirement: &str) -> std::result::Result<(), String>;
    fn add_transform(&mut self, name: &str, transform: Transform);
}

/// Counts from one [`Site::process_dir`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub visited: usize,
    pub rewritten: usize,
    pub skipped: usize,
}

/// A minimal host that rewrites an already built site in place.
pub struct Site {
    version: Version,
    transforms: Vec<(String, Transform)>,
}

impl Default for Site {
    fn default() -> Self {
        Self::new()
    }
}

impl Site {
    /// A site reporting this crate's own version.
    pub fn new() -> Self {
        Self::with_version(
            Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0)),
        )
    }

    pub fn with_version(version: Version) -> Self {
        Self {
            version,
            transforms: Vec::new(),
        }
    }

    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|(name, _)| name.as_str())
    }

    /// Runs every transform, in registration order.
    pub fn apply(&self, content: &str, path: Option<&Path>) -> Result<String> {
        let mut content = content.to_string();
        for (_, transform) in &self.transforms {
            content = transform(&content, path)?;
        }
        Ok(content)
    }

    /// Rewrites every file under `root` whose content changes.
    #[instrument(skip(self))]
    pub fn process_dir(&self, root: &Path) -> Result<Summary> {
        let mut summary = Summary::default();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<PathBuf>>>()?;
            entries.sort();
            for path in entries {
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                summary.visited += 1;
                let content = match String::from_utf8(fs::read(&path)?) {
                    Ok(content) => content,
                    Err(_) => {
                        event!(Level::DEBUG, r#type = "binary", ?path);
                        summary.skipped += 1;
                        continue;
                    }
                };
                let processed = self.apply(&content, Some(&path))?;
                if processed != content {
                    fs::write(&path, processed)?;
                    event!(Level::INFO, r#type = "rewrite", ?path);
                    summary.rewritten += 1;
                }
            }
        }
        Ok(summary)
    }
}

impl TransformHost for Site {
    fn version_check(&self, requirement: &str) -> std::result::Result<(), String> {
        let req = VersionReq::parse(requirement).map_err(|e| e.to_string())?;
        if req.matches(&self.version) {
            Ok(())
        } else {
            Err(format!(
                "Expected host version {}, found {}",
                requirement, self.version
            ))
        }
    }

    fn add_transform(&mut self, name: &str, transform: Transform) {
        event!(Level::DEBUG, r#type = "add_transform", %name);
        self.transforms.push((name.to_string(), transform));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn applies_transforms_in_order() {
        let mut site = Site::new();
        site.add_transform(
            "a",
            Box::new(|c: &str, _: Option<&Path>| Ok::<_, crate::Error>(format!("{}a", c))),
        );
        site.add_transform(
            "b",
            Box::new(|c: &str, _: Option<&Path>| Ok::<_, crate::Error>(format!("{}b", c))),
        );
        assert_eq!(site.apply("x", None).unwrap(), "xab");
        assert_eq!(site.transform_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn checks_versions() {
        assert!(Site::new().version_check(">=0.1").is_ok());
        let old = Site::with_version(Version::new(0, 0, 5));
        assert!(old.version_check(">=0.1").is_err());
        assert!(old.version_check("not a version").is_err());
    }
}
