/*!
 * The math transform and its registration with a host.
 */

use std::path::Path;

use tracing::{event, instrument, Level};

use crate::config::{Options, ResolvedOptions};
use crate::document::MathDocument;
use crate::error::Result;
use crate::host::TransformHost;
use crate::output::{create_output, OutputFormat, OutputJax};
use crate::tex::TexInput;
use crate::util::PathHelper;

/// Host versions this plugin is known to work with.
pub const COMPATIBILITY: &str = ">=0.1";

/// Name the transform is registered under.
pub const TRANSFORM_NAME: &str = "mathjax";

pub struct MathPlugin {
    options: ResolvedOptions,
    input: TexInput,
    output: Box<dyn OutputJax>,
}

impl MathPlugin {
    /// Merges the options and builds the processors.
    ///
    /// Fails on an unsupported output mode, before any page is seen.
    pub fn new(options: Options) -> Result<Self> {
        let mut options = options.resolve();
        let format = options.output.parse::<OutputFormat>()?;
        if format == OutputFormat::Mathml {
            // bussproofs needs a visual output to lay out proof trees
            options.tex.packages.retain(|name| name != "bussproofs");
        }
        let input = TexInput::new(&options.tex)?;
        let output = create_output(&options, &input)?;
        event!(Level::DEBUG, r#type = "setup", output = %options.output);
        Ok(Self {
            options,
            input,
            output,
        })
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Typesets the math in one emitted file. Anything that is not an
    /// `.html` file comes back unchanged.
    #[instrument(name = "transform", skip(self, content))]
    pub fn transform(&self, content: &str, output_path: Option<&Path>) -> Result<String> {
        match output_path {
            Some(path) if path.has_suffix(".html") => {}
            _ => return Ok(content.to_string()),
        }
        let document = MathDocument {
            input: &self.input,
            output: self.output.as_ref(),
            lite: &self.options.lite_adaptor,
        };
        let mut page = document.render(content)?;
        document.clean_output(&mut page);
        event!(Level::DEBUG, r#type = "typeset", math = page.math_count);
        Ok(page.document.serialize())
    }
}

/// Registers the math transform with `host`.
///
/// A host version outside [`COMPATIBILITY`] only logs a warning.
pub fn register<H: TransformHost + ?Sized>(host: &mut H, options: Options) -> Result<()> {
    if let Err(e) = host.version_check(COMPATIBILITY) {
        event!(
            Level::WARN,
            "Plugin ({}) Compatibility: {}",
            env!("CARGO_PKG_NAME"),
            e
        );
    }
    let plugin = MathPlugin::new(options)?;
    host.add_transform(
        TRANSFORM_NAME,
        Box::new(move |content: &str, path: Option<&Path>| plugin.transform(content, path)),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn chtml() -> MathPlugin {
        MathPlugin::new(Options {
            output: Some("chtml".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_unsupported_output() {
        let err = MathPlugin::new(Options {
            output: Some("png".to_string()),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::UnsupportedOutput(ref o) if o == "png"));
    }

    #[test]
    fn mathml_drops_bussproofs() {
        let plugin = MathPlugin::new(Options {
            output: Some("mathml".to_string()),
            tex: crate::config::TexOptions {
                packages: Some(vec!["base".to_string(), "bussproofs".to_string()]),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(plugin.options().tex.packages, vec!["base".to_string()]);
    }

    #[test]
    fn passes_through_other_paths() {
        let plugin = chtml();
        let content = "<p>$x$</p>";
        for path in &[None, Some(Path::new("feed.xml")), Some(Path::new("page.htm"))] {
            assert_eq!(plugin.transform(content, *path).unwrap(), content);
        }
    }

    #[test]
    fn typesets_html_paths() {
        let out = chtml()
            .transform("<p>$x$</p>", Some(Path::new("_site/index.html")))
            .unwrap();
        assert!(out.contains("jax=\"CHTML\""));
        assert!(out.contains("MJX-CHTML-styles"));
    }
}
