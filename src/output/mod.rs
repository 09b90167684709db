/*!
 * Output processors. Each one turns found math into page markup using an
 * external engine.
 */

use std::{collections::BTreeMap, str::FromStr};

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{event, Level};

use crate::config::{DisplayAlign, ResolvedOptions};
use crate::error::{Error, Result};
use crate::tex::{FoundMath, TexInput};

mod chtml;
mod engine;
mod font_cache;
mod mathml;
#[cfg(feature = "svg")]
mod svg;

pub use chtml::ChtmlOutput;
pub use font_cache::FontCacheRewriter;
pub use mathml::MathmlOutput;
#[cfg(feature = "svg")]
pub use svg::SvgOutput;

pub const SVG_STYLES_ID: &str = "MJX-SVG-styles";
pub const SVG_GLOBAL_CACHE_ID: &str = "MJX-SVG-global-cache";
pub const CHTML_STYLES_ID: &str = "MJX-CHTML-styles";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Chtml,
    Mathml,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "svg" => Ok(OutputFormat::Svg),
            "chtml" => Ok(OutputFormat::Chtml),
            "mathml" => Ok(OutputFormat::Mathml),
            other => Err(Error::UnsupportedOutput(other.to_string())),
        }
    }
}

/// State shared by every expression on one page.
#[derive(Debug, Default)]
pub struct PageState {
    /// Glyph id to path data, for the global font cache
    pub(crate) glyphs: BTreeMap<String, String>,
}

pub trait OutputJax {
    /// Renders one piece of math.
    fn typeset(&self, math: &FoundMath, page: &mut PageState) -> Result<String>;

    /// The `<style>` element attached to every page's `<head>`.
    fn style_sheet(&self) -> Option<String> {
        None
    }

    /// Markup appended to `<body>` once the page is typeset.
    fn finish_page(&self, _page: &PageState) -> Option<String> {
        None
    }

    /// Ids of the page elements to drop when a page has no math.
    fn unused_element_ids(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Builds the output processor for the configured mode.
pub fn create_output(options: &ResolvedOptions, input: &TexInput) -> Result<Box<dyn OutputJax>> {
    let format = options.output.parse::<OutputFormat>()?;
    let settings = Settings {
        no_errors: input.packages().no_errors,
        prefix: macro_prefix(&input.macros()),
        assistive: options.assistive_mml,
    };
    match format {
        #[cfg(feature = "svg")]
        OutputFormat::Svg => Ok(Box::new(SvgOutput::new(options.svg.clone(), settings)?)),
        #[cfg(not(feature = "svg"))]
        OutputFormat::Svg => Err(Error::UnsupportedOutput(
            "svg (built without the `svg` feature)".to_string(),
        )),
        OutputFormat::Chtml => Ok(Box::new(ChtmlOutput::new(options.chtml.clone(), settings))),
        OutputFormat::Mathml => Ok(Box::new(MathmlOutput::new(settings))),
    }
}

/// Settings every output processor shares.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub no_errors: bool,
    /// `\def` lines placed before each expression
    pub prefix: String,
    pub assistive: bool,
}

impl Settings {
    pub(crate) fn source(&self, math: &FoundMath) -> String {
        format!("{}{}", self.prefix, math.tex)
    }

    /// Decides what to do with an engine failure: log and render an error
    /// box with noerrors, fail the page otherwise.
    pub(crate) fn recover(&self, math: &FoundMath, message: String) -> Result<String> {
        if !self.no_errors {
            return Err(Error::Typeset {
                tex: math.tex.clone(),
                message,
            });
        }
        event!(Level::WARN, r#type = "math_error", tex = %math.tex, %message);
        Ok(message)
    }
}

/// Turns configured macros into `\def` lines, with one parameter per `#n`
/// used in the body.
fn macro_prefix(macros: &BTreeMap<String, String>) -> String {
    macros
        .iter()
        .map(|(name, body)| {
            let args = body
                .as_bytes()
                .windows(2)
                .filter(|w| w[0] == b'#' && (b'1'..=b'9').contains(&w[1]))
                .map(|w| w[1] - b'0')
                .max()
                .unwrap_or(0);
            let params: String = (1..=args).map(|i| format!("#{}", i)).collect();
            format!("\\def\\{}{}{{{}}}", name, params, body)
        })
        .collect()
}

/// Wraps rendered math the way every visual output does.
pub(crate) fn container(
    jax: &str,
    math: &FoundMath,
    align: DisplayAlign,
    indent: &str,
    body: &str,
    assistive: Option<&str>,
) -> String {
    let mut attrs = String::new();
    if math.display() {
        attrs.push_str(" display=\"true\"");
        let margin = match align {
            DisplayAlign::Left => Some("margin-left"),
            DisplayAlign::Right => Some("margin-right"),
            DisplayAlign::Center => None,
        };
        match margin {
            Some(side) if indent != "0" => attrs.push_str(&format!(
                " style=\"text-align: {}; {}: {};\"",
                align.as_css(),
                side,
                encode_double_quoted_attribute(indent)
            )),
            Some(_) => attrs.push_str(&format!(" style=\"text-align: {};\"", align.as_css())),
            None => {}
        }
    }
    let assistive = assistive
        .map(|mml| {
            format!(
                "<mjx-assistive-mml unselectable=\"on\" display=\"{}\">{}</mjx-assistive-mml>",
                if math.display() { "block" } else { "inline" },
                mml
            )
        })
        .unwrap_or_default();
    format!(
        "<mjx-container class=\"MathJax\" jax=\"{}\"{}>{}{}</mjx-container>",
        jax, attrs, body, assistive
    )
}

/// Error box shown in place of math the engine rejected.
pub(crate) fn merror_html(math: &FoundMath, message: &str) -> String {
    format!(
        "<span class=\"mjx-merror\" data-mjx-error=\"{0}\" title=\"{0}\">{1}</span>",
        encode_double_quoted_attribute(message),
        encode_text(&math.tex)
    )
}

/// The `<math>` element out of a larger fragment.
pub(crate) fn math_element(fragment: &str) -> &str {
    match (fragment.find("<math"), fragment.rfind("</math>")) {
        (Some(start), Some(end)) if start < end => &fragment[start..end + "</math>".len()],
        _ => fragment,
    }
}

/// Stylesheet rules shared by SVG and CHTML output.
pub(crate) const COMMON_CSS: &str = "\
mjx-container[jax] { position: relative; direction: ltr; }
mjx-container[jax][display=\"true\"] { display: block; text-align: center; margin: 1em 0; }
mjx-assistive-mml { position: absolute !important; top: 0px; left: 0px; clip: rect(1px, 1px, 1px, 1px); \
padding: 1px 0px 0px 0px !important; border: 0px !important; display: block !important; \
width: auto !important; overflow: hidden !important; user-select: none; }
mjx-assistive-mml[display=\"block\"] { width: 100% !important; }
.mjx-merror { display: inline-block; color: #cc0000; background-color: #ffff88; \
border: 1px solid #cc0000; padding: 1px 3px; font-style: normal; font-size: 90%; }
";
