use tracing::{event, Level};

use super::{
    container, engine, merror_html, FontCacheRewriter, OutputJax, PageState, Settings, COMMON_CSS,
    SVG_GLOBAL_CACHE_ID, SVG_STYLES_ID,
};
use crate::config::ResolvedSvgOptions;
use crate::error::Result;
use crate::tex::FoundMath;

const SVG_CSS: &str = "\
mjx-container[jax=\"SVG\"] > svg { overflow: visible; min-height: 1px; min-width: 1px; }
mjx-container[jax=\"SVG\"] > svg a { fill: blue; stroke: blue; }
mjx-container[jax=\"SVG\"][display=\"true\"] > svg { max-width: 100%; }
";

/// Vector output through MathJax.
pub struct SvgOutput {
    options: ResolvedSvgOptions,
    settings: Settings,
    cache: FontCacheRewriter,
}

impl SvgOutput {
    pub fn new(options: ResolvedSvgOptions, settings: Settings) -> Result<Self> {
        Ok(Self {
            cache: FontCacheRewriter::new(options.font_cache)?,
            options,
            settings,
        })
    }

    fn wrap(&self, math: &FoundMath, body: &str, assistive: Option<&str>) -> String {
        container(
            "SVG",
            math,
            self.options.display_align,
            &self.options.display_indent,
            body,
            assistive,
        )
    }
}

impl OutputJax for SvgOutput {
    fn typeset(&self, math: &FoundMath, page: &mut PageState) -> Result<String> {
        let source = self.settings.source(math);
        let converted = if math.display() {
            mathjax_svg::convert_to_svg(&source)
        } else {
            mathjax_svg::convert_to_svg_inline(&source)
        };
        let rendered = match converted {
            Ok(rendered) => rendered,
            Err(e) => {
                let message = self.settings.recover(math, e.to_string())?;
                return Ok(self.wrap(math, &merror_html(math, &message), None));
            }
        };
        let svg = self.cache.rewrite(svg_element(&rendered), page);

        if !self.settings.assistive {
            return Ok(self.wrap(math, &svg, None));
        }
        let svg = svg.replacen("<svg", "<svg aria-hidden=\"true\"", 1);
        match engine::mathml(&source, math.display())? {
            Ok(mml) => Ok(self.wrap(math, &svg, Some(&mml))),
            Err(message) => {
                event!(Level::DEBUG, r#type = "no_assistive_mml", tex = %math.tex, %message);
                Ok(self.wrap(math, &svg, None))
            }
        }
    }

    fn style_sheet(&self) -> Option<String> {
        Some(format!(
            "<style id=\"{}\">\n{}{}</style>",
            SVG_STYLES_ID, COMMON_CSS, SVG_CSS
        ))
    }

    fn finish_page(&self, page: &PageState) -> Option<String> {
        self.cache.global_cache(page)
    }

    fn unused_element_ids(&self) -> &'static [&'static str] {
        &[SVG_STYLES_ID, SVG_GLOBAL_CACHE_ID]
    }
}

/// The `<svg>` element, without any container MathJax put around it.
fn svg_element(rendered: &str) -> &str {
    match (rendered.find("<svg"), rendered.rfind("</svg>")) {
        (Some(start), Some(end)) if start < end => &rendered[start..end + "</svg>".len()],
        _ => rendered,
    }
}
