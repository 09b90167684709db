use katex::OutputType;

use super::{
    container, engine, merror_html, OutputJax, PageState, Settings, CHTML_STYLES_ID, COMMON_CSS,
};
use crate::config::ResolvedChtmlOptions;
use crate::error::Result;
use crate::tex::FoundMath;

/// HTML and web font output through KaTeX.
pub struct ChtmlOutput {
    options: ResolvedChtmlOptions,
    settings: Settings,
}

impl ChtmlOutput {
    pub fn new(options: ResolvedChtmlOptions, settings: Settings) -> Self {
        Self { options, settings }
    }

    fn wrap(&self, math: &FoundMath, body: &str, assistive: Option<&str>) -> String {
        container(
            "CHTML",
            math,
            self.options.display_align,
            &self.options.display_indent,
            body,
            assistive,
        )
    }
}

impl OutputJax for ChtmlOutput {
    fn typeset(&self, math: &FoundMath, _page: &mut PageState) -> Result<String> {
        let source = self.settings.source(math);
        let html = match engine::render(&source, math.display(), OutputType::Html)? {
            Ok(html) => html,
            Err(message) => {
                let message = self.settings.recover(math, message)?;
                return Ok(self.wrap(math, &merror_html(math, &message), None));
            }
        };
        if !self.settings.assistive {
            return Ok(self.wrap(math, &format!("<mjx-math>{}</mjx-math>", html), None));
        }
        // Same source as above, so this only fails if the engine does
        let mml = engine::mathml(&source, math.display())?.ok();
        Ok(self.wrap(
            math,
            &format!("<mjx-math aria-hidden=\"true\">{}</mjx-math>", html),
            mml.as_deref(),
        ))
    }

    fn style_sheet(&self) -> Option<String> {
        Some(format!(
            "<style id=\"{}\">\n@import url(\"{}/katex.min.css\");\n{}</style>",
            CHTML_STYLES_ID,
            self.options.font_url.trim_end_matches('/'),
            COMMON_CSS
        ))
    }

    fn unused_element_ids(&self) -> &'static [&'static str] {
        &[CHTML_STYLES_ID]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChtmlOptions;
    use crate::tex::MathKind;

    fn found(tex: &str, kind: MathKind) -> FoundMath {
        FoundMath {
            start: 0,
            end: 0,
            tex: tex.to_string(),
            kind,
        }
    }

    fn output(settings: Settings) -> ChtmlOutput {
        ChtmlOutput::new(ChtmlOptions::default().resolve(), settings)
    }

    #[test]
    fn renders_katex_html() {
        let out = output(Settings {
            assistive: true,
            ..Default::default()
        });
        let html = out
            .typeset(&found(r"\frac{a}{b}", MathKind::Display), &mut PageState::default())
            .unwrap();
        assert!(html.starts_with("<mjx-container class=\"MathJax\" jax=\"CHTML\" display=\"true\">"));
        assert!(html.contains("<mjx-math aria-hidden=\"true\">"));
        assert!(html.contains("katex"));
        assert!(html.contains("<mjx-assistive-mml unselectable=\"on\" display=\"block\"><math"));
    }

    #[test]
    fn bad_tex_fails_without_noerrors() {
        let out = output(Settings::default());
        assert!(out
            .typeset(&found(r"\frac{", MathKind::Inline), &mut PageState::default())
            .is_err());
    }

    #[test]
    fn bad_tex_renders_error_box_with_noerrors() {
        let out = output(Settings {
            no_errors: true,
            ..Default::default()
        });
        let html = out
            .typeset(&found(r"\frac{", MathKind::Inline), &mut PageState::default())
            .unwrap();
        assert!(html.contains("class=\"mjx-merror\""));
        assert!(html.contains(r"\frac{</span>"));
    }

    #[test]
    fn macros_are_prepended() {
        let out = output(Settings {
            prefix: r"\def\RR{\mathbb{R}}".to_string(),
            ..Default::default()
        });
        assert!(out
            .typeset(&found(r"x \in \RR", MathKind::Inline), &mut PageState::default())
            .is_ok());
    }

    #[test]
    fn style_sheet_imports_fonts() {
        let sheet = output(Settings::default()).style_sheet().unwrap();
        assert!(sheet.starts_with("<style id=\"MJX-CHTML-styles\">"));
        assert!(sheet.contains("@import url(\"https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/katex.min.css\");"));
    }
}
