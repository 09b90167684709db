use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{engine, OutputJax, PageState, Settings};
use crate::error::Result;
use crate::tex::FoundMath;

/// Native MathML output. Browsers and screen readers handle it directly,
/// so there is no stylesheet and no assistive copy.
pub struct MathmlOutput {
    settings: Settings,
}

impl MathmlOutput {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl OutputJax for MathmlOutput {
    fn typeset(&self, math: &FoundMath, _page: &mut PageState) -> Result<String> {
        let mml = match engine::mathml(&self.settings.source(math), math.display())? {
            Ok(mml) => mml,
            Err(message) => {
                let message = self.settings.recover(math, message)?;
                let message = encode_double_quoted_attribute(&message);
                let display = if math.display() { " display=\"block\"" } else { "" };
                return Ok(format!(
                    "<math xmlns=\"http://www.w3.org/1998/Math/MathML\"{}><merror data-mjx-error=\"{1}\" \
                     title=\"{1}\"><mtext>{2}</mtext></merror></math>",
                    display,
                    message,
                    encode_text(&math.tex)
                ));
            }
        };
        if math.display() && !mml.contains("display=\"block\"") {
            return Ok(mml.replacen("<math", "<math display=\"block\"", 1));
        }
        Ok(mml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::MathKind;

    fn found(tex: &str, kind: MathKind) -> FoundMath {
        FoundMath {
            start: 0,
            end: 0,
            tex: tex.to_string(),
            kind,
        }
    }

    #[test]
    fn renders_bare_math_elements() {
        let out = MathmlOutput::new(Settings::default());
        let mut page = PageState::default();
        let inline = out.typeset(&found("a+b", MathKind::Inline), &mut page).unwrap();
        assert!(inline.starts_with("<math"));
        assert!(!inline.contains("katex"));
        let display = out.typeset(&found("a+b", MathKind::Display), &mut page).unwrap();
        assert!(display.contains("display=\"block\""));
        assert!(out.style_sheet().is_none());
        assert!(out.unused_element_ids().is_empty());
    }

    #[test]
    fn noerrors_gives_merror() {
        let out = MathmlOutput::new(Settings {
            no_errors: true,
            ..Default::default()
        });
        let html = out
            .typeset(&found(r"\frac{", MathKind::Inline), &mut PageState::default())
            .unwrap();
        assert!(html.contains("<merror"));
        assert!(html.contains(r"<mtext>\frac{</mtext>"));
    }
}
