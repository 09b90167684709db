/*!
 * Typesetting a whole page.
 */

use tracing::{event, Level};

use crate::config::ResolvedLiteAdaptorOptions;
use crate::error::Result;
use crate::lite::{LiteDocument, Token};
use crate::output::{OutputJax, PageState};
use crate::tex::{MathKind, TexInput};

/// A page after typesetting.
pub struct RenderedPage {
    pub document: LiteDocument,
    /// Number of math items typeset; escapes are not counted
    pub math_count: usize,
}

/// Runs the input and output processors over one page.
pub struct MathDocument<'a> {
    pub input: &'a TexInput,
    pub output: &'a dyn OutputJax,
    pub lite: &'a ResolvedLiteAdaptorOptions,
}

impl<'a> MathDocument<'a> {
    pub fn render(&self, content: &str) -> Result<RenderedPage> {
        let mut document = LiteDocument::parse(content);
        let mut page = PageState::default();
        let mut math_count = 0;

        for index in document.scannable_text(self.lite) {
            let text = match &document.tokens()[index] {
                Token::Text(text) => text.clone(),
                _ => continue,
            };
            let found = self.input.find_math(&text)?;
            if found.is_empty() {
                continue;
            }
            let mut spliced = String::with_capacity(text.len());
            let mut cursor = 0;
            for math in &found {
                spliced.push_str(&text[cursor..math.start]);
                if math.kind == MathKind::Escape {
                    spliced.push_str(&math.tex);
                } else {
                    spliced.push_str(&self.output.typeset(math, &mut page)?);
                    math_count += 1;
                }
                cursor = math.end;
            }
            spliced.push_str(&text[cursor..]);
            document.replace_text(index, spliced);
        }

        // Attached whether or not the page has math; see `clean_output`
        if let Some(sheet) = self.output.style_sheet() {
            document.append_to_head(&sheet);
        }
        if let Some(markup) = self.output.finish_page(&page) {
            document.append_to_body(&markup);
        }

        Ok(RenderedPage {
            document,
            math_count,
        })
    }

    /// Drops the page elements the output attached when there was no math.
    pub fn clean_output(&self, page: &mut RenderedPage) {
        if page.math_count > 0 {
            return;
        }
        for id in self.output.unused_element_ids() {
            if page.document.remove_element_by_id(id) {
                event!(Level::DEBUG, r#type = "remove_unused", %id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LiteAdaptorOptions, TexOptions};
    use crate::tex::FoundMath;
    use pretty_assertions::assert_eq;

    /// Echoes the TeX back so splicing can be checked without an engine.
    struct Echo;

    impl OutputJax for Echo {
        fn typeset(&self, math: &FoundMath, _page: &mut PageState) -> Result<String> {
            Ok(format!("[{}]", math.tex))
        }

        fn style_sheet(&self) -> Option<String> {
            Some("<style id=\"echo\"></style>".to_string())
        }

        fn unused_element_ids(&self) -> &'static [&'static str] {
            &["echo"]
        }
    }

    fn render(content: &str) -> RenderedPage {
        let input = TexInput::new(&TexOptions::default().resolve()).unwrap();
        let lite = LiteAdaptorOptions::default().resolve();
        let doc = MathDocument {
            input: &input,
            output: &Echo,
            lite: &lite,
        };
        let mut page = doc.render(content).unwrap();
        doc.clean_output(&mut page);
        page
    }

    #[test]
    fn splices_math_and_keeps_text() {
        let page = render("<head></head><p>Let $x &lt; y$ hold, \\$5.</p><code>$z$</code>");
        assert_eq!(page.math_count, 1);
        assert_eq!(
            page.document.serialize(),
            "<head><style id=\"echo\"></style></head><p>Let [x < y] hold, $5.</p><code>$z$</code>\n"
        );
    }

    #[test]
    fn removes_style_when_no_math() {
        let page = render("<head></head><p>costs \\$5</p>");
        assert_eq!(page.math_count, 0);
        assert_eq!(page.document.serialize(), "<head></head><p>costs $5</p>\n");
    }
}
