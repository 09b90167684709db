use katex::{Opts, OutputType};

use crate::error::{Error, Result};

/// Engine output, or the engine's message when it rejects the TeX.
pub(crate) type Rendered = std::result::Result<String, String>;

/// Renders TeX through KaTeX.
///
/// Only a rejected expression is an inner error; a broken runtime fails the
/// page whatever the packages say.
pub(crate) fn render(tex: &str, display: bool, output: OutputType) -> Result<Rendered> {
    let opts = Opts::builder()
        .display_mode(display)
        .output_type(output)
        .throw_on_error(true)
        .build()
        .map_err(|e| Error::Engine(e.to_string()))?;
    match katex::render_with_opts(tex, &opts) {
        Ok(rendered) => Ok(Ok(rendered)),
        Err(katex::Error::JsExecError(message)) => Ok(Err(message)),
        Err(e) => Err(Error::Engine(e.to_string())),
    }
}

/// MathML for the given TeX, without KaTeX's wrapper span.
pub(crate) fn mathml(tex: &str, display: bool) -> Result<Rendered> {
    let rendered = render(tex, display, OutputType::Mathml)?;
    Ok(rendered.map(|html| super::math_element(&html).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_mathml_without_wrapper() {
        let mml = mathml("x^2", false).unwrap().unwrap();
        assert!(mml.starts_with("<math"));
        assert!(mml.ends_with("</math>"));
        assert!(mml.contains("<msup>"));
    }

    #[test]
    fn reports_parse_errors() {
        let rejected = render(r"\frac{", false, OutputType::Html).unwrap();
        assert!(rejected.is_err());
    }
}
