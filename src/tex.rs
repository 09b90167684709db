/*!
 * Locating TeX math in page text.
 */

use std::collections::{BTreeMap, HashMap};

use html_escape::decode_html_entities;
use regex::Regex;
use tracing::{event, Level};

use crate::config::{ResolvedTexOptions, ALL_PACKAGES};
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MathKind {
    Inline,
    Display,
    /// An escaped character such as `\$`, rendered as plain text
    Escape,
}

/// A piece of math found in a text run.
#[derive(Clone, Debug, PartialEq)]
pub struct FoundMath {
    /// Byte offset of the opening delimiter in the raw text
    pub start: usize,
    /// Byte offset just past the closing delimiter
    pub end: usize,
    /// Decoded TeX source (or the literal text of an escape)
    pub tex: String,
    pub kind: MathKind,
}

impl FoundMath {
    pub fn display(&self) -> bool {
        self.kind == MathKind::Display
    }
}

/// Packages read here rather than by the engines.
const SWITCH_PACKAGES: &[&str] = &["noerrors", "configmacros"];

/// Package switches that change how math is handled here.
#[derive(Clone, Debug, Default)]
pub struct Packages {
    /// Render bad TeX as an error box instead of failing
    pub no_errors: bool,
    /// Honor the configured macros
    pub config_macros: bool,
    /// Packages left out of the list that the engines load anyway
    pub not_disabled: Vec<String>,
}

impl Packages {
    fn from_names(names: &[String]) -> Self {
        for name in names {
            if !ALL_PACKAGES.contains(&name.as_str()) {
                event!(Level::WARN, r#type = "unknown_package", %name);
            }
        }
        let has = |p: &str| names.iter().any(|n| n == p);
        // bussproofs is left out by default and is not part of KaTeX
        let not_disabled: Vec<String> = ALL_PACKAGES
            .iter()
            .filter(|&&p| p != "bussproofs" && !SWITCH_PACKAGES.contains(&p) && !has(p))
            .map(|p| p.to_string())
            .collect();
        if !not_disabled.is_empty() {
            event!(
                Level::WARN,
                r#type = "packages_not_disabled",
                packages = ?not_disabled,
                "The math engines cannot turn these packages off"
            );
        }
        Self {
            no_errors: has("noerrors"),
            config_macros: has("configmacros"),
            not_disabled,
        }
    }
}

/// The TeX input processor.
pub struct TexInput {
    start: Option<Regex>,
    /// Close delimiter and end pattern, keyed by open delimiter
    ends: HashMap<String, (String, bool, Regex)>,
    packages: Packages,
    macros: BTreeMap<String, String>,
}

impl TexInput {
    pub fn new(options: &ResolvedTexOptions) -> Result<Self> {
        let mut delims = Vec::new();
        let mut ends = HashMap::new();
        let pairs = options
            .inline_math
            .iter()
            .map(|p| (p, false))
            .chain(options.display_math.iter().map(|p| (p, true)));
        for ((open, close), display) in pairs {
            if open.is_empty() || ends.contains_key(open) {
                continue;
            }
            delims.push(open.as_str());
            ends.insert(open.clone(), (close.clone(), display, end_pattern(close)?));
        }
        // Longest first, so `$$` wins over `$`
        delims.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut parts = Vec::new();
        if !delims.is_empty() {
            let alternation = delims
                .iter()
                .map(|d| regex::escape(d))
                .collect::<Vec<_>>()
                .join("|");
            parts.push(format!("(?P<delim>{})", alternation));
        }
        if options.process_environments {
            parts.push(r"\\begin\s*\{(?P<env>[^}]*)\}".to_string());
        }
        if options.process_escapes {
            parts.push(r"\\(?P<escape>[\\$])".to_string());
        }
        if options.process_refs {
            parts.push(r"(?P<reference>\\(?:eq)?ref\s*\{[^}]*\})".to_string());
        }
        let start = if parts.is_empty() {
            None
        } else {
            Some(Regex::new(&parts.join("|"))?)
        };

        Ok(Self {
            start,
            ends,
            packages: Packages::from_names(&options.packages),
            macros: options.macros.clone(),
        })
    }

    pub fn packages(&self) -> &Packages {
        &self.packages
    }

    /// Macros to hand to the engine, empty unless configmacros is enabled.
    pub fn macros(&self) -> BTreeMap<String, String> {
        if self.packages.config_macros {
            self.macros.clone()
        } else {
            BTreeMap::new()
        }
    }

    /// Finds the math in one raw (undecoded) text run, in order.
    pub fn find_math(&self, text: &str) -> Result<Vec<FoundMath>> {
        let start_re = match &self.start {
            Some(re) => re,
            None => return Ok(Vec::new()),
        };
        let mut found = Vec::new();
        let mut pos = 0;
        while let Some(caps) = start_re.captures_at(text, pos) {
            let whole = match caps.get(0) {
                Some(whole) => whole,
                None => break,
            };
            let item = if let Some(open) = caps.name("delim") {
                let (close, display, pattern) = &self.ends[open.as_str()];
                find_end(text, whole.end(), close, pattern).map(|(inner, end)| {
                    FoundMath {
                        start: whole.start(),
                        end,
                        tex: decode_html_entities(&text[whole.end()..inner]).into_owned(),
                        kind: if *display {
                            MathKind::Display
                        } else {
                            MathKind::Inline
                        },
                    }
                })
            } else if let Some(env) = caps.name("env") {
                find_environment(text, whole.start(), whole.end(), env.as_str())?
            } else if let Some(escape) = caps.name("escape") {
                Some(FoundMath {
                    start: whole.start(),
                    end: whole.end(),
                    tex: escape.as_str().to_string(),
                    kind: MathKind::Escape,
                })
            } else {
                Some(FoundMath {
                    start: whole.start(),
                    end: whole.end(),
                    tex: decode_html_entities(whole.as_str()).into_owned(),
                    kind: MathKind::Inline,
                })
            };
            match item {
                Some(item) => {
                    pos = item.end;
                    found.push(item);
                }
                // Unclosed: skip the opener and keep looking
                None => pos = whole.end(),
            }
        }
        Ok(found)
    }
}

fn find_environment(
    text: &str,
    start: usize,
    from: usize,
    env: &str,
) -> Result<Option<FoundMath>> {
    let close = format!("{{{}}}", env);
    let pattern = Regex::new(&format!(
        r"\\end\s*(\{{{}\}})|\\.|[{{}}]",
        regex::escape(env)
    ))?;
    Ok(find_end(text, from, &close, &pattern).map(|(_, end)| FoundMath {
        start,
        end,
        // Environments keep their delimiters
        tex: decode_html_entities(&text[start..end]).into_owned(),
        kind: MathKind::Display,
    }))
}

fn end_pattern(close: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(r"{}|\\.|[{{}}]", regex::escape(close)))?)
}

/// Looks for `close` at brace depth zero. Returns the offset where the
/// closing delimiter begins and the offset just past it.
fn find_end(text: &str, from: usize, close: &str, pattern: &Regex) -> Option<(usize, usize)> {
    let mut braces = 0usize;
    let mut pos = from;
    while let Some(caps) = pattern.captures_at(text, pos) {
        let m = caps.get(0)?;
        let candidate = caps.get(1).map_or(m.as_str(), |g| g.as_str());
        if candidate == close && braces == 0 {
            return Some((m.start(), m.end()));
        } else if m.as_str() == "{" {
            braces += 1;
        } else if m.as_str() == "}" && braces > 0 {
            braces -= 1;
        }
        pos = m.end();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TexOptions;
    use pretty_assertions::assert_eq;

    fn input() -> TexInput {
        TexInput::new(&TexOptions::default().resolve()).unwrap()
    }

    fn math(text: &str) -> Vec<(String, MathKind)> {
        input()
            .find_math(text)
            .unwrap()
            .into_iter()
            .map(|m| (m.tex, m.kind))
            .collect()
    }

    #[test]
    fn finds_inline_and_display() {
        assert_eq!(
            math(r"a $x^2$ b \(y\) c $$z$$ d \[w\]"),
            vec![
                ("x^2".to_string(), MathKind::Inline),
                ("y".to_string(), MathKind::Inline),
                ("z".to_string(), MathKind::Display),
                ("w".to_string(), MathKind::Display),
            ]
        );
    }

    #[test]
    fn reports_byte_spans() {
        let found = input().find_math("Let $x$ be").unwrap();
        assert_eq!((found[0].start, found[0].end), (4, 7));
    }

    #[test]
    fn close_must_be_outside_braces() {
        assert_eq!(
            math(r"$\text{costs $5}$"),
            vec![(r"\text{costs $5}".to_string(), MathKind::Inline)]
        );
    }

    #[test]
    fn escaped_dollars_are_not_math() {
        assert_eq!(
            math(r"costs \$5 or \$6"),
            vec![
                ("$".to_string(), MathKind::Escape),
                ("$".to_string(), MathKind::Escape),
            ]
        );
        assert_eq!(math(r"$a\$b$"), vec![(r"a\$b".to_string(), MathKind::Inline)]);
    }

    #[test]
    fn unclosed_delimiters_are_skipped() {
        assert_eq!(math("only $5 here"), vec![]);
        assert_eq!(
            math(r"\( open $x$"),
            vec![("x".to_string(), MathKind::Inline)]
        );
    }

    #[test]
    fn environments_keep_their_delimiters() {
        assert_eq!(
            math(r"see \begin{align}a&=b\end{align} ok"),
            vec![(r"\begin{align}a&=b\end{align}".to_string(), MathKind::Display)]
        );
    }

    #[test]
    fn refs_are_inline_math() {
        assert_eq!(
            math(r"by \eqref{eq:1}"),
            vec![(r"\eqref{eq:1}".to_string(), MathKind::Inline)]
        );
    }

    #[test]
    fn tex_is_entity_decoded() {
        assert_eq!(
            math("$a &lt; b &amp; c$"),
            vec![("a < b & c".to_string(), MathKind::Inline)]
        );
        assert_eq!(
            math("$a &le; b &times; c$ and $&#955;&#x3bb;&nbsp;$"),
            vec![
                ("a ≤ b × c".to_string(), MathKind::Inline),
                ("λλ\u{a0}".to_string(), MathKind::Inline),
            ]
        );
    }

    #[test]
    fn switches_can_be_turned_off() {
        let options = TexOptions {
            process_escapes: Some(false),
            process_environments: Some(false),
            process_refs: Some(false),
            inline_math: Some(vec![]),
            display_math: Some(vec![]),
            ..Default::default()
        };
        let input = TexInput::new(&options.resolve()).unwrap();
        assert!(input
            .find_math(r"$x$ \$ \begin{a}\end{a} \ref{x}")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reports_packages_the_engines_keep() {
        assert!(input().packages().not_disabled.is_empty());

        let options = TexOptions {
            packages: Some(vec!["base".to_string(), "noerrors".to_string()]),
            ..Default::default()
        };
        let packages = TexInput::new(&options.resolve()).unwrap().packages().clone();
        assert!(packages.no_errors);
        assert!(!packages.config_macros);
        assert!(packages.not_disabled.contains(&"ams".to_string()));
        assert!(packages.not_disabled.contains(&"mhchem".to_string()));
        assert!(!packages.not_disabled.contains(&"base".to_string()));
        assert!(!packages.not_disabled.contains(&"configmacros".to_string()));
        assert!(!packages.not_disabled.contains(&"bussproofs".to_string()));
    }

    #[test]
    fn macros_need_configmacros() {
        let mut macros = BTreeMap::new();
        macros.insert("RR".to_string(), r"\mathbb{R}".to_string());
        let with = TexOptions {
            macros: Some(macros.clone()),
            ..Default::default()
        };
        assert_eq!(TexInput::new(&with.resolve()).unwrap().macros().len(), 1);
        let without = TexOptions {
            macros: Some(macros),
            packages: Some(vec!["base".to_string()]),
            ..Default::default()
        };
        assert!(TexInput::new(&without.resolve()).unwrap().macros().is_empty());
    }
}
