use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Every TeX package the input processor knows about.
pub const ALL_PACKAGES: &[&str] = &[
    "base",
    "action",
    "ams",
    "amscd",
    "bbox",
    "boldsymbol",
    "braket",
    "bussproofs",
    "cancel",
    "cases",
    "centernot",
    "color",
    "colortbl",
    "configmacros",
    "empheq",
    "enclose",
    "extpfeil",
    "gensymb",
    "html",
    "mathtools",
    "mhchem",
    "newcommand",
    "noerrors",
    "noundefined",
    "physics",
    "setoptions",
    "tagformat",
    "textcomp",
    "textmacros",
    "unicode",
    "upgreek",
    "verb",
];

/// Unrecognized keys, kept as-is.
pub type Extra = BTreeMap<String, toml::Value>;

/// User supplied options. Anything left out falls back to the defaults
/// in [`ResolvedOptions`].
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Options {
    /// Output mode: `svg`, `chtml` or `mathml`
    ///
    /// Checked at setup, not here.
    pub output: Option<String>,
    // TeX input
    #[serde(default)]
    pub tex: TexOptions,
    // SVG output
    #[serde(default)]
    pub svg: SvgOptions,
    // CHTML output
    #[serde(default)]
    pub chtml: ChtmlOptions,
    // Document scanning
    #[serde(default)]
    pub lite_adaptor: LiteAdaptorOptions,
    /// Attach a hidden MathML copy for screen readers
    pub assistive_mml: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedOptions {
    pub output: String,
    pub tex: ResolvedTexOptions,
    pub svg: ResolvedSvgOptions,
    pub chtml: ResolvedChtmlOptions,
    pub lite_adaptor: ResolvedLiteAdaptorOptions,
    pub assistive_mml: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Options {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Merges these options over the defaults, one group at a time.
    pub fn resolve(self) -> ResolvedOptions {
        ResolvedOptions {
            output: self.output.unwrap_or_else(|| "svg".to_string()),
            tex: self.tex.resolve(),
            svg: self.svg.resolve(),
            chtml: self.chtml.resolve(),
            lite_adaptor: self.lite_adaptor.resolve(),
            assistive_mml: self.assistive_mml.unwrap_or(true),
            extra: self.extra,
        }
    }
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Options::default().resolve()
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TexOptions {
    /// Enabled packages
    ///
    /// If none, defaults to every known package except bussproofs
    pub packages: Option<Vec<String>>,
    /// Inline math delimiters
    ///
    /// If none, defaults to `$...$` and `\(...\)`
    pub inline_math: Option<Vec<(String, String)>>,
    /// Display math delimiters
    ///
    /// If none, defaults to `$$...$$` and `\[...\]`
    pub display_math: Option<Vec<(String, String)>>,
    pub process_escapes: Option<bool>,
    pub process_environments: Option<bool>,
    pub process_refs: Option<bool>,
    /// Macro name (no backslash) to expansion
    ///
    /// Only used when the configmacros package is enabled
    pub macros: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedTexOptions {
    pub packages: Vec<String>,
    pub inline_math: Vec<(String, String)>,
    pub display_math: Vec<(String, String)>,
    pub process_escapes: bool,
    pub process_environments: bool,
    pub process_refs: bool,
    pub macros: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Extra,
}

fn pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(open, close)| (open.to_string(), close.to_string()))
        .collect()
}

impl TexOptions {
    pub fn resolve(self) -> ResolvedTexOptions {
        ResolvedTexOptions {
            packages: self.packages.unwrap_or_else(|| {
                ALL_PACKAGES
                    .iter()
                    .filter(|&&name| name != "bussproofs")
                    .map(|name| name.to_string())
                    .collect()
            }),
            inline_math: self
                .inline_math
                .unwrap_or_else(|| pairs(&[("$", "$"), ("\\(", "\\)")])),
            display_math: self
                .display_math
                .unwrap_or_else(|| pairs(&[("$$", "$$"), ("\\[", "\\]")])),
            process_escapes: self.process_escapes.unwrap_or(true),
            process_environments: self.process_environments.unwrap_or(true),
            process_refs: self.process_refs.unwrap_or(true),
            macros: self.macros.unwrap_or_default(),
            extra: self.extra,
        }
    }
}

/// How glyph outlines are shared between SVG expressions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FontCache {
    /// Each expression carries its own `<defs>`
    Local,
    /// One hidden SVG per page holds every glyph
    Global,
    /// Glyph paths are inlined at each use
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayAlign {
    Left,
    Center,
    Right,
}

impl DisplayAlign {
    pub fn as_css(self) -> &'static str {
        match self {
            DisplayAlign::Left => "left",
            DisplayAlign::Center => "center",
            DisplayAlign::Right => "right",
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SvgOptions {
    pub font_cache: Option<FontCache>,
    pub display_align: Option<DisplayAlign>,
    pub display_indent: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedSvgOptions {
    pub font_cache: FontCache,
    pub display_align: DisplayAlign,
    pub display_indent: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SvgOptions {
    pub fn resolve(self) -> ResolvedSvgOptions {
        ResolvedSvgOptions {
            font_cache: self.font_cache.unwrap_or(FontCache::Global),
            display_align: self.display_align.unwrap_or(DisplayAlign::Center),
            display_indent: self.display_indent.unwrap_or_else(|| "0".to_string()),
            extra: self.extra,
        }
    }
}

pub const DEFAULT_FONT_URL: &str = "https://cdn.jsdelivr.net/npm/katex@0.16.9/dist";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ChtmlOptions {
    /// Base URL of the stylesheet and web fonts
    ///
    /// If none, defaults to the KaTeX distribution on jsDelivr
    pub font_url: Option<String>,
    pub display_align: Option<DisplayAlign>,
    pub display_indent: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedChtmlOptions {
    pub font_url: String,
    pub display_align: DisplayAlign,
    pub display_indent: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChtmlOptions {
    pub fn resolve(self) -> ResolvedChtmlOptions {
        ResolvedChtmlOptions {
            font_url: self
                .font_url
                .unwrap_or_else(|| DEFAULT_FONT_URL.to_string()),
            display_align: self.display_align.unwrap_or(DisplayAlign::Center),
            display_indent: self.display_indent.unwrap_or_else(|| "0".to_string()),
            extra: self.extra,
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct LiteAdaptorOptions {
    /// Elements whose content is never searched for math
    pub skip_html_tags: Option<Vec<String>>,
    /// Class that turns off searching for an element and its children
    pub ignore_html_class: Option<String>,
    /// Class that turns searching back on inside an ignored subtree
    pub process_html_class: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedLiteAdaptorOptions {
    pub skip_html_tags: Vec<String>,
    pub ignore_html_class: String,
    pub process_html_class: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl LiteAdaptorOptions {
    pub fn resolve(self) -> ResolvedLiteAdaptorOptions {
        ResolvedLiteAdaptorOptions {
            skip_html_tags: self.skip_html_tags.unwrap_or_else(|| {
                [
                    "script",
                    "noscript",
                    "style",
                    "textarea",
                    "pre",
                    "code",
                    "annotation",
                    "annotation-xml",
                ]
                .iter()
                .map(|tag| tag.to_string())
                .collect()
            }),
            ignore_html_class: self
                .ignore_html_class
                .unwrap_or_else(|| "tex2jax_ignore".to_string()),
            process_html_class: self
                .process_html_class
                .unwrap_or_else(|| "tex2jax_process".to_string()),
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_options_resolve_to_defaults() {
        let resolved = Options::default().resolve();
        assert_eq!(resolved.output, "svg");
        assert!(!resolved.tex.packages.iter().any(|p| p == "bussproofs"));
        assert_eq!(resolved.tex.packages.len(), ALL_PACKAGES.len() - 1);
        assert_eq!(
            resolved.tex.inline_math,
            vec![
                ("$".to_string(), "$".to_string()),
                ("\\(".to_string(), "\\)".to_string())
            ]
        );
        assert_eq!(resolved.svg.font_cache, FontCache::Global);
        assert_eq!(resolved.chtml.font_url, DEFAULT_FONT_URL);
        assert!(resolved.assistive_mml);
        assert!(resolved.extra.is_empty());
    }

    #[test]
    fn nested_groups_merge_shallowly() {
        let options = Options::from_toml_str(
            r#"
            output = "chtml"

            [tex]
            process-escapes = false
            inline-math = [["@", "@"]]

            [svg]
            font-cache = "local"
            "#,
        )
        .unwrap();
        let resolved = options.resolve();
        assert_eq!(resolved.output, "chtml");
        assert!(!resolved.tex.process_escapes);
        assert!(resolved.tex.process_environments);
        assert_eq!(
            resolved.tex.inline_math,
            vec![("@".to_string(), "@".to_string())]
        );
        assert_eq!(resolved.tex.display_math.len(), 2);
        assert_eq!(resolved.svg.font_cache, FontCache::Local);
        assert_eq!(resolved.svg.display_align, DisplayAlign::Center);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let options = Options::from_toml_str(
            r#"
            loader = "none"

            [tex]
            tags = "ams"

            [chtml]
            scale = 1.2
            "#,
        )
        .unwrap();
        let resolved = options.resolve();
        assert_eq!(
            resolved.extra.get("loader"),
            Some(&toml::Value::String("none".to_string()))
        );
        assert_eq!(
            resolved.tex.extra.get("tags"),
            Some(&toml::Value::String("ams".to_string()))
        );
        assert_eq!(
            resolved.chtml.extra.get("scale"),
            Some(&toml::Value::Float(1.2))
        );
    }

    #[test]
    fn bad_font_cache_is_a_config_error() {
        let err = Options::from_toml_str("[svg]\nfont-cache = \"sometimes\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
