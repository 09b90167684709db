use std::collections::HashMap;

use regex::{Captures, Regex};

use super::PageState;
use crate::config::FontCache;
use crate::error::Result;

/// Rewrites MathJax SVG output for the configured font cache.
///
/// MathJax emits each expression with its own `<defs>` holding one `<path>`
/// per glyph, referenced through `<use xlink:href="#MJX-n-TEX-...">`.
pub struct FontCacheRewriter {
    mode: FontCache,
    defs: Regex,
    path: Regex,
    uses: Regex,
}

impl FontCacheRewriter {
    pub fn new(mode: FontCache) -> Result<Self> {
        Ok(Self {
            mode,
            defs: Regex::new(r"(?s)<defs>(.*?)</defs>")?,
            path: Regex::new(r#"<path\s+id="([^"]+)"\s+d="([^"]*)"[^>]*?/?>(?:</path>)?"#)?,
            uses: Regex::new(
                r##"<use\b([^>]*?)\s*(?:xlink:)?href="#([^"]+)"([^>]*?)\s*/?>(?:</use>)?"##,
            )?,
        })
    }

    pub fn rewrite(&self, svg: &str, page: &mut PageState) -> String {
        match self.mode {
            FontCache::Local => svg.to_string(),
            FontCache::Global => self.hoist(svg, page),
            FontCache::None => self.inline(svg),
        }
    }

    fn glyphs(&self, svg: &str) -> Vec<(String, String)> {
        self.defs
            .captures_iter(svg)
            .flat_map(|defs| {
                self.path
                    .captures_iter(defs.get(1).map_or("", |m| m.as_str()))
                    .map(|p| (p[1].to_string(), p[2].to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Moves glyphs into the page cache and points uses at it.
    fn hoist(&self, svg: &str, page: &mut PageState) -> String {
        for (id, d) in self.glyphs(svg) {
            page.glyphs.entry(global_id(&id)).or_insert(d);
        }
        let svg = self.defs.replace_all(svg, "");
        self.uses
            .replace_all(&svg, |caps: &Captures<'_>| {
                format!(
                    "<use{} xlink:href=\"#{}\"{}></use>",
                    &caps[1],
                    global_id(&caps[2]),
                    &caps[3]
                )
            })
            .into_owned()
    }

    /// Replaces each use with the path it refers to.
    fn inline(&self, svg: &str) -> String {
        let glyphs: HashMap<String, String> = self.glyphs(svg).into_iter().collect();
        let svg = self.defs.replace_all(svg, "");
        self.uses
            .replace_all(&svg, |caps: &Captures<'_>| match glyphs.get(&caps[2]) {
                Some(d) => format!("<path{}{} d=\"{}\"></path>", &caps[1], &caps[3], d),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// The hidden SVG holding every cached glyph of a page.
    pub fn global_cache(&self, page: &PageState) -> Option<String> {
        if self.mode != FontCache::Global {
            return None;
        }
        let paths: String = page
            .glyphs
            .iter()
            .map(|(id, d)| format!("<path id=\"{}\" d=\"{}\"></path>", id, d))
            .collect();
        Some(format!(
            "<svg id=\"{}\" style=\"display: none;\" xmlns=\"http://www.w3.org/2000/svg\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\"><defs>{}</defs></svg>",
            super::SVG_GLOBAL_CACHE_ID,
            paths
        ))
    }
}

/// `MJX-3-TEX-I-1D465` becomes `MJX-TEX-I-1D465`, so the same glyph from
/// different expressions shares one id.
fn global_id(id: &str) -> String {
    if let Some(rest) = id.strip_prefix("MJX-") {
        if let Some((counter, glyph)) = rest.split_once('-') {
            if !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()) {
                return format!("MJX-{}", glyph);
            }
        }
    }
    id.to_string()
}
