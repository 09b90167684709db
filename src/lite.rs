/*!
 * A lightweight, forgiving HTML document.
 *
 * Pages are split into a flat list of tokens. Nothing is normalized, so
 * serializing an untouched document gives back the input text.
 */

use crate::config::ResolvedLiteAdaptorOptions;

/// Elements whose content is raw text and never contains tags.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements that never have an end tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Clone, Debug, PartialEq)]
pub struct StartTag {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order, names lowercased, values undecoded
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
    /// Source text, `<` through `>`
    pub raw: String,
}

impl StartTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map_or(false, |c| c.split_whitespace().any(|c| c == class))
    }

    fn is_void(&self) -> bool {
        self.self_closing || VOID_TAGS.contains(&self.name.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Doctype(String),
    Comment(String),
    StartTag(StartTag),
    EndTag { name: String, raw: String },
    Text(String),
    /// Content of a raw text element
    RawText(String),
    /// Markup added after parsing; never searched for math
    Markup(String),
}

impl Token {
    fn raw(&self) -> &str {
        match self {
            Token::Doctype(s)
            | Token::Comment(s)
            | Token::Text(s)
            | Token::RawText(s)
            | Token::Markup(s) => s,
            Token::StartTag(tag) => &tag.raw,
            Token::EndTag { raw, .. } => raw,
        }
    }

    fn is_start(&self, name: &str) -> bool {
        matches!(self, Token::StartTag(tag) if tag.name == name)
    }

    fn is_end(&self, name: &str) -> bool {
        matches!(self, Token::EndTag { name: n, .. } if n == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiteDocument {
    tokens: Vec<Token>,
}

impl LiteDocument {
    pub fn parse(html: &str) -> Self {
        Tokenizer::new(html).run()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Replaces a text token with markup.
    pub fn replace_text(&mut self, index: usize, markup: String) {
        self.tokens[index] = Token::Markup(markup);
    }

    /// Indices of the text tokens that may contain math. When the page has a
    /// `<body>`, only text inside it is searched.
    pub fn scannable_text(&self, options: &ResolvedLiteAdaptorOptions) -> Vec<usize> {
        #[derive(Clone, Copy)]
        struct Frame<'a> {
            name: &'a str,
            skipped: bool,
            ignored: bool,
        }

        let root = Frame {
            name: "",
            skipped: false,
            ignored: false,
        };
        let mut stack: Vec<Frame<'_>> = Vec::new();
        let mut found = Vec::new();
        let mut in_body = !self.tokens.iter().any(|t| t.is_start("body"));
        for (i, token) in self.tokens.iter().enumerate() {
            let top = stack.last().copied().unwrap_or(root);
            if token.is_start("body") {
                in_body = true;
            } else if token.is_end("body") {
                in_body = false;
            }
            match token {
                Token::StartTag(tag) if !tag.is_void() => {
                    let process = tag.has_class(&options.process_html_class);
                    let skip_tag = options.skip_html_tags.iter().any(|t| *t == tag.name);
                    stack.push(Frame {
                        name: &tag.name,
                        skipped: top.skipped || (skip_tag && !process),
                        ignored: (top.ignored || tag.has_class(&options.ignore_html_class))
                            && !process,
                    });
                }
                Token::EndTag { name, .. } => {
                    if let Some(pos) = stack.iter().rposition(|f| f.name == name) {
                        stack.truncate(pos);
                    }
                }
                Token::Text(_) if in_body && !top.skipped && !top.ignored => found.push(i),
                _ => {}
            }
        }
        found
    }

    /// Inserts markup at the end of `<head>`, creating the element if needed.
    pub fn append_to_head(&mut self, markup: &str) {
        if let Some(i) = self.tokens.iter().position(|t| t.is_end("head")) {
            self.tokens.insert(i, Token::Markup(markup.to_string()));
        } else if let Some(i) = self.tokens.iter().position(|t| t.is_start("head")) {
            self.tokens.insert(i + 1, Token::Markup(markup.to_string()));
        } else {
            let head = Token::Markup(format!("<head>{}</head>", markup));
            match self.tokens.iter().position(|t| t.is_start("html")) {
                Some(i) => self.tokens.insert(i + 1, head),
                None => {
                    let i = self
                        .tokens
                        .iter()
                        .position(|t| !matches!(t, Token::Doctype(_)))
                        .unwrap_or(self.tokens.len());
                    self.tokens.insert(i, head);
                }
            }
        }
    }

    /// Inserts markup at the end of `<body>`, or of the document.
    pub fn append_to_body(&mut self, markup: &str) {
        let at = self
            .tokens
            .iter()
            .position(|t| t.is_end("body"))
            .or_else(|| self.tokens.iter().position(|t| t.is_end("html")))
            .unwrap_or(self.tokens.len());
        self.tokens.insert(at, Token::Markup(markup.to_string()));
    }

    /// Removes the first element with the given id, along with its content.
    pub fn remove_element_by_id(&mut self, id: &str) -> bool {
        let found = self.tokens.iter().enumerate().find_map(|(i, t)| match t {
            Token::StartTag(tag) if tag.attr("id") == Some(id) => Some((i, tag.clone())),
            _ => None,
        });
        if let Some((start, tag)) = found {
            let end = if tag.is_void() {
                start
            } else {
                self.matching_end(start, &tag.name)
            };
            self.tokens.drain(start..=end);
            return true;
        }
        // Elements added as markup are not tokenized; reparse them to look inside.
        for i in 0..self.tokens.len() {
            if let Token::Markup(markup) = &self.tokens[i] {
                if markup.contains(id) {
                    let mut inner = LiteDocument::parse(markup);
                    if inner.remove_element_by_id(id) {
                        self.tokens[i] = Token::Markup(inner.concat());
                        return true;
                    }
                }
            }
        }
        false
    }

    fn matching_end(&self, start: usize, name: &str) -> usize {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(start + 1) {
            match token {
                Token::StartTag(tag) if tag.name == name && !tag.is_void() => depth += 1,
                Token::EndTag { name: n, .. } if n == name => {
                    if depth == 0 {
                        return i;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        self.tokens.len() - 1
    }

    fn concat(&self) -> String {
        self.tokens.iter().map(Token::raw).collect()
    }

    /// The document text, always ending in a newline.
    pub fn serialize(&self) -> String {
        let mut out = self.concat();
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

struct Tokenizer<'a> {
    src: &'a str,
    lower: String,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            // ASCII lowercasing keeps byte offsets
            lower: src.to_ascii_lowercase(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> LiteDocument {
        while self.pos < self.src.len() {
            let rest = &self.lower[self.pos..];
            if rest.starts_with("<!--") {
                let end = self.find_from(self.pos + 4, "-->").map_or(self.src.len(), |i| i + 3);
                self.emit_until(end, Token::Comment);
            } else if rest.starts_with("<!doctype") {
                let end = self.find_from(self.pos, ">").map_or(self.src.len(), |i| i + 1);
                self.emit_until(end, Token::Doctype);
            } else if rest.starts_with("</") && starts_alpha(&rest[2..]) {
                self.end_tag();
            } else if rest.starts_with('<') && starts_alpha(&rest[1..]) {
                self.start_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = self.find_from(self.pos, ">").map_or(self.src.len(), |i| i + 1);
                self.emit_until(end, Token::Comment);
            } else {
                self.text();
            }
        }
        LiteDocument {
            tokens: self.tokens,
        }
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.lower[from..].find(needle).map(|i| i + from)
    }

    fn emit_until(&mut self, end: usize, make: impl FnOnce(String) -> Token) {
        self.tokens.push(make(self.src[self.pos..end].to_string()));
        self.pos = end;
    }

    fn text(&mut self) {
        let start = self.pos;
        let mut end = self.src.len();
        let mut from = start + self.src[start..].chars().next().map_or(1, char::len_utf8);
        while let Some(i) = self.find_from(from, "<") {
            let next = &self.lower[i + 1..];
            if starts_alpha(next) || next.starts_with('/') || next.starts_with('!') || next.starts_with('?')
            {
                end = i;
                break;
            }
            from = i + 1;
        }
        let text = &self.src[start..end];
        match self.tokens.last_mut() {
            Some(Token::Text(prev)) => prev.push_str(text),
            _ => self.tokens.push(Token::Text(text.to_string())),
        }
        self.pos = end;
    }

    /// Position just past the `>` closing the tag at `self.pos`. Quotes count
    /// only where an attribute value starts.
    fn tag_end(&self) -> usize {
        let bytes = self.src.as_bytes();
        let mut quote = None;
        let mut after_eq = false;
        for (i, &b) in bytes.iter().enumerate().skip(self.pos + 1) {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if after_eq && (b == b'"' || b == b'\'') => quote = Some(b),
                None if b == b'>' => return i + 1,
                None => {}
            }
            if !b.is_ascii_whitespace() {
                after_eq = quote.is_none() && b == b'=';
            }
        }
        self.src.len()
    }

    fn end_tag(&mut self) {
        let end = self.tag_end();
        let name = tag_name(&self.lower[self.pos + 2..end]);
        self.tokens.push(Token::EndTag {
            name,
            raw: self.src[self.pos..end].to_string(),
        });
        self.pos = end;
    }

    fn start_tag(&mut self) {
        let end = self.tag_end();
        let raw = &self.src[self.pos..end];
        let name = tag_name(&self.lower[self.pos + 1..end]);
        let inner = raw[1..].trim_end_matches('>');
        let self_closing = inner.ends_with('/');
        let attrs = parse_attrs(&inner[name.len()..]);
        self.tokens.push(Token::StartTag(StartTag {
            name: name.clone(),
            attrs,
            self_closing,
            raw: raw.to_string(),
        }));
        self.pos = end;

        if RAW_TEXT_TAGS.contains(&name.as_str()) && !self_closing {
            let close = format!("</{}", name);
            let content_end = self.find_from(self.pos, &close).unwrap_or(self.src.len());
            if content_end > self.pos {
                self.emit_until(content_end, Token::RawText);
            }
        }
    }
}

fn starts_alpha(s: &str) -> bool {
    s.as_bytes().first().map_or(false, u8::is_ascii_alphabetic)
}

fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect()
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();
        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ '"') | Some(q @ '\'') => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    value = body[..close].to_string();
                    rest = body.get(close + 1..).unwrap_or("");
                }
                _ => {
                    let len = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = after_eq[..len].to_string();
                    rest = &after_eq[len..];
                }
            }
        }
        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
    attrs
}
