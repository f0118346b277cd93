//! `<head>` metadata extraction
//!
//! A forgiving tag scanner, not an HTML parser: it only needs to find the
//! `<meta>` tags between `<head>` and `</head>` of real-world pages, which
//! may be truncated or malformed.

/// Elements whose content is raw text and must not be scanned for tags.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "title", "textarea"];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Advance while `keep` holds and return the consumed slice.
    fn take_while<F: Fn(u8) -> bool>(&mut self, keep: F) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Move past the next occurrence of `needle`, or to the end of input.
    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            let lt = self.rest().find('<')?;
            self.pos += lt;
            let rest = self.rest();

            if rest.starts_with("<!--") {
                self.pos += 4;
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let name = self.take_while(|b| b.is_ascii_alphanumeric()).to_ascii_lowercase();
                self.skip_past(">");
                if name.is_empty() {
                    continue;
                }
                return Some(Token::End { name });
            }

            // "<" followed by anything but a letter is text
            if !rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic) {
                self.pos += 1;
                continue;
            }

            self.pos += 1;
            let name = self
                .take_while(|b| !b.is_ascii_whitespace() && b != b'/' && b != b'>')
                .to_ascii_lowercase();
            let attrs = self.attributes()?;

            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                self.skip_raw_text(&name);
            }
            return Some(Token::Start { name, attrs });
        }
    }

    /// Attributes up to and including the closing `>`; `None` if the input
    /// ends inside the tag.
    fn attributes(&mut self) -> Option<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek()? {
                b'>' => {
                    self.pos += 1;
                    return Some(attrs);
                }
                b'/' => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let name = self.take_while(|b| {
                !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/'
            });
            if name.is_empty() {
                // stray '='
                self.pos += 1;
                continue;
            }
            let name = name.to_ascii_lowercase();

            self.skip_whitespace();
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_whitespace();
                match self.peek()? {
                    quote @ (b'"' | b'\'') => {
                        self.pos += 1;
                        let value = self.take_while(|b| b != quote);
                        self.peek()?;
                        self.pos += 1;
                        value
                    }
                    _ => self.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
                }
            } else {
                ""
            };

            attrs.push((name, unescape(value)));
        }
    }

    /// Skip to the matching `</name`, leaving the end tag to be tokenized.
    fn skip_raw_text(&mut self, name: &str) {
        let closing = format!("</{}", name);
        let haystack = self.rest().as_bytes();
        let found = haystack
            .windows(closing.len())
            .position(|w| w.eq_ignore_ascii_case(closing.as_bytes()));
        match found {
            Some(i) => self.pos += i,
            None => self.pos = self.src.len(),
        }
    }
}

/// Collect the `<meta>` tags inside `<head>`, re-serialized with escaped
/// attribute values, in document order.
///
/// Scanning stops at `</head>` (or an implicit `<body>`). Scripts, links and
/// styles are never collected.
pub fn extract_head_meta(html: &str) -> Vec<String> {
    let mut scanner = Scanner::new(html);
    let mut in_head = false;
    let mut tags = Vec::new();

    while let Some(token) = scanner.next_token() {
        match token {
            Token::Start { name, attrs } => match name.as_str() {
                "head" => in_head = true,
                "body" => break,
                "meta" if in_head => tags.push(render_meta(&attrs)),
                _ => {}
            },
            Token::End { name } if name == "head" => break,
            Token::End { .. } => {}
        }
    }

    tags
}

/// Whether `buf` already contains the end of the head section.
pub fn head_closed(buf: &[u8]) -> bool {
    const NEEDLES: [&[u8]; 2] = [b"</head", b"<body"];
    NEEDLES.iter().any(|needle| {
        buf.windows(needle.len())
            .any(|w| w.eq_ignore_ascii_case(needle))
    })
}

fn render_meta(attrs: &[(String, String)]) -> String {
    let mut out = String::from("<meta");
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_html(value));
        out.push('"');
    }
    out.push('>');
    out
}

/// Escape for HTML text and quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode character references; unknown ones are kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    let code = if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                }
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
