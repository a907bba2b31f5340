//! Read-only view over a markdown document
//!
//! Headings, H2 sections and fenced code blocks are derived by a single
//! line scan. Lines inside fenced code never count as headings.

use serde::{Deserialize, Serialize};

/// A markdown heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Number of leading `#` characters (1-6)
    pub level: usize,
    pub text: String,
    /// Byte offset of the heading line
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
}

/// A fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub body: String,
    /// 1-based line number of the opening fence
    pub line: usize,
}

/// An H2 section and everything under it up to the next H1/H2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    /// Non-empty lines of the body, nested headings included
    pub fn content_lines(&self) -> usize {
        self.body.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// Immutable document content for one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: String,
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn parse_heading(line: &str) -> Option<(usize, String)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim();
    if text.is_empty() {
        return None;
    }
    Some((level, text.to_string()))
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Lines paired with their byte offset and whether they sit inside a fence
    fn scan(&self) -> Vec<(usize, &str, bool)> {
        let mut out = Vec::new();
        let mut offset = 0;
        let mut in_fence = false;
        for line in self.content.split_inclusive('\n') {
            let text = line.trim_end_matches(['\n', '\r']);
            if is_fence(text) {
                out.push((offset, text, true));
                in_fence = !in_fence;
            } else {
                out.push((offset, text, in_fence));
            }
            offset += line.len();
        }
        out
    }

    /// Ordered headings outside fenced code
    pub fn headings(&self) -> Vec<Heading> {
        self.scan()
            .into_iter()
            .enumerate()
            .filter(|(_, (_, _, fenced))| !fenced)
            .filter_map(|(idx, (offset, text, _))| {
                parse_heading(text).map(|(level, text)| Heading {
                    level,
                    text,
                    offset,
                    line: idx + 1,
                })
            })
            .collect()
    }

    /// Titles of all second-level headings, in order
    pub fn h2_titles(&self) -> Vec<String> {
        self.headings()
            .into_iter()
            .filter(|h| h.level == 2)
            .map(|h| h.text)
            .collect()
    }

    /// H2 sections in document order
    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<Section> = None;

        for (_, text, fenced) in self.scan() {
            let heading = if fenced { None } else { parse_heading(text) };
            match heading {
                Some((level, title)) if level <= 2 => {
                    if let Some(done) = current.take() {
                        sections.push(done);
                    }
                    if level == 2 {
                        current = Some(Section {
                            title,
                            body: String::new(),
                        });
                    }
                }
                _ => {
                    if let Some(section) = current.as_mut() {
                        section.body.push_str(text);
                        section.body.push('\n');
                    }
                }
            }
        }
        if let Some(done) = current {
            sections.push(done);
        }
        sections
    }

    /// Body of the first H2 section whose title contains `keyword`
    /// (case-insensitive)
    pub fn section_containing(&self, keyword: &str) -> Option<Section> {
        let keyword = keyword.to_lowercase();
        self.sections()
            .into_iter()
            .find(|s| s.title.to_lowercase().contains(&keyword))
    }

    /// Fenced code blocks. An unterminated fence runs to the end.
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut open: Option<CodeBlock> = None;

        for (idx, line) in self.content.lines().enumerate() {
            let trimmed = line.trim_start();
            if is_fence(trimmed) {
                match open.take() {
                    Some(block) => blocks.push(block),
                    None => {
                        let lang = trimmed.trim_start_matches(['`', '~']).trim();
                        open = Some(CodeBlock {
                            language: (!lang.is_empty()).then(|| lang.to_string()),
                            body: String::new(),
                            line: idx + 1,
                        });
                    }
                }
            } else if let Some(block) = open.as_mut() {
                block.body.push_str(line);
                block.body.push('\n');
            }
        }
        if let Some(block) = open {
            blocks.push(block);
        }
        blocks
    }

    /// Content with fenced code blocks (fences included) removed
    pub fn strip_code_blocks(&self) -> String {
        let mut out = String::with_capacity(self.content.len());
        for (_, text, fenced) in self.scan() {
            if !fenced {
                out.push_str(text);
                out.push('\n');
            }
        }
        out
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

impl From<String> for Document {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}
