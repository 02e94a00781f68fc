//! Terminal rendering for assistant replies.
//!
//! [`render`] is pure: it splits raw reply text into prose and fenced code
//! blocks ([`partition`]), draws each code block inside a light box-drawing
//! frame sized to its content and the terminal ([`CodeBox`]), and wraps long
//! code lines so no character is ever cut off. Prose passes through with a
//! single ambient color.
//!
//! Widths are counted in `char`s.

use std::sync::LazyLock;

use console::Style;
use regex::Regex;

/// Opening fence with its info line, body, closing fence. The language tag is
/// the info line's first token, up to whitespace or a comma. An opening fence
/// without a matching close does not match and stays prose.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([^\s`,]*)[^\n`]*\n(.*?)```").expect("fence pattern is valid")
});

/// Language label used when a fence carries no tag.
pub const DEFAULT_LANGUAGE: &str = "text";

/// Minimum usable box width, whatever the terminal reports.
pub const MIN_CONTENT_WIDTH: usize = 40;

/// One contiguous span of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedBlock<'a> {
    /// Text outside any fence, passed through as-is.
    Prose(&'a str),
    /// A fenced code block.
    Code(CodeBlock<'a>),
}

/// The parts of a fenced block that survive into the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    pub language: &'a str,
    pub lines: Vec<&'a str>,
}

/// Styles applied while drawing. [`Palette::plain`] emits no escape codes.
#[derive(Debug, Clone)]
pub struct Palette {
    pub prose: Style,
    pub border: Style,
    pub label: Style,
    pub code: Style,
}

impl Palette {
    /// ANSI colors, emitted even when stdout is not a terminal.
    pub fn ansi() -> Self {
        Self {
            prose: Style::new().cyan().force_styling(true),
            border: Style::new().black().bright().force_styling(true),
            label: Style::new().cyan().force_styling(true),
            code: Style::new().white().force_styling(true),
        }
    }

    /// [`Palette::ansi`] when stdout takes colors, [`Palette::plain`] otherwise.
    pub fn for_stdout() -> Self {
        if console::colors_enabled() {
            Self::ansi()
        } else {
            Self::plain()
        }
    }

    pub fn plain() -> Self {
        let none = Style::new().force_styling(false);
        Self {
            prose: none.clone(),
            border: none.clone(),
            label: none.clone(),
            code: none,
        }
    }
}

/// Split `raw` into prose and code blocks, in original order.
pub fn partition(raw: &str) -> Vec<RenderedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for caps in FENCE.captures_iter(raw) {
        let whole = caps.get(0).expect("group 0 always participates");
        if whole.start() > cursor {
            blocks.push(RenderedBlock::Prose(&raw[cursor..whole.start()]));
        }

        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|tag| !tag.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE);
        let body = caps.get(2).map_or("", |m| m.as_str());
        // The newline before the closing fence ends the last line, it is not a line itself.
        let body = body.strip_suffix('\n').unwrap_or(body);
        let body = body.strip_suffix('\r').unwrap_or(body);
        let lines = if body.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .collect()
        };

        blocks.push(RenderedBlock::Code(CodeBlock { language, lines }));
        cursor = whole.end();
    }

    if cursor < raw.len() {
        blocks.push(RenderedBlock::Prose(&raw[cursor..]));
    }
    blocks
}

/// Render a reply for a terminal `terminal_width` columns wide, with colors.
pub fn render(raw: &str, terminal_width: usize) -> String {
    render_with(raw, terminal_width, &Palette::ansi())
}

/// Render with an explicit palette.
pub fn render_with(raw: &str, terminal_width: usize, palette: &Palette) -> String {
    partition(raw)
        .into_iter()
        .map(|block| match block {
            RenderedBlock::Prose(text) => palette.prose.apply_to(text).to_string(),
            RenderedBlock::Code(code) => {
                let frame = CodeBox::layout(code, terminal_width);
                format!("\n{}\n", frame.draw(palette))
            }
        })
        .collect()
}

/// Horizontal space a box may occupy: the terminal minus a margin, floored.
pub fn available_width(terminal_width: usize) -> usize {
    terminal_width.saturating_sub(4).max(MIN_CONTENT_WIDTH)
}

/// Total box width for the given content, borders included.
///
/// Wide enough for the longest line plus padding and for the language label,
/// but never wider than [`available_width`].
pub fn border_width(lines: &[&str], language: &str, terminal_width: usize) -> usize {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let wanted = (longest + 8).max(language.chars().count() + 12);
    wanted.min(available_width(terminal_width))
}

/// Split `line` into fragments of at most `interior` chars.
///
/// Prefers to break just after the last space of a fragment, as long as that
/// still leaves more than `interior - 4` chars in it; otherwise breaks hard at
/// `interior`. Spaces stay attached to the fragment they end, so the fragments
/// concatenate back to `line` exactly.
pub fn wrap_line(line: &str, interior: usize) -> Vec<&str> {
    let interior = interior.max(1);
    let mut fragments = Vec::new();
    let mut rest = line;

    loop {
        let Some((cut, _)) = rest.char_indices().nth(interior) else {
            fragments.push(rest);
            return fragments;
        };

        let chunk = &rest[..cut];
        let split_at = if chunk.ends_with(' ') {
            cut
        } else {
            match chunk.rfind(' ') {
                Some(space) if chunk[..space].chars().count() > interior.saturating_sub(4) => {
                    space + 1
                }
                _ => cut,
            }
        };

        fragments.push(&rest[..split_at]);
        rest = &rest[split_at..];
        if rest.is_empty() {
            return fragments;
        }
    }
}

/// A code block with its computed geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBox<'a> {
    pub language: &'a str,
    pub lines: Vec<&'a str>,
    pub border_width: usize,
}

impl<'a> CodeBox<'a> {
    pub fn layout(block: CodeBlock<'a>, terminal_width: usize) -> Self {
        let border_width = border_width(&block.lines, block.language, terminal_width);
        Self {
            language: block.language,
            lines: block.lines,
            border_width,
        }
    }

    /// Usable columns between `│ ` and ` │`.
    pub fn interior_width(&self) -> usize {
        self.border_width.saturating_sub(4).max(1)
    }

    /// Body rows after wrapping, one `Vec` entry per emitted row.
    pub fn rows(&self) -> Vec<&'a str> {
        let interior = self.interior_width();
        self.lines
            .iter()
            .flat_map(|&line| wrap_line(line, interior))
            .collect()
    }

    pub fn draw(&self, palette: &Palette) -> String {
        let width = self.border_width;
        let interior = self.interior_width();
        let rule = "─".repeat(width.saturating_sub(2));
        let label = self.language.to_uppercase();

        let mut out = Vec::with_capacity(self.lines.len() + 4);
        out.push(palette.border.apply_to(format!("┌{rule}┐")).to_string());
        out.push(format!(
            "{}{}{}{}",
            palette.border.apply_to("│ "),
            palette.label.apply_to(&label),
            " ".repeat(width.saturating_sub(label.chars().count() + 4)),
            palette.border.apply_to(" │"),
        ));
        out.push(palette.border.apply_to(format!("├{rule}┤")).to_string());
        for row in self.rows() {
            out.push(format!(
                "{}{}{}{}",
                palette.border.apply_to("│ "),
                palette.code.apply_to(row),
                " ".repeat(interior.saturating_sub(row.chars().count())),
                palette.border.apply_to(" │"),
            ));
        }
        out.push(palette.border.apply_to(format!("└{rule}┘")).to_string());
        out.join("\n")
    }
}
