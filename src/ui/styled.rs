//! # Styled Lines
//!
//! Command output arrives as text with embedded ANSI escape sequences. Instead of
//! carrying the escape codes around (and slicing through them), each line is
//! parsed once into a [`StyledLine`]: the visible characters plus a run-list of
//! [`StyleRun`]s describing which columns carry which [`Style`].
//!
//! ## Invariants
//!
//! - Runs are sorted by column and never overlap.
//! - Runs are never empty and never carry `Style::default()`.
//! - Adjacent runs with the same style are merged.
//!
//! Columns are counted in characters. Tabs are expanded to 8-column stops and
//! other control characters are dropped while parsing.
//!
//! ## Slicing
//!
//! [`StyledLine::slice`] cuts a column window out of a line. Because styles are
//! runs rather than escape codes, a style that started left of the window is
//! still active on the window's first column, and nothing leaks past its right
//! edge.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use std::sync::LazyLock;

const TAB_WIDTH: usize = 8;

/// Standard ANSI colors (codes 30-37 for fg, 40-47 for bg)
const STANDARD_COLORS: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Gray,
];

/// Bright ANSI colors (codes 90-97 for fg, 100-107 for bg)
const BRIGHT_COLORS: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

/// CSI sequences (group 1 = params, group 2 = final byte), OSC strings and
/// two-byte escapes.
static ESCAPE_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[([0-9;:?<=>]*)[ -/]*([@-~])|\][^\x07\x1b]*(?:\x07|\x1b\\)?|[@-Z\\-_])")
        .expect("escape sequence pattern is valid")
});

/// A column range `[start, end)` rendered with one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

/// A line of visible text plus the style runs that decorate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    text: String,
    runs: Vec<StyleRun>,
    width: usize,
}

impl StyledLine {
    /// A line without any styling.
    pub fn plain(text: &str) -> Self {
        Self::styled(text, Style::default())
    }

    /// A line with a single style over all of its text.
    pub fn styled(text: &str, style: Style) -> Self {
        let mut line = Self::default();
        line.push(text, style);
        line
    }

    /// Parse a raw line that may contain ANSI escape sequences.
    ///
    /// SGR sequences (`ESC [ ... m`) update the active style; every other
    /// escape sequence is stripped without effect.
    pub fn parse_ansi(raw: &str) -> Self {
        let mut line = Self::default();
        let mut style = Style::default();
        let mut last = 0;

        for caps in ESCAPE_SEQUENCE.captures_iter(raw) {
            let Some(sequence) = caps.get(0) else {
                continue;
            };
            line.push(&raw[last..sequence.start()], style);
            if caps.get(2).map(|f| f.as_str()) == Some("m") {
                let params = caps.get(1).map_or("", |p| p.as_str());
                style = apply_sgr(style, params);
            }
            last = sequence.end();
        }
        line.push(&raw[last..], style);

        line
    }

    /// Append text with the given style.
    pub fn push(&mut self, text: &str, style: Style) -> &mut Self {
        let start = self.width;
        for ch in text.chars() {
            match ch {
                '\t' => {
                    let pad = TAB_WIDTH - self.width % TAB_WIDTH;
                    self.text.extend(std::iter::repeat_n(' ', pad));
                    self.width += pad;
                }
                c if c.is_control() => {}
                c => {
                    self.text.push(c);
                    self.width += 1;
                }
            }
        }
        self.add_run(start, self.width, style);
        self
    }

    fn add_run(&mut self, start: usize, end: usize, style: Style) {
        if start >= end || style == Style::default() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.end == start && last.style == style {
                last.end = end;
                return;
            }
        }
        self.runs.push(StyleRun { start, end, style });
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[StyleRun] {
        &self.runs
    }

    /// Number of columns the line occupies.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// The style active at `column`, `Style::default()` outside every run.
    pub fn style_at(&self, column: usize) -> Style {
        self.runs
            .iter()
            .find(|r| r.start <= column && column < r.end)
            .map_or_else(Style::default, |r| r.style)
    }

    /// Cut out the column window `[start, end)`.
    ///
    /// The result is re-based so that `start` becomes column 0. Windows that
    /// extend past the end of the line are shortened; empty windows yield an
    /// empty line.
    pub fn slice(&self, start: usize, end: usize) -> StyledLine {
        let end = end.min(self.width);
        if start >= end {
            return StyledLine::default();
        }

        let text: String = self.text.chars().skip(start).take(end - start).collect();
        let runs = self
            .runs
            .iter()
            .filter_map(|run| {
                let s = run.start.max(start);
                let e = run.end.min(end);
                (s < e).then_some(StyleRun {
                    start: s - start,
                    end: e - start,
                    style: run.style,
                })
            })
            .collect();

        StyledLine {
            text,
            runs,
            width: end - start,
        }
    }

    /// Convert into a ratatui [`Line`] with one span per run and gap.
    pub fn to_line(&self) -> Line<'static> {
        let chars: Vec<char> = self.text.chars().collect();
        let mut spans = Vec::with_capacity(self.runs.len() * 2 + 1);
        let mut column = 0;

        for run in &self.runs {
            if column < run.start {
                spans.push(Span::raw(chars[column..run.start].iter().collect::<String>()));
            }
            spans.push(Span::styled(
                chars[run.start..run.end].iter().collect::<String>(),
                run.style,
            ));
            column = run.end;
        }
        if column < chars.len() {
            spans.push(Span::raw(chars[column..].iter().collect::<String>()));
        }

        Line::from(spans)
    }
}

impl From<&str> for StyledLine {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

/// Apply SGR (Select Graphic Rendition) parameters to a style.
///
/// Only `fg`, `bg` and `add_modifier` are touched so that a fully reset style
/// compares equal to `Style::default()`.
fn apply_sgr(mut style: Style, params: &str) -> Style {
    let codes: Vec<u16> = params
        .split([';', ':'])
        .map(|p| p.parse().unwrap_or(0))
        .collect();

    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            0 => style = Style::default(),

            1 => style.add_modifier.insert(Modifier::BOLD),
            2 => style.add_modifier.insert(Modifier::DIM),
            3 => style.add_modifier.insert(Modifier::ITALIC),
            4 => style.add_modifier.insert(Modifier::UNDERLINED),
            5 => style.add_modifier.insert(Modifier::SLOW_BLINK),
            6 => style.add_modifier.insert(Modifier::RAPID_BLINK),
            7 => style.add_modifier.insert(Modifier::REVERSED),
            8 => style.add_modifier.insert(Modifier::HIDDEN),
            9 => style.add_modifier.insert(Modifier::CROSSED_OUT),

            21 | 22 => style.add_modifier.remove(Modifier::BOLD | Modifier::DIM),
            23 => style.add_modifier.remove(Modifier::ITALIC),
            24 => style.add_modifier.remove(Modifier::UNDERLINED),
            25 => style
                .add_modifier
                .remove(Modifier::SLOW_BLINK | Modifier::RAPID_BLINK),
            27 => style.add_modifier.remove(Modifier::REVERSED),
            28 => style.add_modifier.remove(Modifier::HIDDEN),
            29 => style.add_modifier.remove(Modifier::CROSSED_OUT),

            c @ 30..=37 => style.fg = Some(STANDARD_COLORS[usize::from(c - 30)]),
            38 => {
                let (color, used) = extended_color(&codes[i + 1..]);
                if color.is_some() {
                    style.fg = color;
                }
                i += used;
            }
            39 => style.fg = None,

            c @ 40..=47 => style.bg = Some(STANDARD_COLORS[usize::from(c - 40)]),
            48 => {
                let (color, used) = extended_color(&codes[i + 1..]);
                if color.is_some() {
                    style.bg = color;
                }
                i += used;
            }
            49 => style.bg = None,

            c @ 90..=97 => style.fg = Some(BRIGHT_COLORS[usize::from(c - 90)]),
            c @ 100..=107 => style.bg = Some(BRIGHT_COLORS[usize::from(c - 100)]),

            _ => {}
        }
        i += 1;
    }

    style
}

/// Decode the tail of a `38;...` / `48;...` sequence.
///
/// Returns the color (if well formed) and the number of parameters consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest {
        [5, idx, ..] => (u8::try_from(*idx).ok().map(Color::Indexed), 2),
        [2, r, g, b, ..] => {
            let rgb = (u8::try_from(*r), u8::try_from(*g), u8::try_from(*b));
            match rgb {
                (Ok(r), Ok(g), Ok(b)) => (Some(Color::Rgb(r, g, b)), 4),
                _ => (None, 4),
            }
        }
        [_, ..] => (None, 1),
        [] => (None, 0),
    }
}
