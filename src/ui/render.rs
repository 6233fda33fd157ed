//! # Frame Rendering
//!
//! Turns the header rows, the output buffer and the viewport offsets into a
//! grid of exactly `width x height` cells.
//!
//! ```text
//! row 0              header[0]           (never scrolled)
//! ...
//! row h-1            header[h-1]
//! row h              data[offset_y]      columns [offset_x, offset_x + width)
//! ...
//! row height-1       data[offset_y + height - h - 1]
//! ```
//!
//! Rows without a source line are left blank. The header is clipped to the
//! grid height when the terminal is shorter than the header.

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use crate::ui::styled::StyledLine;

/// Widget drawing one watch frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    header: &'a [StyledLine],
    data: &'a [StyledLine],
    offset_x: usize,
    offset_y: usize,
}

impl<'a> FrameView<'a> {
    pub fn new(header: &'a [StyledLine], data: &'a [StyledLine]) -> Self {
        Self {
            header,
            data,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub fn offset(mut self, offset_x: usize, offset_y: usize) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = usize::from(area.width);
        let height = usize::from(area.height);
        let header_rows = self.header.len().min(height);

        let rows = self
            .header
            .iter()
            .take(header_rows)
            .map(|line| line.slice(0, width))
            .chain(
                self.data
                    .iter()
                    .skip(self.offset_y)
                    .take(height - header_rows)
                    .map(|line| line.slice(self.offset_x, self.offset_x + width)),
            );

        for (row, visible) in (area.y..).zip(rows) {
            buf.set_line(area.x, row, &visible.to_line(), area.width);
        }
    }
}

/// Compose a standalone frame of `width x height` cells.
pub fn compose_frame(
    header: &[StyledLine],
    data: &[StyledLine],
    offset_x: usize,
    offset_y: usize,
    width: u16,
    height: u16,
) -> Buffer {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    FrameView::new(header, data)
        .offset(offset_x, offset_y)
        .render(area, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    fn lines(texts: &[&str]) -> Vec<StyledLine> {
        texts.iter().map(|t| StyledLine::plain(t)).collect()
    }

    #[test]
    fn test_grid_has_exact_size() {
        let buf = compose_frame(&lines(&["h"]), &lines(&["a very long data line"]), 0, 0, 5, 4);
        assert_eq!(buf.area, Rect::new(0, 0, 5, 4));
        assert_eq!(row_text(&buf, 0), "h    ");
        assert_eq!(row_text(&buf, 1), "a ver");
        assert_eq!(row_text(&buf, 2), "     ");
        assert_eq!(row_text(&buf, 3), "     ");
    }

    #[test]
    fn test_data_is_scrolled_header_is_not() {
        let header = lines(&["HEADER", ""]);
        let data = lines(&["0123456789", "abcdefghij", "ABCDEFGHIJ"]);
        let buf = compose_frame(&header, &data, 4, 1, 4, 4);

        assert_eq!(row_text(&buf, 0), "HEAD");
        assert_eq!(row_text(&buf, 1), "    ");
        assert_eq!(row_text(&buf, 2), "efgh");
        assert_eq!(row_text(&buf, 3), "EFGH");
    }

    #[test]
    fn test_offset_past_end_gives_blank_rows() {
        let buf = compose_frame(&[], &lines(&["a", "b"]), 0, 10, 3, 2);
        assert_eq!(row_text(&buf, 0), "   ");
        assert_eq!(row_text(&buf, 1), "   ");
    }

    #[test]
    fn test_header_clipped_to_height() {
        let header = lines(&["one", "two", "three"]);
        let buf = compose_frame(&header, &lines(&["data"]), 0, 0, 5, 2);
        assert_eq!(row_text(&buf, 0), "one  ");
        assert_eq!(row_text(&buf, 1), "two  ");
    }

    #[test]
    fn test_styles_follow_horizontal_scroll() {
        let red = Style::default().fg(Color::Red);
        let mut line = StyledLine::plain("AAAA");
        line.push("BBBB", red);

        let buf = compose_frame(&[], &[line], 2, 0, 4, 1);
        assert_eq!(row_text(&buf, 0), "AABB");
        assert_eq!(buf[(1, 0)].fg, Color::Reset);
        assert_eq!(buf[(2, 0)].fg, Color::Red);
        assert_eq!(buf[(3, 0)].fg, Color::Red);
    }

    #[test]
    fn test_zero_sized_area() {
        let buf = compose_frame(&lines(&["h"]), &lines(&["d"]), 0, 0, 0, 0);
        assert_eq!(buf.area.area(), 0);
    }
}
