//! Property-based invariant tests for scrolling and frame composition.
//!
//! Verifies:
//! 1. Any sequence of navigation commands keeps `offset_y` within
//!    `max(height, total - height / 2)`, also when the viewport height or the
//!    buffer length changes between moves
//! 2. Composed frames are always exactly `width x height`
//! 3. Slicing a styled line keeps every column's style
//! 4. Parsed ANSI output never contains escape characters

use proptest::prelude::*;
use ratatui::style::{Color, Style};
use vatch::ui::compose_frame;
use vatch::ui::styled::StyledLine;
use vatch::ui::viewport::{NavCommand, Viewport};

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_nav_command() -> impl Strategy<Value = NavCommand> {
    prop_oneof![
        Just(NavCommand::Up),
        Just(NavCommand::Down),
        Just(NavCommand::PageUp),
        Just(NavCommand::PageDown),
        Just(NavCommand::Home),
        Just(NavCommand::Left),
        Just(NavCommand::Right),
        Just(NavCommand::Tab),
        Just(NavCommand::Top),
        Just(NavCommand::Bottom),
    ]
}

/// A navigation command, or a resize / refresh that changes the bound.
#[derive(Debug, Clone)]
enum Step {
    Nav(NavCommand),
    Reshape { height: usize, total: usize },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => arb_nav_command().prop_map(Step::Nav),
        1 => (1usize..60, 0usize..300).prop_map(|(height, total)| Step::Reshape { height, total }),
    ]
}

fn arb_color() -> impl Strategy<Value = Option<Color>> {
    prop_oneof![
        Just(None),
        Just(Some(Color::Red)),
        Just(Some(Color::Green)),
        (0u8..=255).prop_map(|i| Some(Color::Indexed(i))),
    ]
}

/// A line assembled from a few differently styled chunks.
fn arb_styled_line() -> impl Strategy<Value = StyledLine> {
    prop::collection::vec(("[a-z ]{0,12}", arb_color()), 0..5).prop_map(|chunks| {
        let mut line = StyledLine::default();
        for (text, color) in chunks {
            let style = color.map_or_else(Style::default, |c| Style::default().fg(c));
            line.push(&text, style);
        }
        line
    })
}

proptest! {
    #[test]
    fn offset_y_stays_clamped(
        commands in prop::collection::vec(arb_nav_command(), 0..60),
        height in 1usize..60,
        total in 0usize..300,
    ) {
        let mut viewport = Viewport::default();
        let bound = height.max(total.saturating_sub(height / 2));
        for command in commands {
            prop_assert!(viewport.move_by(command, height, 3, total));
            prop_assert!(viewport.offset_y <= bound, "{} > {}", viewport.offset_y, bound);
        }
    }

    #[test]
    fn offset_y_reclamped_after_reshape(
        steps in prop::collection::vec(arb_step(), 0..80),
    ) {
        let mut viewport = Viewport::default();
        let (mut height, mut total) = (24usize, 100usize);
        for step in steps {
            match step {
                Step::Nav(command) => {
                    viewport.move_by(command, height, 3, total);
                }
                Step::Reshape { height: h, total: t } => {
                    height = h;
                    total = t;
                    viewport.clamp(height, total);
                }
            }
            let bound = Viewport::max_offset_y(height, total);
            prop_assert!(viewport.offset_y <= bound, "{} > {}", viewport.offset_y, bound);
        }
    }

    #[test]
    fn home_always_returns_to_column_zero(
        commands in prop::collection::vec(arb_nav_command(), 0..30),
    ) {
        let mut viewport = Viewport::default();
        for command in commands {
            viewport.move_by(command, 24, 3, 100);
        }
        viewport.move_by(NavCommand::Home, 24, 3, 100);
        prop_assert_eq!(viewport.offset_x, 0);
    }
}

proptest! {
    #[test]
    fn frame_has_exact_dimensions(
        header in prop::collection::vec(arb_styled_line(), 0..4),
        data in prop::collection::vec(arb_styled_line(), 0..40),
        offset_x in 0usize..80,
        offset_y in 0usize..60,
        width in 0u16..100,
        height in 0u16..50,
    ) {
        let frame = compose_frame(&header, &data, offset_x, offset_y, width, height);
        prop_assert_eq!(frame.area.width, width);
        prop_assert_eq!(frame.area.height, height);
        prop_assert_eq!(frame.content.len(), usize::from(width) * usize::from(height));
    }
}

proptest! {
    #[test]
    fn slice_preserves_styles(
        line in arb_styled_line(),
        start in 0usize..40,
        len in 0usize..40,
    ) {
        let sliced = line.slice(start, start + len);
        prop_assert!(sliced.width() <= len);
        for column in 0..sliced.width() {
            prop_assert_eq!(sliced.style_at(column), line.style_at(start + column));
        }
    }

    #[test]
    fn parsed_text_has_no_escapes(raw in "(\x1b\\[[0-9;]{0,6}m|\x1b\\[[0-9]?[A-K]|[a-z ])*") {
        let line = StyledLine::parse_ansi(&raw);
        prop_assert!(!line.text().contains('\x1b'));
    }
}
