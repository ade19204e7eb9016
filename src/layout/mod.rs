//! Window layouts: reading tmux layout descriptors and placing their panes
//! on screen.
//!
//! Both halves are pure functions. [`parse`] turns a descriptor such as
//! `"5e9a,160x40,0,0{80x40,0,0,1,79x40,81,0,2}"` into one [`PaneArea`] per
//! leaf pane; [`map`] scales and clips those areas into a destination
//! viewport.

mod geometry;
mod parser;

pub use geometry::{map, ScaledRect, Size};
pub use parser::{parse, MalformedLayoutError};

use serde::{Deserialize, Serialize};

/// A leaf pane's cell rectangle within its window, half-open on both axes.
///
/// `col_start <= col_end` and `row_start <= row_end` always hold, but the
/// parser does not check that a pane is non-empty: a zero-width or
/// zero-height leaf in the descriptor comes through as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneArea {
    pub col_start: u32,
    pub col_end: u32,
    pub row_start: u32,
    pub row_end: u32,
    /// tmux pane id, e.g. "%3"
    pub pane_id: String,
}

impl PaneArea {
    pub fn width(&self) -> u32 {
        self.col_end - self.col_start
    }

    pub fn height(&self) -> u32 {
        self.row_end - self.row_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cells(pane: &PaneArea) -> u64 {
        u64::from(pane.width()) * u64::from(pane.height())
    }

    fn overlaps(a: &PaneArea, b: &PaneArea) -> bool {
        a.col_start < b.col_end
            && b.col_start < a.col_end
            && a.row_start < b.row_end
            && b.row_start < a.row_end
    }

    /// A generated split tree, rendered the way tmux prints it
    #[derive(Debug, Clone)]
    enum Node {
        Leaf(u32),
        Split { vertical: bool, weights: Vec<(u32, Node)> },
    }

    fn node_strategy() -> impl Strategy<Value = Node> {
        let leaf = (0u32..100).prop_map(Node::Leaf);
        leaf.prop_recursive(4, 32, 4, |inner| {
            (any::<bool>(), prop::collection::vec((1u32..4, inner), 2..4))
                .prop_map(|(vertical, weights)| Node::Split { vertical, weights })
        })
    }

    /// Render `node` into `rect` (x, y, w, h). Children get a share of the
    /// split axis proportional to their weight, at least one cell each, and
    /// the last child absorbs the remainder so the group is tiled exactly.
    /// A split too small for its children is rendered as a leaf.
    fn render(node: &Node, rect: (u32, u32, u32, u32), out: &mut String) {
        let (x, y, w, h) = rect;
        out.push_str(&format!("{w}x{h},{x},{y}"));
        match node {
            Node::Split { vertical, weights }
                if (if *vertical { h } else { w }) >= weights.len() as u32 =>
            {
                let (open, close) = if *vertical { ('[', ']') } else { ('{', '}') };
                let span = if *vertical { h } else { w };
                let total: u32 = weights.iter().map(|(weight, _)| weight).sum();
                let count = weights.len() as u32;
                let spare = span - count;
                let mut offset = 0;
                out.push(open);
                for (i, (weight, child)) in weights.iter().enumerate() {
                    let size = if i + 1 == weights.len() {
                        span - offset
                    } else {
                        1 + spare * weight / total
                    };
                    let child_rect = if *vertical {
                        (x, y + offset, w, size)
                    } else {
                        (x + offset, y, size, h)
                    };
                    if i > 0 {
                        out.push(',');
                    }
                    render(child, child_rect, out);
                    offset += size;
                }
                out.push(close);
            }
            Node::Leaf(index) => out.push_str(&format!(",{index}")),
            Node::Split { .. } => out.push_str(",0"),
        }
    }

    proptest! {
        #[test]
        fn parsed_panes_tile_the_root(node in node_strategy(), w in 1u32..400, h in 1u32..200) {
            let mut descriptor = String::from("abcd,");
            render(&node, (0, 0, w, h), &mut descriptor);

            let panes = parse(&descriptor).unwrap();
            let covered: u64 = panes.iter().map(cells).sum();
            prop_assert_eq!(covered, u64::from(w) * u64::from(h));
            for (i, a) in panes.iter().enumerate() {
                prop_assert!(a.col_start < a.col_end && a.row_start < a.row_end);
                prop_assert!(a.col_end <= w && a.row_end <= h);
                for b in &panes[i + 1..] {
                    prop_assert!(!overlaps(a, b), "{:?} overlaps {:?}", a, b);
                }
            }
        }

        #[test]
        fn parsing_is_repeatable(node in node_strategy()) {
            let mut descriptor = String::from("0000,");
            render(&node, (0, 0, 200, 100), &mut descriptor);
            prop_assert_eq!(parse(&descriptor).unwrap(), parse(&descriptor).unwrap());
        }
    }

    #[test]
    fn test_parse_then_map_real_layout() {
        let panes = parse("5e9a,160x40,0,0{80x40,0,0,1,79x40,81,0,2}").unwrap();
        let rects = map(&panes, 0.5, Size::new(100, 30));
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].x1, rects[0].x2, rects[0].y2), (0, 40, 30));
        assert_eq!((rects[1].x1, rects[1].x2), (40, 80));
    }
}
