use ratatui::layout::Rect;

use super::PaneArea;

/// Destination viewport, in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl From<Rect> for Size {
    fn from(area: Rect) -> Self {
        Self::new(area.width, area.height)
    }
}

/// A pane placed in destination coordinates, half-open on both axes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledRect {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
    pub pane_id: String,
}

impl ScaledRect {
    pub fn width(&self) -> u16 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u16 {
        self.y2 - self.y1
    }

    /// Position inside a viewport whose top-left corner is `origin`
    pub fn to_rect(&self, origin: Rect) -> Rect {
        Rect::new(
            origin.x.saturating_add(self.x1),
            origin.y.saturating_add(self.y1),
            self.width(),
            self.height(),
        )
    }
}

/// Scale a column, rounding half to even, then clamp it into `0..=limit`
fn scale_col(col: u32, scale_x: f64, limit: u16) -> u16 {
    let scaled = (f64::from(col) * scale_x).round_ties_even();
    // `as` saturates and maps NaN to zero
    (scaled.max(0.0) as u64).min(u64::from(limit)) as u16
}

fn clamp_row(row: u32, limit: u16) -> u16 {
    row.min(u32::from(limit)) as u16
}

/// Place panes into a viewport, scaling the horizontal axis only.
///
/// Each coordinate is rounded on its own (half to even), so neighbouring
/// panes may gain or lose a one-cell seam. Panes left with no area after
/// clipping are dropped; the rest keep their input order.
pub fn map(panes: &[PaneArea], scale_x: f64, viewport: Size) -> Vec<ScaledRect> {
    panes
        .iter()
        .filter_map(|pane| {
            let rect = ScaledRect {
                x1: scale_col(pane.col_start, scale_x, viewport.width),
                y1: clamp_row(pane.row_start, viewport.height),
                x2: scale_col(pane.col_end, scale_x, viewport.width),
                y2: clamp_row(pane.row_end, viewport.height),
                pane_id: pane.pane_id.clone(),
            };
            (rect.x1 < rect.x2 && rect.y1 < rect.y2).then_some(rect)
        })
        .collect()
}
