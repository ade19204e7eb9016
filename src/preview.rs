//! Live mirror of a window's panes
//!
//! Captured pane text is replayed into a VT100 screen the size of the pane,
//! then drawn through tui-term into the rectangle the geometry mapper gives
//! it. Anything past the rectangle is cropped.

use std::collections::HashMap;

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Paragraph, Wrap},
    Frame,
};
use tui_term::vt100::Parser;
use tui_term::widget::PseudoTerminal;

use crate::layout::{self, PaneArea, ScaledRect, Size};
use crate::tmux::PaneCapture;

/// Hide the emulated cursor; previews are read-only
const HIDE_CURSOR: &[u8] = b"\x1b[?25l";

/// The panes of one target, replaced wholesale on every load
pub struct Preview {
    target_id: String,
    areas: Vec<PaneArea>,
    screens: HashMap<String, Parser>,
}

impl Preview {
    pub fn new(target_id: String, panes: Vec<PaneCapture>) -> Self {
        let mut areas = Vec::with_capacity(panes.len());
        let mut screens = HashMap::with_capacity(panes.len());
        for pane in panes {
            screens.insert(pane.area.pane_id.clone(), screen_for(&pane));
            areas.push(pane.area);
        }
        Self {
            target_id,
            areas,
            screens,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn areas(&self) -> &[PaneArea] {
        &self.areas
    }

    /// Where each pane lands in a viewport of `size`
    pub fn placements(&self, scale_x: f64, size: Size) -> Vec<ScaledRect> {
        layout::map(&self.areas, scale_x, size)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, scale_x: f64, style: Style) {
        for rect in self.placements(scale_x, Size::from(area)) {
            let Some(parser) = self.screens.get(&rect.pane_id) else {
                continue;
            };
            let term = PseudoTerminal::new(parser.screen()).style(style);
            frame.render_widget(term, rect.to_rect(area));
        }
    }
}

/// Replay captured text into a screen sized to the pane
fn screen_for(pane: &PaneCapture) -> Parser {
    let rows = pane.area.height().clamp(1, u32::from(u16::MAX)) as u16;
    let cols = pane.area.width().clamp(1, u32::from(u16::MAX)) as u16;
    let mut parser = Parser::new(rows, cols, 0);
    parser.process(HIDE_CURSOR);
    // capture-pane lines end in bare newlines; the emulator needs a carriage return too
    parser.process(pane.content.replace('\n', "\r\n").as_bytes());
    parser
}

/// Placeholder shown when there is nothing to mirror
pub fn render_placeholder(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(text.to_string())
        .style(style)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
