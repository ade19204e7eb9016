use std::fmt;

use thiserror::Error;

use super::PaneArea;

/// What made a layout descriptor unreadable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// A field is empty, contains a non-digit, or overflows
    InvalidField,
    /// A character that has no meaning in the grammar
    UnexpectedCharacter,
    /// A closing bracket without a matching open
    UnbalancedClose,
    /// `{` closed by `]` or `[` closed by `}`
    MismatchedBracket,
    /// Groups still open at end of input
    UnclosedGroup,
    /// A node ended or opened a group with the wrong number of fields
    FieldCount,
    /// Input continues after the root node is complete
    TrailingInput,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MalformedKind::InvalidField => "invalid field",
            MalformedKind::UnexpectedCharacter => "unexpected character",
            MalformedKind::UnbalancedClose => "closing bracket without open group",
            MalformedKind::MismatchedBracket => "mismatched closing bracket",
            MalformedKind::UnclosedGroup => "unclosed group",
            MalformedKind::FieldCount => "wrong field count",
            MalformedKind::TrailingInput => "trailing input after root node",
        };
        f.write_str(text)
    }
}

/// The layout descriptor violates the tmux layout grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed layout: {kind} at byte {offset} ({fragment:?})")]
pub struct MalformedLayoutError {
    pub kind: MalformedKind,
    /// Byte offset into the full descriptor, checksum included
    pub offset: usize,
    /// The offending substring
    pub fragment: String,
}

type Result<T> = std::result::Result<T, MalformedLayoutError>;

/// Fields per leaf node: width, height, x, y, pane index
const LEAF_FIELDS: usize = 5;
/// Fields per group header: width, height, x, y
const HEADER_FIELDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Horizontal,
    Vertical,
}

impl Bracket {
    fn open(c: char) -> Option<Self> {
        match c {
            '{' => Some(Bracket::Horizontal),
            '[' => Some(Bracket::Vertical),
            _ => None,
        }
    }

    fn close(c: char) -> Option<Self> {
        match c {
            '}' => Some(Bracket::Horizontal),
            ']' => Some(Bracket::Vertical),
            _ => None,
        }
    }
}

/// Where the node currently being read stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Still collecting header or leaf fields
    Fields,
    /// Its child group has been closed; only a sibling separator may follow
    Grouped,
}

/// Field accumulator for the node being read at one group depth
#[derive(Debug)]
struct Frame {
    /// Bracket (and its offset) that opened this depth; `None` for the root
    opened_by: Option<(Bracket, usize)>,
    fields: Vec<u32>,
    /// Byte offset where the field in progress started
    pending: Option<usize>,
    /// Byte offset of the node's first field
    node_start: Option<usize>,
    state: NodeState,
}

impl Frame {
    fn new(opened_by: Option<(Bracket, usize)>) -> Self {
        Self {
            opened_by,
            fields: Vec::with_capacity(LEAF_FIELDS),
            pending: None,
            node_start: None,
            state: NodeState::Fields,
        }
    }

    /// Closed fields plus the one in progress
    fn field_count(&self) -> usize {
        self.fields.len() + usize::from(self.pending.is_some())
    }

    fn is_blank(&self) -> bool {
        self.fields.is_empty() && self.pending.is_none() && self.state == NodeState::Fields
    }

    fn reset(&mut self) {
        self.fields.clear();
        self.pending = None;
        self.node_start = None;
        self.state = NodeState::Fields;
    }
}

struct Scanner<'a> {
    input: &'a str,
    frames: Vec<Frame>,
    panes: Vec<PaneArea>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            frames: vec![Frame::new(None)],
            panes: Vec::new(),
        }
    }

    fn error(&self, kind: MalformedKind, start: usize, end: usize) -> MalformedLayoutError {
        let end = end.min(self.input.len());
        MalformedLayoutError {
            kind,
            offset: start,
            fragment: self.input.get(start..end).unwrap_or_default().to_string(),
        }
    }

    fn top(&mut self) -> &mut Frame {
        // The root frame is never popped
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Turn the digits in progress (ending at `end`) into a closed field.
    /// `end` is where the separator sits, so an absent field is reported there.
    fn close_field(&mut self, end: usize) -> Result<()> {
        let Some(start) = self.top().pending.take() else {
            return Err(self.error(MalformedKind::InvalidField, end, end + 1));
        };
        let input = self.input;
        let value = input[start..end]
            .parse::<u32>()
            .map_err(|_| self.error(MalformedKind::InvalidField, start, end))?;
        self.top().fields.push(value);
        Ok(())
    }

    /// Emit the node at the top frame as a leaf
    fn flush_leaf(&mut self, end: usize) -> Result<()> {
        self.close_field(end)?;
        let frame = self.top();
        let start = frame.node_start.unwrap_or(end);
        let [width, height, x, y, index] = frame.fields[..] else {
            return Err(self.error(MalformedKind::FieldCount, start, end));
        };
        // An edge past u32::MAX is not a cell coordinate
        let (Some(col_end), Some(row_end)) = (x.checked_add(width), y.checked_add(height)) else {
            return Err(self.error(MalformedKind::InvalidField, start, end));
        };
        self.top().reset();
        self.panes.push(PaneArea {
            col_start: x,
            col_end,
            row_start: y,
            row_end,
            pane_id: format!("%{index}"),
        });
        Ok(())
    }

    /// Finish whatever node the top frame holds: a five-field leaf is emitted,
    /// a closed group needs nothing, anything else is malformed.
    fn finish_node(&mut self, at: usize) -> Result<()> {
        let frame = self.top();
        if frame.state == NodeState::Grouped {
            frame.reset();
            return Ok(());
        }
        if frame.field_count() == LEAF_FIELDS {
            return self.flush_leaf(at);
        }
        let start = frame.pending.unwrap_or(at);
        Err(self.error(MalformedKind::FieldCount, start, at + 1))
    }

    fn separator(&mut self, at: usize) -> Result<()> {
        let depth = self.frames.len();
        let frame = self.top();
        let node_done = frame.state == NodeState::Grouped || frame.field_count() == LEAF_FIELDS;
        if !node_done {
            return self.close_field(at);
        }
        if depth == 1 {
            return Err(self.error(MalformedKind::TrailingInput, at, self.input.len()));
        }
        self.finish_node(at)
    }

    fn open_group(&mut self, bracket: Bracket, at: usize) -> Result<()> {
        let frame = self.top();
        if frame.state != NodeState::Fields || frame.field_count() != HEADER_FIELDS {
            return Err(self.error(MalformedKind::FieldCount, at, at + 1));
        }
        self.close_field(at)?;
        self.frames.push(Frame::new(Some((bracket, at))));
        Ok(())
    }

    fn close_group(&mut self, bracket: Bracket, at: usize) -> Result<()> {
        let opened_by = self.top().opened_by;
        let Some((opened, _)) = opened_by else {
            return Err(self.error(MalformedKind::UnbalancedClose, at, at + 1));
        };
        if opened != bracket {
            return Err(self.error(MalformedKind::MismatchedBracket, at, at + 1));
        }
        self.finish_node(at)?;
        self.frames.pop();
        self.top().state = NodeState::Grouped;
        Ok(())
    }

    fn digit(&mut self, at: usize) -> Result<()> {
        let frame = self.top();
        if frame.state == NodeState::Grouped {
            return Err(self.error(MalformedKind::UnexpectedCharacter, at, at + 1));
        }
        if frame.pending.is_none() {
            frame.pending = Some(at);
            if frame.fields.is_empty() {
                frame.node_start = Some(at);
            }
        }
        Ok(())
    }

    fn run(mut self, body_start: usize) -> Result<Vec<PaneArea>> {
        let input = self.input;
        for (i, c) in input[body_start..].char_indices() {
            let at = body_start + i;
            match c {
                '0'..='9' => self.digit(at)?,
                ',' | 'x' => self.separator(at)?,
                _ => {
                    if let Some(bracket) = Bracket::open(c) {
                        self.open_group(bracket, at)?;
                    } else if let Some(bracket) = Bracket::close(c) {
                        self.close_group(bracket, at)?;
                    } else {
                        let end = at + c.len_utf8();
                        let pending = self.top().pending;
                        return Err(match pending {
                            Some(start) => self.error(MalformedKind::InvalidField, start, end),
                            None => self.error(MalformedKind::UnexpectedCharacter, at, end),
                        });
                    }
                }
            }
        }

        let opened_by = self.top().opened_by;
        if let Some((_, offset)) = opened_by {
            return Err(self.error(MalformedKind::UnclosedGroup, offset, input.len()));
        }
        if !self.top().is_blank() {
            self.finish_node(input.len())?;
        }
        Ok(self.panes)
    }
}

/// Parse a tmux layout descriptor (`#{window_layout}` or
/// `#{window_visible_layout}`) into its leaf panes.
///
/// The leading checksum is dropped. Group headers are consumed but never
/// emitted, so the result holds leaves only, in document order. An empty or
/// checksum-only descriptor yields no panes.
pub fn parse(descriptor: &str) -> Result<Vec<PaneArea>> {
    let descriptor = descriptor.trim_end_matches(['\n', '\r']);
    match descriptor.find(',') {
        Some(comma) => Scanner::new(descriptor).run(comma + 1),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(col_start: u32, col_end: u32, row_start: u32, row_end: u32, id: &str) -> PaneArea {
        PaneArea {
            col_start,
            col_end,
            row_start,
            row_end,
            pane_id: id.to_string(),
        }
    }

    fn kind_of(descriptor: &str) -> MalformedKind {
        parse(descriptor).unwrap_err().kind
    }

    #[test]
    fn test_single_leaf() {
        assert_eq!(
            parse("be00,183x44,0,0,3").unwrap(),
            vec![area(0, 183, 0, 44, "%3")]
        );
    }

    #[test]
    fn test_horizontal_split() {
        assert_eq!(
            parse("id,100x50,0,0{50x50,0,0,1,50x50,50,0,2}").unwrap(),
            vec![area(0, 50, 0, 50, "%1"), area(50, 100, 0, 50, "%2")]
        );
    }

    #[test]
    fn test_x_separates_siblings_after_complete_leaf() {
        assert_eq!(
            parse("id,100x50,0,0{50x50,0,0,1x50x50,50,0,2}").unwrap(),
            vec![area(0, 50, 0, 50, "%1"), area(50, 100, 0, 50, "%2")]
        );
    }

    #[test]
    fn test_vertical_split() {
        assert_eq!(
            parse("id,100x50,0,0[100x20,0,0,4,100x30,0,20,7]").unwrap(),
            vec![area(0, 100, 0, 20, "%4"), area(0, 100, 20, 50, "%7")]
        );
    }

    #[test]
    fn test_nested_groups_emit_only_leaves() {
        let panes = parse(
            "c2ab,200x60,0,0{100x60,0,0[100x30,0,0,0,100x29,0,31,1],99x60,101,0{49x60,101,0,2,49x60,151,0[49x30,151,0,3,49x29,151,31,5]}}",
        )
        .unwrap();
        let ids: Vec<_> = panes.iter().map(|p| p.pane_id.as_str()).collect();
        assert_eq!(ids, vec!["%0", "%1", "%2", "%3", "%5"]);
        assert_eq!(panes[1], area(0, 100, 31, 60, "%1"));
        assert_eq!(panes[4], area(151, 200, 31, 60, "%5"));
    }

    #[test]
    fn test_leaf_after_nested_group() {
        let panes = parse("aa,80x24,0,0{40x24,0,0[40x12,0,0,1,40x11,0,13,2],39x24,41,0,3}").unwrap();
        assert_eq!(panes.len(), 3);
        assert_eq!(panes[2], area(41, 80, 0, 24, "%3"));
    }

    #[test]
    fn test_trailing_newline_ignored() {
        assert_eq!(parse("be00,183x44,0,0,3\n").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_and_checksum_only() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("be00").unwrap().is_empty());
        assert!(parse("be00,").unwrap().is_empty());
    }

    #[test]
    fn test_unmatched_open() {
        let err = parse("id,100x50,0,0{50x50,0,0,1,50x50,50,0,2").unwrap_err();
        assert_eq!(err.kind, MalformedKind::UnclosedGroup);
        assert_eq!(err.offset, 13);
        assert!(err.fragment.starts_with('{'));
    }

    #[test]
    fn test_non_digit_in_field() {
        let err = parse("be00,183x44,0,0,3a").unwrap_err();
        assert_eq!(err.kind, MalformedKind::InvalidField);
        assert_eq!(err.offset, 16);
        assert_eq!(err.fragment, "3a");

        assert_eq!(kind_of("be00,18-3x44,0,0,3"), MalformedKind::InvalidField);
    }

    #[test]
    fn test_unexpected_character_between_fields() {
        assert_eq!(kind_of("be00,183x44,0,0,;3"), MalformedKind::UnexpectedCharacter);
    }

    #[test]
    fn test_close_without_open() {
        let err = parse("be00,183x44,0,0,3}").unwrap_err();
        assert_eq!(err.kind, MalformedKind::UnbalancedClose);
        assert_eq!(err.offset, 17);
        assert_eq!(err.fragment, "}");
    }

    #[test]
    fn test_mismatched_brackets() {
        assert_eq!(
            kind_of("id,100x50,0,0{50x50,0,0,1,50x50,50,0,2]"),
            MalformedKind::MismatchedBracket
        );
    }

    #[test]
    fn test_wrong_field_counts() {
        // leaf missing its pane index
        assert_eq!(kind_of("be00,183x44,0,0"), MalformedKind::FieldCount);
        // group header carrying a pane index
        assert_eq!(kind_of("id,100x50,0,0,1{50x50,0,0,1}"), MalformedKind::FieldCount);
        // short last child
        assert_eq!(kind_of("id,100x50,0,0{50x50,0,0,1,50x50,50}"), MalformedKind::FieldCount);
        // empty group
        assert_eq!(kind_of("id,100x50,0,0{}"), MalformedKind::FieldCount);
    }

    #[test]
    fn test_empty_field() {
        assert_eq!(kind_of("be00,183x44,,0,3"), MalformedKind::InvalidField);
    }

    #[test]
    fn test_overflowing_field() {
        assert_eq!(kind_of("be00,99999999999x44,0,0,3"), MalformedKind::InvalidField);
    }

    #[test]
    fn test_edge_past_u32_max_rejected() {
        let err = parse("a,4294967295x1,10,0,1").unwrap_err();
        assert_eq!(err.kind, MalformedKind::InvalidField);
        assert_eq!(err.offset, 2);
        assert_eq!(err.fragment, "4294967295x1,10,0,1");

        assert_eq!(kind_of("a,1x4294967295,0,1,1"), MalformedKind::InvalidField);
        // inside a group the leaf is still named
        let err = parse("id,100x50,0,0{50x50,0,0,1,4294967295x50,50,0,2}").unwrap_err();
        assert_eq!(err.kind, MalformedKind::InvalidField);
        assert_eq!(err.fragment, "4294967295x50,50,0,2");
    }

    #[test]
    fn test_zero_width_leaf_kept_as_is() {
        let panes = parse("a,0x5,0,0,1").unwrap();
        assert_eq!(panes, vec![area(0, 0, 0, 5, "%1")]);
        assert_eq!(panes[0].width(), 0);
    }

    #[test]
    fn test_trailing_root_sibling() {
        assert_eq!(kind_of("be00,183x44,0,0,3,10x10,0,0,4"), MalformedKind::TrailingInput);
        assert_eq!(kind_of("id,100x50,0,0{50x50,0,0,1,50x50,50,0,2},"), MalformedKind::TrailingInput);
    }

    #[test]
    fn test_digits_after_group_close() {
        assert_eq!(
            kind_of("id,100x50,0,0{50x50,0,0,1,50x50,50,0,2}7"),
            MalformedKind::UnexpectedCharacter
        );
    }

    #[test]
    fn test_error_message_names_offset() {
        let err = parse("be00,183x44,0,0,3}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed layout: closing bracket without open group at byte 17 (\"}\")"
        );
    }
}
