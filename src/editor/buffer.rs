use ropey::Rope;

/// Caret position inside a [`EditorBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Byte offset within the line, always on a character boundary.
    pub col: usize,
    /// Column to return to when moving vertically through short lines.
    sticky_col: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            sticky_col: col,
        }
    }

    const fn place(&mut self, col: usize) {
        self.col = col;
        self.sticky_col = col;
    }
}

/// Arrow-key caret movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Rope-backed note text with a caret and an undo history.
///
/// Every mutating call records the previous state first, so [`undo`]
/// walks back one edit at a time. [`replace_all`] starts a fresh history,
/// matching how a widget's "set content" call behaves.
///
/// [`undo`]: EditorBuffer::undo
/// [`replace_all`]: EditorBuffer::replace_all
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    history: Vec<(Rope, Cursor)>,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            history: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// A line without its line terminator.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        (line_idx < self.rope.len_lines()).then(|| {
            let mut line = self.rope.line(line_idx).to_string();
            line.truncate(line.len() - terminator_len(&line));
            line
        })
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Swap in entirely new content; history and caret start over.
    pub fn replace_all(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = Cursor::default();
        self.history.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Revert the most recent edit. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        let Some((rope, cursor)) = self.history.pop() else {
            return false;
        };
        self.rope = rope;
        self.cursor = cursor;
        true
    }

    pub fn insert_char(&mut self, ch: char) {
        self.checkpoint();
        let at = self.caret_char_idx();
        self.rope.insert_char(at, ch);
        if ch == '\n' {
            self.cursor.line += 1;
            self.cursor.place(0);
        } else {
            self.cursor.place(self.cursor.col + ch.len_utf8());
        }
    }

    /// Break the line at the caret (Enter).
    pub fn split_line(&mut self) {
        self.insert_char('\n');
    }

    /// Remove the character before the caret (Backspace).
    ///
    /// At the start of a line this joins it to the previous one, removing
    /// the whole terminator (`\n` or `\r\n`).
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.line == 0 && self.cursor.col == 0 {
            return false;
        }
        self.checkpoint();
        let at = self.caret_char_idx();
        if self.cursor.col == 0 {
            let prev = self.cursor.line - 1;
            let joined_col = self.line_len(prev);
            let terminator = self.terminator_chars(prev);
            self.rope.remove(at - terminator..at);
            self.cursor.line = prev;
            self.cursor.place(joined_col);
        } else {
            let width = self.char_before_caret().map_or(1, char::len_utf8);
            self.rope.remove(at - 1..at);
            self.cursor.place(self.cursor.col - width);
        }
        true
    }

    /// Remove the character under the caret (Delete).
    ///
    /// At the end of a line this joins the next line onto it.
    pub fn delete_forward(&mut self) -> bool {
        let at = self.caret_char_idx();
        if at >= self.rope.len_chars() {
            return false;
        }
        self.checkpoint();
        let width = if self.cursor.col >= self.line_len(self.cursor.line) {
            self.terminator_chars(self.cursor.line).max(1)
        } else {
            1
        };
        self.rope.remove(at..at + width);
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if let Some(ch) = self.char_before_caret() {
                    self.cursor.place(self.cursor.col - ch.len_utf8());
                } else if self.cursor.line > 0 {
                    self.cursor.line -= 1;
                    self.cursor.place(self.line_len(self.cursor.line));
                }
            }
            Direction::Right => {
                let line = self.line_at(self.cursor.line).unwrap_or_default();
                if let Some(ch) = line[self.cursor.col.min(line.len())..].chars().next() {
                    self.cursor.place(self.cursor.col + ch.len_utf8());
                } else if self.cursor.line + 1 < self.rope.len_lines() {
                    self.cursor.line += 1;
                    self.cursor.place(0);
                }
            }
            Direction::Up if self.cursor.line > 0 => {
                self.cursor.line -= 1;
                self.snap_to_sticky_col();
            }
            Direction::Down if self.cursor.line + 1 < self.rope.len_lines() => {
                self.cursor.line += 1;
                self.snap_to_sticky_col();
            }
            Direction::Up | Direction::Down => {}
        }
    }

    fn snap_to_sticky_col(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        self.cursor.col = floor_char_boundary(&line, self.cursor.sticky_col);
    }

    fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    fn terminator_chars(&self, line_idx: usize) -> usize {
        // Both terminator forms are ASCII, so bytes and chars agree.
        terminator_len(&self.rope.line(line_idx).to_string())
    }

    fn checkpoint(&mut self) {
        // Rope clones share structure, so a snapshot per edit stays cheap.
        self.history.push((self.rope.clone(), self.cursor));
    }

    fn char_before_caret(&self) -> Option<char> {
        let line = self.line_at(self.cursor.line)?;
        line[..floor_char_boundary(&line, self.cursor.col)]
            .chars()
            .next_back()
    }

    fn caret_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line_start + line[..floor_char_boundary(&line, self.cursor.col)].chars().count()
    }
}

fn terminator_len(line: &str) -> usize {
    if line.ends_with("\r\n") {
        2
    } else {
        usize::from(line.ends_with('\n'))
    }
}

/// Largest character boundary in `line` at or before `col`.
fn floor_char_boundary(line: &str, col: usize) -> usize {
    let mut col = col.min(line.len());
    while !line.is_char_boundary(col) {
        col -= 1;
    }
    col
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("lines", &self.rope.len_lines())
            .field("cursor", &self.cursor)
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_at(text: &str, line: usize, col: usize) -> EditorBuffer {
        let mut buf = EditorBuffer::from_text(text);
        buf.cursor = Cursor::at(line, col);
        buf
    }

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = EditorBuffer::empty();
        assert_eq!(buf.line_at(0), Some(String::new()));
        assert_eq!(buf.line_at(1), None);
    }

    #[test]
    fn test_line_at_strips_crlf() {
        let buf = EditorBuffer::from_text("one\r\ntwo");
        assert_eq!(buf.line_at(0), Some("one".to_string()));
        assert_eq!(buf.line_at(1), Some("two".to_string()));
        assert_eq!(buf.line_at(2), None);
    }

    #[test]
    fn test_text_roundtrip_keeps_trailing_newline() {
        let content = "# Title\n\n- item\n";
        assert_eq!(EditorBuffer::from_text(content).text(), content);
    }

    #[test]
    fn test_insert_char_advances_by_utf8_width() {
        let mut buf = buffer_at("ab", 0, 1);
        buf.insert_char('日');
        assert_eq!(buf.text(), "a日b");
        assert_eq!(buf.cursor(), Cursor::at(0, 4));
        assert!(buf.can_undo());
    }

    #[test]
    fn test_split_line_then_backspace_rejoins() {
        let mut buf = buffer_at("hello", 0, 2);
        buf.split_line();
        assert_eq!(buf.text(), "he\nllo");
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "hello");
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
    }

    #[test]
    fn test_backspace_at_line_start_removes_whole_crlf() {
        let mut buf = buffer_at("ab\r\ncd", 1, 0);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "abcd");
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
    }

    #[test]
    fn test_delete_at_line_end_removes_whole_crlf() {
        let mut buf = buffer_at("ab\r\ncd", 0, 2);
        assert!(buf.delete_forward());
        assert_eq!(buf.text(), "abcd");
    }

    #[test]
    fn test_delete_back_at_origin_is_noop() {
        let mut buf = EditorBuffer::from_text("abc");
        assert!(!buf.delete_back());
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_delete_back_removes_multibyte_char() {
        let mut buf = buffer_at("aé", 0, 3);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "a");
        assert_eq!(buf.cursor().col, 1);
    }

    #[test]
    fn test_delete_forward_joins_next_line_and_stops_at_end() {
        let mut buf = buffer_at("ab\ncd", 0, 2);
        assert!(buf.delete_forward());
        assert_eq!(buf.text(), "abcd");
        buf.cursor = Cursor::at(0, 4);
        assert!(!buf.delete_forward());
    }

    #[test]
    fn test_undo_walks_back_one_edit_at_a_time() {
        let mut buf = EditorBuffer::empty();
        buf.insert_char('a');
        buf.insert_char('b');
        assert!(buf.undo());
        assert_eq!(buf.text(), "a");
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
        assert!(buf.undo());
        assert_eq!(buf.text(), "");
        assert!(!buf.undo());
    }

    #[test]
    fn test_replace_all_resets_history_and_caret() {
        let mut buf = EditorBuffer::empty();
        buf.insert_char('x');
        buf.replace_all("loaded note");
        assert_eq!(buf.text(), "loaded note");
        assert_eq!(buf.cursor(), Cursor::default());
        assert!(!buf.can_undo());
    }

    #[test]
    fn test_vertical_moves_remember_column() {
        let mut buf = buffer_at("long line\nx\nanother", 0, 6);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 1);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 6);
    }

    #[test]
    fn test_vertical_move_into_multibyte_line_lands_on_boundary() {
        let mut buf = buffer_at("ab\n日", 0, 1);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().line, 1);
        assert_eq!(buf.cursor().col, 0);
        buf.insert_char('x');
        assert_eq!(buf.text(), "ab\nx日");
    }

    #[test]
    fn test_horizontal_moves_wrap_lines() {
        let mut buf = buffer_at("ab\nc", 1, 0);
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
    }
}
