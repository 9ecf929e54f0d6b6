//! Plain multi-line text buffer behind the writing screen.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    text: String,
    /// Byte offset, always on a char boundary
    cursor: usize,
}

impl Editor {
    /// Buffer holding `text` with the cursor at the end
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    /// Returns false when there was nothing to delete
    pub fn backspace(&mut self) -> bool {
        match self.text[..self.cursor].chars().next_back() {
            Some(c) => {
                self.cursor -= c.len_utf8();
                self.text.remove(self.cursor);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
            true
        } else {
            false
        }
    }

    pub fn move_left(&mut self) {
        if let Some(c) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_line_start(&mut self) {
        self.cursor = self.text[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
    }

    pub fn move_line_end(&mut self) {
        self.cursor = self.text[self.cursor..]
            .find('\n')
            .map_or(self.text.len(), |i| self.cursor + i);
    }

    /// (row, column) of the cursor once the text is wrapped with [`wrap_lines`]
    pub fn cursor_position(&self, width: u16) -> (u16, u16) {
        let lines = wrap_lines(&self.text[..self.cursor], width);
        let row = lines.len().saturating_sub(1);
        let col = lines.last().map_or(0, |line| line.width());
        if col >= usize::from(width.max(1)) {
            ((row + 1) as u16, 0)
        } else {
            (row as u16, col as u16)
        }
    }
}

/// Hard-wrap `text` at `width` cells. Every `'\n'` starts a new line.
pub fn wrap_lines(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let mut line = String::new();
        let mut cols = 0;
        for c in raw.chars() {
            let w = c.width().unwrap_or(0);
            if cols + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                cols = 0;
            }
            line.push(c);
            cols += w;
        }
        lines.push(line);
    }
    lines
}
