use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

/// Single line text editor. The cursor counts characters, not bytes.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match key.code {
            KeyCode::Enter => self.enter(),
            KeyCode::Esc => self.escape(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.left(),
            KeyCode::Right => self.right(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            kc => self.key(kc, key.modifiers),
        }
    }

    /// Replaces the content and puts the cursor behind it.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.cursor = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            cursor: self.cursor,
        }
    }

    pub fn value(&self) -> &str {
        &self.current_input
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.cursor > 0 {
            self.cursor -= 1;
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.cursor < self.current_input.chars().count() {
            let pos = self.byte_pos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.cursor = self.cursor.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.cursor < self.current_input.chars().count() {
            self.cursor += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.cursor = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.cursor = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> InputResult {
        if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            let pos = self.byte_pos();
            self.current_input.insert(pos, chr);
            self.cursor += 1;
        }
        self.get()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}
