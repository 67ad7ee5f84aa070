use std::time::Duration;
use tracing::trace;

use crate::config::FolioConfig;
use crate::domain::{FolioError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &FolioConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for a key press. `None` still drives a redraw so finished jobs show up.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, FolioError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(self.handle_key(key, model.raw_keyevents(), model.confirming()));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent, raw: bool, confirming: bool) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Message::Quit);
        }
        if raw {
            return Some(Message::RawKey(key));
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        if confirming {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Some(Message::Confirm),
                KeyCode::Char('n') | KeyCode::Esc => Some(Message::Exit),
                KeyCode::Char('q') => Some(Message::Quit),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => Some(Message::PreviousPage),
            KeyCode::Char('s') => Some(Message::CyclePageSize),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char(':') => Some(Message::EnterCommand),
            KeyCode::Char('v') => Some(Message::View),
            KeyCode::Char('e') => Some(Message::Edit),
            KeyCode::Char('n') => Some(Message::Create),
            KeyCode::Char('d') => Some(Message::Delete),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|n| Message::ToggleColumn(n as usize - 1)),
            KeyCode::Tab => Some(Message::SwitchCollection),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode, raw: bool, confirming: bool) -> Option<Message> {
        let controller = Controller::new(&FolioConfig::default());
        controller.handle_key(KeyEvent::new(code, KeyModifiers::NONE), raw, confirming)
    }

    #[test]
    fn table_keys() {
        assert_eq!(map(KeyCode::Char('q'), false, false), Some(Message::Quit));
        assert_eq!(map(KeyCode::PageDown, false, false), Some(Message::NextPage));
        assert_eq!(map(KeyCode::Char('h'), false, false), Some(Message::PreviousPage));
        assert_eq!(map(KeyCode::Char('1'), false, false), Some(Message::ToggleColumn(0)));
        assert_eq!(map(KeyCode::Char('9'), false, false), Some(Message::ToggleColumn(8)));
        assert_eq!(map(KeyCode::Char('0'), false, false), None);
        assert_eq!(map(KeyCode::Char('Y'), false, false), Some(Message::CopyRow));
    }

    #[test]
    fn confirm_keys_take_precedence() {
        assert_eq!(map(KeyCode::Char('y'), false, true), Some(Message::Confirm));
        assert_eq!(map(KeyCode::Char('n'), false, true), Some(Message::Exit));
        assert_eq!(map(KeyCode::Char('d'), false, true), None);
    }

    #[test]
    fn raw_mode_passes_keys_through() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map(KeyCode::Char('q'), true, false), Some(Message::RawKey(key)));
    }

    #[test]
    fn ctrl_c_quits() {
        let controller = Controller::new(&FolioConfig::default());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(key, false, false), Some(Message::Quit));
        assert_eq!(controller.handle_key(key, true, false), Some(Message::Quit));
        assert_eq!(controller.handle_key(key, false, true), Some(Message::Quit));

        let other = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(controller.handle_key(other, false, false), None);
        assert_eq!(controller.handle_key(other, true, false), Some(Message::RawKey(other)));
    }
}
