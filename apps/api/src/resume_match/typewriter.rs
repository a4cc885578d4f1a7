//! Character-by-character reveal of an assistant reply.

use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Typewriter {
    chars: Vec<char>,
    revealed: usize,
    paused: bool,
    interval: Duration,
}

impl Typewriter {
    pub fn new(text: &str) -> Self {
        Self::with_interval(text, DEFAULT_INTERVAL)
    }

    pub fn with_interval(text: &str, interval: Duration) -> Self {
        Self {
            chars: text.chars().collect(),
            revealed: 0,
            paused: false,
            interval,
        }
    }

    /// Reveals one more character. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        if self.paused || self.is_complete() {
            return false;
        }
        self.revealed += 1;
        true
    }

    /// Applies as many ticks as fit in `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.interval.is_zero() {
            self.skip();
            return;
        }
        let ticks = (elapsed.as_millis() / self.interval.as_millis().max(1)) as usize;
        for _ in 0..ticks {
            if !self.tick() {
                break;
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Reveals everything at once.
    pub fn skip(&mut self) {
        self.revealed = self.chars.len();
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.chars.len()
    }

    pub fn visible(&self) -> String {
        self.chars[..self.revealed].iter().collect()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TypewriterState {
        TypewriterState {
            visible: self.visible(),
            revealed: self.revealed,
            total: self.chars.len(),
            paused: self.paused,
            complete: self.is_complete(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypewriterState {
    pub visible: String,
    pub revealed: usize,
    pub total: usize,
    pub paused: bool,
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_reveal_one_char_each() {
        let mut tw = Typewriter::new("héllo");
        assert_eq!(tw.visible(), "");
        tw.tick();
        tw.tick();
        assert_eq!(tw.visible(), "hé");
        assert!(!tw.is_complete());
    }

    #[test]
    fn test_paused_ignores_ticks() {
        let mut tw = Typewriter::new("abc");
        tw.tick();
        tw.pause();
        assert!(!tw.tick());
        tw.advance(Duration::from_secs(1));
        assert_eq!(tw.visible(), "a");
        tw.resume();
        assert!(tw.tick());
        assert_eq!(tw.visible(), "ab");
    }

    #[test]
    fn test_skip_completes() {
        let mut tw = Typewriter::new("a longer answer");
        tw.skip();
        assert!(tw.is_complete());
        assert_eq!(tw.visible(), "a longer answer");
        assert!(!tw.tick());
    }

    #[test]
    fn test_advance_by_elapsed_time() {
        let mut tw = Typewriter::new("abcdefghij");
        assert_eq!(tw.interval(), DEFAULT_INTERVAL);
        tw.advance(Duration::from_millis(95));
        assert_eq!(tw.visible(), "abc");
        tw.advance(Duration::from_secs(5));
        assert!(tw.is_complete());
    }
}
