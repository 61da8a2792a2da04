//! Line splitting with read-time accounting.

use std::time::{Duration, Instant};

/// Yields lines terminated by LF, CR or CRLF.
///
/// A final line without a terminator is still returned; a trailing terminator
/// does not produce an extra empty line.
#[derive(Debug)]
pub(crate) struct LineReader<'a> {
    input: &'a str,
    pos: usize,
    elapsed: Duration,
}

impl<'a> LineReader<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Time spent reading lines so far.
    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn next_line(&mut self) -> Option<&'a str> {
        let start = Instant::now();
        let line = self.read();
        self.elapsed += start.elapsed();
        line
    }

    fn read(&mut self) -> Option<&'a str> {
        if self.pos >= self.input.len() {
            return None;
        }

        let rest = &self.input[self.pos..];
        match rest.find(['\r', '\n']) {
            Some(idx) => {
                let line = &rest[..idx];
                let mut consumed = idx + 1;
                if rest.as_bytes()[idx] == b'\r' && rest.as_bytes().get(idx + 1) == Some(&b'\n') {
                    consumed += 1;
                }
                self.pos += consumed;
                Some(line)
            }
            None => {
                self.pos = self.input.len();
                Some(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<&str> {
        let mut reader = LineReader::new(input);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_mixed_terminators() {
        assert_eq!(collect("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_trailing_terminator() {
        assert_eq!(collect("a\r\n"), vec!["a"]);
        assert_eq!(collect("a\r\n\r\n"), vec!["a", ""]);
    }

    #[test]
    fn test_empty_input() {
        assert!(collect("").is_empty());
    }
}
