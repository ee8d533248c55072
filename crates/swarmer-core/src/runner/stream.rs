//! Line assembly for chunked process output.
//!
//! Child-process reads arrive in arbitrary chunks; a line can span two reads
//! and a read can carry many lines. [`LineBuffer`] splits on any newline
//! variant (`\n`, `\r\n`, bare `\r`) and carries incomplete trailing
//! fragments over to the next chunk.

/// Accumulates chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Feed one chunk; returns every line completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        loop {
            let Some(idx) = self.pending.find(['\n', '\r']) else {
                break;
            };

            // A chunk ending in '\r' may be the first half of a CRLF split
            // across reads; hold it until the next chunk decides.
            if idx + 1 == self.pending.len() && self.pending.ends_with('\r') {
                break;
            }

            let line = self.pending[..idx].to_string();
            let sep_len = if self.pending[idx..].starts_with("\r\n") {
                2
            } else {
                1
            };
            self.pending.drain(..idx + sep_len);
            lines.push(line);
        }
        lines
    }

    /// Drain the remaining partial line at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut rest = std::mem::take(&mut self.pending);
        if rest.ends_with('\r') {
            rest.pop();
        }
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_chunk_many_lines() {
        let mut buf = LineBuffer::default();
        let lines = buf.push("one\ntwo\nthree\n");
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("Starting web inter"), Vec::<String>::new());
        assert_eq!(
            buf.push("face at http://0.0.0.0:8089\n"),
            vec!["Starting web interface at http://0.0.0.0:8089"]
        );
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("one\r"), Vec::<String>::new());
        assert_eq!(buf.push("\ntwo\r\n"), vec!["one", "two"]);
    }

    #[test]
    fn test_bare_carriage_returns() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("one\rtwo\rthree"), vec!["one", "two"]);
        assert_eq!(buf.finish(), Some("three".to_string()));
    }

    #[test]
    fn test_mixed_newline_variants() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("a\r\nb\nc\rd"), vec!["a", "b", "c"]);
        assert_eq!(buf.finish(), Some("d".to_string()));
    }

    #[test]
    fn test_finish_strips_trailing_carriage_return() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("tail\r"), Vec::<String>::new());
        assert_eq!(buf.finish(), Some("tail".to_string()));
    }
}
