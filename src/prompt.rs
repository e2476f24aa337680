//! Line-oriented confirmation prompts.

use std::io::{self, BufRead, Write};

/// Word that must be typed to confirm dangerous deletions.
pub const DANGEROUS_CONFIRMATION: &str = "DELETE";

pub trait Prompter {
    /// Yes/no question; anything but `y`/`yes` (any case) is a no.
    fn confirm(&mut self, message: &str) -> bool;

    /// Show `message` and require `expected` typed exactly.
    fn confirm_typed(&mut self, message: &str, expected: &str) -> bool;
}

/// Prompts written to `output`, answers read line by line from `input`.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Option<String> {
        write!(self.output, "{prompt}").ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                // EOF counts as a refusal; finish the prompt line
                let _ = writeln!(self.output);
                None
            }
            Ok(_) => Some(line),
        }
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        self.ask(&format!("\n{message} (y/N): "))
            .map(|answer| is_yes(&answer))
            .unwrap_or(false)
    }

    fn confirm_typed(&mut self, message: &str, expected: &str) -> bool {
        self.ask(message)
            .map(|answer| answer.trim() == expected)
            .unwrap_or(false)
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> LinePrompter<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_confirm_reads_one_line_per_prompt() {
        let mut p = prompter("y\nno\n");
        assert!(p.confirm("Delete?"));
        assert!(!p.confirm("Delete again?"));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Delete? (y/N): "));
    }

    #[test]
    fn test_confirm_eof_is_no() {
        let mut p = prompter("");
        assert!(!p.confirm("Delete?"));
    }

    #[test]
    fn test_typed_confirmation_is_exact() {
        assert!(prompter("DELETE\n").confirm_typed("> ", DANGEROUS_CONFIRMATION));
        assert!(prompter("  DELETE  \n").confirm_typed("> ", DANGEROUS_CONFIRMATION));
        assert!(!prompter("delete\n").confirm_typed("> ", DANGEROUS_CONFIRMATION));
        assert!(!prompter("y\n").confirm_typed("> ", DANGEROUS_CONFIRMATION));
        assert!(!prompter("").confirm_typed("> ", DANGEROUS_CONFIRMATION));
    }
}
