//! Loads a textual program into the flat `Vec<String>` the engine indexes
//! by absolute line number. Blank lines and `#`-comments are kept in place
//! (not dropped) so that line numbers baked into `JUMP`/`CALL`/`CMP_*`
//! targets at backend emission time stay valid.

use std::path::Path;

use crate::error::VmResult;

pub fn load_program(path: &Path) -> VmResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_program(&text))
}

pub fn parse_program(text: &str) -> Vec<String> {
    text.lines().map(|line| line.trim_end().to_string()).collect()
}

pub fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_preserved_for_stable_addressing() {
        let lines = parse_program("PUSH_I32 1\n\nHALT\n");
        assert_eq!(lines.len(), 3);
        assert!(is_blank_or_comment(&lines[1]));
    }

    #[test]
    fn comment_lines_are_recognized() {
        assert!(is_blank_or_comment("  # a comment"));
        assert!(!is_blank_or_comment("HALT"));
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let lines = parse_program("HALT   \n");
        assert_eq!(lines[0], "HALT");
    }

    #[test]
    fn load_program_reads_a_real_file_line_for_line() {
        use pretty_assertions::assert_eq;
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "PUSH_I32 1\n# comment\nHALT\n").unwrap();
        let lines = load_program(file.path()).unwrap();
        assert_eq!(lines, vec!["PUSH_I32 1", "# comment", "HALT"]);
    }
}
