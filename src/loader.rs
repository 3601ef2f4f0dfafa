use miette::Result;

use crate::error;
use crate::memory::MEMORY_SIZE;

/// Marks the rest of a line as a comment.
const COMMENT: char = '#';

/// Parse program text into the bytes to place in memory.
///
/// Every non-blank line holds a single byte written in binary, optionally followed by a
/// comment. Errors point at the offending literal in `src`.
pub fn parse_program(src: &str) -> Result<Vec<u8>> {
    let mut program = Vec::new();
    let mut line_start = 0;

    for line in src.split_inclusive('\n') {
        let code = line.split(COMMENT).next().unwrap_or_default();
        let literal = code.trim();
        if !literal.is_empty() {
            let offs = line_start + code.len() - code.trim_start().len();
            let span = (offs, literal.len());

            if !literal.bytes().all(|b| matches!(b, b'0' | b'1')) {
                return Err(error::load_bad_literal(span, src));
            }
            let byte = u8::from_str_radix(literal, 2)
                .map_err(|_| error::load_literal_overflow(span, src))?;
            if program.len() == MEMORY_SIZE {
                return Err(error::load_too_large(span, src, MEMORY_SIZE));
            }
            program.push(byte);
        }
        line_start += line.len();
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    fn first_label(report: &miette::Report) -> (usize, usize) {
        let label = report
            .labels()
            .and_then(|mut labels| labels.next())
            .expect("diagnostic should carry a label");
        (label.offset(), label.len())
    }

    #[test]
    fn parses_literals_and_skips_comments() {
        let src = "\
# Print the number 8

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";
        assert_eq!(
            parse_program(src).unwrap(),
            vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 1]
        );
    }

    #[test]
    fn handles_crlf_and_missing_final_newline() {
        let src = "00000001\r\n  10100000  \r\n11111111";
        assert_eq!(parse_program(src).unwrap(), vec![1, 0b1010_0000, 255]);
    }

    #[test]
    fn empty_program() {
        assert!(parse_program("").unwrap().is_empty());
        assert!(parse_program("# nothing\n\n   \n").unwrap().is_empty());
    }

    #[test]
    fn bad_literal_points_at_token() {
        let src = "00000001\n  10201 # oops\n";
        let report = parse_program(src).unwrap_err();
        assert_eq!(
            report.code().map(|code| code.to_string()),
            Some("load::bad_literal".to_string())
        );
        assert_eq!(first_label(&report), (11, 5));
    }

    #[test]
    fn signs_and_separators_are_rejected() {
        for src in ["+101", "0b101", "1010 1010", "1_0"] {
            let report = parse_program(src).unwrap_err();
            assert_eq!(
                report.code().map(|code| code.to_string()),
                Some("load::bad_literal".to_string()),
                "{src}"
            );
        }
    }

    #[test]
    fn wide_literal_overflows() {
        let report = parse_program("100000000\n").unwrap_err();
        assert_eq!(
            report.code().map(|code| code.to_string()),
            Some("load::literal_overflow".to_string())
        );
        // Leading zeros do not count towards the width
        assert_eq!(parse_program("000000001").unwrap(), vec![1]);
    }

    #[test]
    fn program_must_fit_in_memory() {
        let fits = "00000000\n".repeat(MEMORY_SIZE);
        assert_eq!(parse_program(&fits).unwrap().len(), MEMORY_SIZE);

        let too_large = fits + "00000001\n";
        let report = parse_program(&too_large).unwrap_err();
        assert_eq!(
            report.code().map(|code| code.to_string()),
            Some("load::too_large".to_string())
        );
        assert_eq!(first_label(&report), (9 * MEMORY_SIZE, 8));
    }
}
