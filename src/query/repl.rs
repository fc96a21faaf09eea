//! Interactive question loop.
use std::io::{BufRead, Write};

use tracing::warn;

use super::{QueryEngine, QueryError, QueryOutcome};

pub const DEFAULT_CHUNK_COUNT: usize = 4;

/// Parse the chunk count typed by the user, falling back to
/// [`DEFAULT_CHUNK_COUNT`] on anything that is not a positive integer.
pub fn parse_chunk_count(input: &str) -> usize {
    match input.trim().parse::<usize>() {
        Ok(k) if k > 0 => k,
        _ => {
            warn!("Invalid chunk count {:?}, using default of {DEFAULT_CHUNK_COUNT}", input.trim());
            DEFAULT_CHUNK_COUNT
        }
    }
}

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Read one line; `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, QueryError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Print an outcome: the answer text followed by the chunk sources.
pub fn print_outcome<W: Write>(outcome: &QueryOutcome, output: &mut W) -> Result<(), QueryError> {
    writeln!(output, "\n--- Answer ---")?;
    writeln!(output, "{}", outcome.text())?;

    if let QueryOutcome::Answered(answer) = outcome {
        if !answer.sources.is_empty() {
            writeln!(output, "\nSources:")?;
            for source in &answer.sources {
                match source.page {
                    Some(page) => writeln!(
                        output,
                        "  - {} (page {}, similarity {:.3})",
                        source.source, page, source.similarity
                    )?,
                    None => writeln!(
                        output,
                        "  - {} (similarity {:.3})",
                        source.source, source.similarity
                    )?,
                }
            }
        }
    }
    Ok(())
}

/// Answer a single question with `k` chunks and print the outcome.
pub fn ask_once<W: Write>(
    engine: &QueryEngine,
    question: &str,
    k: usize,
    output: &mut W,
) -> Result<(), QueryError> {
    let outcome = engine.answer(question, k)?;
    print_outcome(&outcome, output)
}

/// Ask questions until the user types `exit` or input ends.
pub fn run<R: BufRead, W: Write>(
    engine: &QueryEngine,
    mut input: R,
    mut output: W,
) -> Result<(), QueryError> {
    loop {
        write!(output, "\nEnter your question (or 'exit' to quit): ")?;
        output.flush()?;
        let Some(question) = read_line(&mut input)? else {
            break;
        };
        if is_exit(&question) {
            break;
        }
        let question = question.trim();
        if question.is_empty() {
            continue;
        }

        write!(
            output,
            "How many chunks should be included in the context (e.g., 2, 4, 6): "
        )?;
        output.flush()?;
        let k = match read_line(&mut input)? {
            Some(line) => parse_chunk_count(&line),
            None => DEFAULT_CHUNK_COUNT,
        };

        ask_once(engine, question, k, &mut output)?;
    }

    writeln!(output, "\nGoodbye.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_count() {
        assert_eq!(parse_chunk_count("6\n"), 6);
        assert_eq!(parse_chunk_count(" 2 "), 2);
        assert_eq!(parse_chunk_count("abc"), DEFAULT_CHUNK_COUNT);
        assert_eq!(parse_chunk_count(""), DEFAULT_CHUNK_COUNT);
        assert_eq!(parse_chunk_count("-3"), DEFAULT_CHUNK_COUNT);
        assert_eq!(parse_chunk_count("0"), DEFAULT_CHUNK_COUNT);
        assert_eq!(parse_chunk_count("2.5"), DEFAULT_CHUNK_COUNT);
    }

    #[test]
    fn test_exit_is_case_insensitive() {
        assert!(is_exit("exit\n"));
        assert!(is_exit("EXIT"));
        assert!(is_exit("  Exit  "));
        assert!(!is_exit("exit now"));
    }
}
