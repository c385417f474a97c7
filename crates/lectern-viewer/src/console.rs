//! Presenter console commands read from stdin.

use std::path::PathBuf;

use lectern_session::{DocumentId, PageIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Next,
    Prev,
    Goto(PageIndex),
    Select(DocumentId),
    List,
    Upload(PathBuf),
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  next | n            advance one page
  prev | p            go back one page
  goto N | g N        jump to page N
  select ID           present a document
  list | ls           list uploaded documents
  upload PATH         upload a PDF and present it
  clear               delete every uploaded document
  help                show this message
  quit | q            leave the session";

/// Parse one console line. The error is a message for the user.
pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "p" => ConsoleCommand::Prev,
        "goto" | "g" => {
            let page = rest
                .parse::<u32>()
                .ok()
                .and_then(PageIndex::new)
                .ok_or_else(|| format!("not a page number: {rest:?}"))?;
            ConsoleCommand::Goto(page)
        }
        "select" => {
            if rest.is_empty() {
                return Err("select needs a document id".into());
            }
            ConsoleCommand::Select(rest.into())
        }
        "list" | "ls" => ConsoleCommand::List,
        "upload" => {
            if rest.is_empty() {
                return Err("upload needs a file path".into());
            }
            ConsoleCommand::Upload(PathBuf::from(rest))
        }
        "clear" => ConsoleCommand::Clear,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        "" => return Err(String::new()),
        other => return Err(format!("unknown command {other:?}; try `help`")),
    };

    let takes_argument = matches!(
        command,
        ConsoleCommand::Goto(_) | ConsoleCommand::Select(_) | ConsoleCommand::Upload(_)
    );
    if !takes_argument && !rest.is_empty() {
        return Err(format!("{word} takes no arguments"));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation() {
        assert_eq!(parse("next"), Ok(ConsoleCommand::Next));
        assert_eq!(parse("  p "), Ok(ConsoleCommand::Prev));
        assert_eq!(
            parse("goto 12"),
            Ok(ConsoleCommand::Goto(PageIndex::new(12).unwrap()))
        );
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(parse("goto 0").is_err());
        assert!(parse("goto").is_err());
        assert!(parse("g two").is_err());
    }

    #[test]
    fn parses_document_commands() {
        assert_eq!(
            parse("select pdfFile-1-2.pdf"),
            Ok(ConsoleCommand::Select("pdfFile-1-2.pdf".into()))
        );
        assert_eq!(
            parse("upload /tmp/My Deck.pdf"),
            Ok(ConsoleCommand::Upload(PathBuf::from("/tmp/My Deck.pdf")))
        );
        assert_eq!(parse("ls"), Ok(ConsoleCommand::List));
        assert_eq!(parse("clear"), Ok(ConsoleCommand::Clear));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("select").is_err());
        assert!(parse("upload").is_err());
        assert!(parse("next 3").is_err());
        assert!(parse("dance").is_err());
        assert_eq!(parse("   "), Err(String::new()));
    }
}
