//! Groups a flat token stream into statements. MIPS is
//! line-oriented, so a `Newline` token is the statement terminator; blank lines are skipped and
//! an "unattached" trailing label (`label:` alone on its line) carries forward onto the next
//! non-blank statement.

use crate::error::AssembleError;
use crate::token::{SourceLocation, Token, TokenType};

/// One statement's worth of tokens: an optional label (possibly carried over from a preceding
/// blank line) and the directive-or-mnemonic-led token list that follows it.
#[derive(Clone, Debug)]
pub struct RawStatement {
    pub label: Option<Token>,
    pub tokens: Vec<Token>,
    pub location: SourceLocation,
}

pub fn group_statements(tokens: &[Token]) -> Result<Vec<RawStatement>, AssembleError> {
    let mut statements = Vec::new();
    let mut pending_label: Option<Token> = None;
    let mut line_start = 0;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenType::Newline && i != tokens.len() - 1 {
            continue;
        }
        let end = if tok.kind == TokenType::Newline { i } else { tokens.len() };
        let line = &tokens[line_start..end];
        line_start = i + 1;

        if line.is_empty() {
            continue;
        }

        let (line_label, body) = split_label(line)?;

        if body.is_empty() {
            // Label-only line: carries to the next non-blank statement.
            if line_label.is_some() {
                pending_label = line_label;
            }
            continue;
        }

        let label = line_label.or_else(|| pending_label.take());
        let location = body[0].location.clone();
        statements.push(RawStatement { label, tokens: body.to_vec(), location });
    }

    Ok(statements)
}

/// Splits a leading `Label Colon` pair off a line. Returns `(None, line)` when the line doesn't
/// start with a label at all.
fn split_label(line: &[Token]) -> Result<(Option<Token>, &[Token]), AssembleError> {
    if line[0].kind != TokenType::Label {
        return Ok((None, line));
    }
    match line.get(1) {
        Some(t) if t.kind == TokenType::Colon => Ok((Some(line[0].clone()), &line[2..])),
        Some(t) => Err(AssembleError::UnexpectedToken {
            location: t.location.clone(),
            got: t.kind,
            expected: "`:` after a label",
        }),
        None => Err(AssembleError::UnexpectedToken {
            location: line[0].location.clone(),
            got: TokenType::Label,
            expected: "`:` after a label",
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::tokenize;

    fn is_mnemonic(s: &str) -> bool {
        matches!(s, "add" | "addi" | "nop")
    }

    #[test]
    fn attached_label_adorns_same_statement() {
        let tokens = tokenize("loop: add $t0, $t1, $t2\n", "t.s", &is_mnemonic);
        let stmts = group_statements(&tokens).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].label.as_ref().unwrap().raw_text, "loop");
        assert_eq!(stmts[0].tokens[0].kind, TokenType::Mnemonic);
    }

    #[test]
    fn unattached_label_carries_to_next_statement() {
        let tokens = tokenize("loop:\nadd $t0, $t1, $t2\n", "t.s", &is_mnemonic);
        let stmts = group_statements(&tokens).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].label.as_ref().unwrap().raw_text, "loop");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let tokens = tokenize("\n\nadd $t0, $t1, $t2\n\n", "t.s", &is_mnemonic);
        let stmts = group_statements(&tokens).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn label_without_colon_is_a_syntax_error() {
        let tokens = tokenize("loop add $t0, $t1, $t2\n", "t.s", &is_mnemonic);
        assert!(group_statements(&tokens).is_err());
    }
}
