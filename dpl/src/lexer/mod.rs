//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(lex_error(lexer.slice(), span, source)),
        }
    }

    tracing::trace!(count = tokens.len(), "tokenized");
    Ok(tokens)
}

fn lex_error(slice: &str, span: Span, source: &str) -> CompileError {
    if slice.starts_with('"') {
        let span = Span::new(span.start, source.len());
        return CompileError::lexer("unterminated text literal, expected '\"'", span);
    }
    if !slice.is_empty() && slice.bytes().all(|b| b.is_ascii_digit()) {
        return CompileError::lexer(format!("integer literal out of range: {slice}"), span);
    }
    let message = match slice.chars().next() {
        Some('|') => "unexpected character '|', expected '||'".to_string(),
        Some('!') => "unexpected character '!', expected '!='".to_string(),
        _ => format!("unexpected character: {slice:?}"),
    };
    CompileError::lexer(message, span)
}
