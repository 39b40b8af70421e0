use std::iter::Peekable;
use std::str::CharIndices;

use super::tokens::{BinOpToken::*, KeywordToken::*, Span, Token, TokenKind::*};
use super::{ParseError, Position};

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

pub struct Lexer<'a> {
    text: &'a str,
    it: Peekable<CharIndices<'a>>,
    line: usize, // current source line, used for error reporting by Tokens
    col: usize,  // current source column, used for error reporting by Tokens
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, it: text.char_indices().peekable(), line: 1, col: 1 }
    }

    /// Whitespace and `;` comments up to the end of their line.
    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.it.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                }
                ';' => {
                    while self.it.next_if(|(_, c)| *c != '\n').is_some() {}
                    continue;
                }
                c if c.is_whitespace() => self.col += 1,
                _ => break,
            }
            self.it.next();
        }
    }

    fn identifier(&mut self, offset: usize) -> Token<'a> {
        let mut len = 1;
        while self.it.next_if(|(_, c)| is_name_char(*c)).is_some() {
            len += 1;
        }
        let slice = match self.it.peek() {
            Some((end, _)) => &self.text[offset..*end],
            None => &self.text[offset..],
        };
        let kind = match slice.to_ascii_lowercase().as_str() {
            "define" => Keyword(Define),
            "domain" => Keyword(Domain),
            "problem" => Keyword(Problem),
            "requirements" => Keyword(Requirements),
            "objects" => Keyword(Objects),
            "init" => Keyword(Init),
            "goal" => Keyword(Goal),
            "and" => BinOp(And),
            "not" => BinOp(Not),
            _ => Identifier(slice),
        };
        Token { span: Span::new(self.line, self.col, len), kind }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        let (offset, c) = self.it.next()?;
        let here = Span::new(self.line, self.col, 1);
        let single = |kind| Token { span: here, kind };
        let token = match c {
            '(' => Ok(single(OpenParenthesis)),
            ')' => Ok(single(CloseParenthesis)),
            ':' => Ok(single(Colon)),
            '?' => Ok(single(QuestionMark)),
            // names may start with '-', a lone '-' separates a typed list
            '-' => match self.it.peek() {
                Some((_, n)) if is_name_char(*n) => Ok(self.identifier(offset)),
                _ => Ok(single(BinOp(Minus))),
            },
            c if is_name_char(c) => Ok(self.identifier(offset)),
            c => Err(ParseError::new(Position::Span(here), format!("Unexpected character '{}'.", c))),
        };
        match &token {
            Ok(t) => self.col += t.span.len,
            Err(_) => self.col += 1,
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tokens::{BinOpToken::*, KeywordToken::*, Span, Token, TokenKind::*};
    use super::super::{ParseError, Position};
    use super::Lexer;

    #[test]
    fn test_problem_header() {
        let code = "(define (problem simulation-a)\n\t(:objects me - person -x 2nd-shelf)";
        let mut l = Lexer::new(code);
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 1, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 2, 6), kind: Keyword(Define) })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 9, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 10, 7), kind: Keyword(Problem) })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 18, 12), kind: Identifier("simulation-a") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(1, 30, 1), kind: CloseParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 2, 1), kind: OpenParenthesis })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 3, 1), kind: Colon })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 4, 7), kind: Keyword(Objects) })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 12, 2), kind: Identifier("me") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 15, 1), kind: BinOp(Minus) })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 17, 6), kind: Identifier("person") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 24, 2), kind: Identifier("-x") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 27, 9), kind: Identifier("2nd-shelf") })));
        assert_eq!(l.next(), Some(Ok(Token { span: Span::new(2, 36, 1), kind: CloseParenthesis })));
        assert_eq!(l.next(), None);
    }

    #[test]
    fn test_comments_and_errors() {
        let code = "; header\n(hand-empty me) ; trailing\n$";
        let kinds: Vec<_> = Lexer::new(code).collect();
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[1], Ok(Token { span: Span::new(2, 2, 10), kind: Identifier("hand-empty") }));
        assert_eq!(
            kinds[4],
            Err(ParseError::new(Position::Span(Span::new(3, 1, 1)), String::from("Unexpected character '$'.")))
        );
    }
}
