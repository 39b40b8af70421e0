use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
    pub len: usize,
}

impl Span {
    pub fn new(line: usize, col: usize, len: usize) -> Self {
        Span { line, col, len }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeywordToken {
    Define,
    Domain,
    Problem,
    Requirements,
    Objects,
    Init,
    Goal,
}

impl KeywordToken {
    pub fn name(self) -> &'static str {
        match self {
            KeywordToken::Define => "define",
            KeywordToken::Domain => "domain",
            KeywordToken::Problem => "problem",
            KeywordToken::Requirements => "requirements",
            KeywordToken::Objects => "objects",
            KeywordToken::Init => "init",
            KeywordToken::Goal => "goal",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpToken {
    And,
    Not,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind<'a> {
    OpenParenthesis,
    CloseParenthesis,
    Colon,
    QuestionMark,
    Keyword(KeywordToken),
    BinOp(BinOpToken),
    Identifier(&'a str),
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            OpenParenthesis => write!(f, "("),
            CloseParenthesis => write!(f, ")"),
            Colon => write!(f, ":"),
            QuestionMark => write!(f, "?"),
            Keyword(k) => write!(f, "{}", k.name()),
            BinOp(BinOpToken::And) => write!(f, "and"),
            BinOp(BinOpToken::Not) => write!(f, "not"),
            BinOp(BinOpToken::Minus) => write!(f, "-"),
            Identifier(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub span: Span,
    pub kind: TokenKind<'a>,
}
