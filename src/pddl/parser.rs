use std::iter::Peekable;

use enumset::EnumSet;

use super::ast::{self, Expr, Literal, Name, Requirement, TypedList};
use super::lexer::Lexer;
use super::tokens::{BinOpToken, KeywordToken, Span, Token, TokenKind};
use super::{ParseError, Position};

const EXPECTED_NAME: &str = "Expected a name.";
const EXPECTED_COLON: &str = "Expected ':'.";
const EXPECTED_OPEN_PARENTHESIS: &str = "Expected '('.";
const EXPECTED_CLOSE_PARENTHESIS: &str = "Expected matched ')'.";

macro_rules! expect {
    ($input:expr, {$($p:pat => $b:expr$(,)?)+}, $err:expr) => {
        match $input {
            $($p => $b,)+
            Some(Ok(Token { span, .. })) => Err(ParseError::new(Position::Span(span), $err)),
            Some(Err(e)) => Err(e),
            None => Err(ParseError::new(Position::Eof, $err)),
        }
    };
}

fn once<T>(slot: &mut Option<T>, value: T, span: Span, section: KeywordToken) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::new(Position::Span(span), format!("Duplicate :{} section.", section.name())));
    }
    *slot = Some(value);
    Ok(())
}

/// Reads problem files and plan files. Domain files are rejected, the action
/// catalogue is built in.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(code: &'a str) -> Self {
        Self { lexer: Lexer::new(code).peekable() }
    }

    fn open(&mut self) -> Result<(), ParseError> {
        use TokenKind::OpenParenthesis;
        expect!(self.lexer.next(), {Some(Ok(Token { kind: OpenParenthesis, .. })) => Ok(())}, EXPECTED_OPEN_PARENTHESIS)
    }

    fn close(&mut self) -> Result<(), ParseError> {
        use TokenKind::CloseParenthesis;
        expect!(self.lexer.next(), {Some(Ok(Token { kind: CloseParenthesis, .. })) => Ok(())}, EXPECTED_CLOSE_PARENTHESIS)
    }

    fn at_open(&mut self) -> bool {
        matches!(self.lexer.peek(), Some(Ok(Token { kind: TokenKind::OpenParenthesis, .. })))
    }

    /// Object names may collide with section keywords.
    fn name(&mut self) -> Result<Name<'a>, ParseError> {
        use TokenKind::{Identifier, Keyword};
        expect!(self.lexer.next(), {
            Some(Ok(Token { kind: Identifier(text), span })) => Ok(Name { text, span }),
            Some(Ok(Token { kind: Keyword(k), span })) => Ok(Name { text: k.name(), span }),
        }, EXPECTED_NAME)
    }

    fn end(&mut self) -> Result<(), ParseError> {
        match self.lexer.next() {
            None => Ok(()),
            Some(Err(e)) => Err(e),
            Some(Ok(Token { span, .. })) => Err(ParseError::new(Position::Span(span), "Unexpected input after the problem.")),
        }
    }

    pub fn problem(&mut self) -> Result<ast::Problem<'a>, ParseError> {
        use KeywordToken::*;
        use TokenKind::{Colon, Keyword};
        self.open()?;
        expect!(self.lexer.next(), {Some(Ok(Token { kind: Keyword(Define), .. })) => Ok(())}, "Expected 'define'.")?;
        self.open()?;
        expect!(self.lexer.next(), {
            Some(Ok(Token { kind: Keyword(Problem), .. })) => Ok(()),
            Some(Ok(Token { kind: Keyword(Domain), span })) => Err(ParseError::new(
                Position::Span(span),
                "Domain files are not read, the household actions are built in.",
            )),
        }, "Expected 'problem'.")?;
        let name = self.name()?;
        self.close()?;

        let mut domain = None;
        let mut requirements = None;
        let mut objects = None;
        let mut init = None;
        let mut goal = None;
        while self.lexer.next_if(|t| matches!(t, Ok(Token { kind: TokenKind::OpenParenthesis, .. }))).is_some() {
            expect!(self.lexer.next(), {Some(Ok(Token { kind: Colon, .. })) => Ok(())}, EXPECTED_COLON)?;
            let (section, span) = expect!(self.lexer.next(), {
                Some(Ok(Token { kind: Keyword(k @ (Domain | Requirements | Objects | Init | Goal)), span })) => Ok((k, span)),
            }, "Expected :domain, :requirements, :objects, :init or :goal.")?;
            match section {
                Domain => once(&mut domain, self.name()?, span, section)?,
                Requirements => once(&mut requirements, self.requirements()?, span, section)?,
                Objects => once(&mut objects, self.objects()?, span, section)?,
                Init => once(&mut init, self.init()?, span, section)?,
                _ => once(&mut goal, self.expr()?, span, section)?,
            }
            self.close()?;
        }
        self.close()?;
        self.end()?;
        let at = Position::Span(name.span);
        let missing = |section: &str| ParseError::new(at, format!("Missing :{} section.", section));
        Ok(ast::Problem {
            name,
            domain,
            requirements: requirements.unwrap_or_default(),
            objects: objects.ok_or_else(|| missing("objects"))?,
            init: init.ok_or_else(|| missing("init"))?,
            goal,
        })
    }

    /// A sequence of `(action arg ...)` calls.
    pub fn plan(&mut self) -> Result<Vec<Literal<'a>>, ParseError> {
        use TokenKind::Identifier;
        let mut steps = Vec::new();
        while self.lexer.peek().is_some() {
            self.open()?;
            let name = expect!(self.lexer.next(), {
                Some(Ok(Token { kind: Identifier(text), span })) => Ok(Name { text, span }),
            }, "Expected an action name.")?;
            steps.push(self.literal(name)?);
            self.close()?;
        }
        Ok(steps)
    }

    fn requirements(&mut self) -> Result<EnumSet<Requirement>, ParseError> {
        let mut r = EnumSet::empty();
        while self.lexer.next_if(|t| matches!(t, Ok(Token { kind: TokenKind::Colon, .. }))).is_some() {
            let name = self.name()?;
            match Requirement::from_name(name.text) {
                Some(requirement) => r.insert(requirement),
                None => {
                    return Err(ParseError::new(
                        Position::Span(name.span),
                        format!("Unknown requirement ':{}'.", name.text),
                    ))
                }
            };
        }
        Ok(r)
    }

    /// Object names may collide with keywords.
    fn at_name(&mut self) -> bool {
        matches!(self.lexer.peek(), Some(Ok(Token { kind: TokenKind::Identifier(_) | TokenKind::Keyword(_), .. })))
    }

    fn typed_list(&mut self) -> Result<TypedList<'a>, ParseError> {
        use BinOpToken::Minus;
        use TokenKind::BinOp;
        let mut identifiers = Vec::new();
        while self.at_name() {
            identifiers.push(self.name()?);
        }
        expect!(self.lexer.next(), {Some(Ok(Token { kind: BinOp(Minus), .. })) => Ok(())}, "Expected '-' followed by a type.")?;
        let kind = self.name()?;
        Ok(TypedList { identifiers, kind })
    }

    fn objects(&mut self) -> Result<Vec<TypedList<'a>>, ParseError> {
        let mut objects = Vec::new();
        while self.at_name() {
            objects.push(self.typed_list()?);
        }
        Ok(objects)
    }

    fn init(&mut self) -> Result<Vec<Literal<'a>>, ParseError> {
        let mut facts = Vec::new();
        while self.at_open() {
            self.open()?;
            let name = self.name()?;
            facts.push(self.literal(name)?);
            self.close()?;
        }
        Ok(facts)
    }

    fn literal(&mut self, name: Name<'a>) -> Result<Literal<'a>, ParseError> {
        use TokenKind::{Identifier, Keyword, QuestionMark};
        let mut arguments = Vec::new();
        loop {
            match self.lexer.peek() {
                Some(Ok(Token { kind: Identifier(_) | Keyword(_), .. })) => arguments.push(self.name()?),
                Some(Ok(Token { kind: QuestionMark, span })) => {
                    return Err(ParseError::new(Position::Span(*span), "Variables are not allowed in problem files."))
                }
                _ => return Ok(Literal { name, arguments }),
            }
        }
    }

    fn and(&mut self) -> Result<Expr<'a>, ParseError> {
        let mut group = Vec::new();
        while self.at_open() {
            group.push(self.expr()?);
        }
        Ok(Expr::And(group))
    }

    fn not(&mut self) -> Result<Expr<'a>, ParseError> {
        Ok(Expr::Not(Box::new(self.expr()?)))
    }

    fn expr(&mut self) -> Result<Expr<'a>, ParseError> {
        use BinOpToken::{And, Not};
        use TokenKind::{BinOp, Identifier};
        self.open()?;
        let result = expect!(self.lexer.next(), {
            Some(Ok(Token { kind: BinOp(And), .. })) => self.and(),
            Some(Ok(Token { kind: BinOp(Not), .. })) => self.not(),
            Some(Ok(Token { kind: Identifier(text), span })) => self.literal(Name { text, span }).map(Expr::Literal),
        }, "Expected expression.")?;
        self.close()?;
        Ok(result)
    }
}
