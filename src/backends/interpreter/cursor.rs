//! Operand cursor
//!
//! Handlers read their operands through a [`Cursor`] instead of indexing the token
//! slice by hand. The cursor remembers where the command word was, so the
//! consumption count a handler reports is always `position - command - 1` and can
//! never drift from what it actually read.

use tracing::warn;

use crate::backends::interpreter::Interpreter;
use crate::frontend::blocks::{resolve, Block, OpenerSet};
use crate::frontend::lexer::{is_identifier, Token};
use crate::runtime::error::{Failure, RuntimeError};
use crate::runtime::flow::{Flow, Step};

#[derive(Debug, Clone)]
pub struct Cursor<'t> {
    tokens: &'t [Token],
    command: usize,
    pos: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(
        tokens: &'t [Token],
        command: usize,
    ) -> Self {
        Self {
            tokens,
            command,
            pos: command + 1,
        }
    }

    /// The command word
    pub fn command(&self) -> &'t Token {
        &self.tokens[self.command]
    }

    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Next token, or a usage error that claims nothing.
    pub fn expect(
        &mut self,
        usage: &'static str,
    ) -> Result<&'t Token, Failure> {
        self.next()
            .ok_or_else(|| RuntimeError::usage(self.command().text(), usage).into())
    }

    /// Next token if it is an operand on the command's line.
    pub fn expect_operand(
        &mut self,
        interp: &Interpreter,
        usage: &'static str,
    ) -> Result<&'t Token, Failure> {
        match self.peek() {
            Some(token) if self.on_command_line(token) && !interp.is_boundary(token) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(RuntimeError::usage(self.command().text(), usage).into()),
        }
    }

    /// Tokens after the command word claimed so far
    pub fn consumed(&self) -> usize {
        self.pos - self.command - 1
    }

    /// A normal step covering everything read
    pub fn step(&self) -> Step {
        Step::new(self.consumed())
    }

    /// A step covering everything read, carrying `flow`
    pub fn step_with(
        &self,
        flow: Flow,
    ) -> Step {
        Step::with_flow(self.consumed(), flow)
    }

    /// Turn an error into a failure that skips everything read so far
    pub fn fail(
        &self,
        error: RuntimeError,
    ) -> Failure {
        error.consuming(self.consumed())
    }

    /// Skip `word` if it is next.
    pub fn eat(
        &mut self,
        word: &str,
    ) -> bool {
        if self.peek().is_some_and(|t| *t == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn on_command_line(
        &self,
        token: &Token,
    ) -> bool {
        token.line() == self.command().line()
    }

    /// Operand tokens on the command's line, up to the first command or
    /// structural keyword. `->` is kept when `keep_arrow` is set.
    pub fn line_operands(
        &mut self,
        interp: &Interpreter,
        keep_arrow: bool,
    ) -> &'t [Token] {
        let start = self.pos;
        while let Some(token) = self.peek() {
            let arrow = keep_arrow && *token == "->";
            if !self.on_command_line(token) || (interp.is_boundary(token) && !arrow) {
                break;
            }
            self.pos += 1;
        }
        &self.tokens[start..self.pos]
    }

    /// An optional target name: an identifier on the command's line that is
    /// not a command.
    pub fn target(
        &mut self,
        interp: &Interpreter,
    ) -> Option<&'t Token> {
        let token = self.peek()?;
        if self.on_command_line(token) && !interp.is_boundary(token) && is_identifier(token) {
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    /// Resolve the block that starts here and move past its `end`.
    ///
    /// An unterminated block claims the rest of the stream and is an error.
    pub fn block(
        &mut self,
        openers: &OpenerSet,
    ) -> Result<Block, Failure> {
        let block = resolve(self.tokens, self.pos, openers);
        self.pos = block.next();
        if !block.terminated {
            warn!(
                command = self.command().text(),
                line = self.command().line(),
                "block is missing its 'end'"
            );
            return Err(self.fail(RuntimeError::UnterminatedBlock(
                self.command().to_string(),
            )));
        }
        Ok(block)
    }

    /// Body tokens of a block resolved by [`block`](Self::block)
    pub fn body(
        &self,
        block: &Block,
    ) -> &'t [Token] {
        block.body(self.tokens)
    }
}
