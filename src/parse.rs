//! Análisis sintáctico.
//!
//! Parser de descenso recursivo con un token de lookahead, una función
//! por no terminal de la gramática:
//!
//! ```text
//! program  -> block
//! block    -> { decls stmts }
//! decls    -> (basic dims? ID dims? ;)*
//! dims     -> [ NUM ] dims?
//! stmt     -> ; | block | ID = bool ; | ID offset = bool ;
//!           | if ( bool ) stmt (else stmt)?
//!           | while ( bool ) stmt | do stmt while ( bool ) ;
//!           | break ;
//! bool     -> join (|| join)*
//! join     -> equality (&& equality)*
//! equality -> rel ((== | !=) rel)*
//! rel      -> expr ((< | <= | >= | >) expr)?
//! expr     -> term ((+ | -) term)*
//! term     -> unary ((* | /) unary)*
//! unary    -> (- | !) unary | factor
//! factor   -> ( bool ) | NUM | REAL | true | false | ID offset?
//! offset   -> ([ bool ])+
//! ```
//!
//! El análisis semántico ocurre en el mismo recorrido: cada bloque abre
//! un marco en la tabla de símbolos, cada declaración recibe su
//! desplazamiento de almacenamiento y cada expresión se construye con
//! sus tipos ya verificados. El primer error aborta todo.

use log::debug;
use std::{iter::Peekable, rc::Rc};
use thiserror::Error;

use crate::{
    codegen::{Access, BreakTarget, Emitter, Expr, Sink, Stmt},
    error::CompileError,
    ir::{ArithOp, Constant, RelOp},
    lex::{Identifier, Keyword, LexerError, Token},
    semantic::{SemanticError, Symbol, SymbolTable},
    source::{Located, Location},
    types::{Type, MAX_WIDTH},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected identifier, found {0} instead")]
    ExpectedId(Token),

    #[error("Expected any of `int`, `float`, `char`, `bool`, found {0} instead")]
    ExpectedType(Token),

    #[error("Expected array length, found {0} instead")]
    ExpectedLength(Token),

    #[error("Expected an expression, found {0} instead")]
    ExpectedExpr(Token),

    #[error("Array dimensions of `{0}` are given both before and after its name")]
    DuplicateDims(Identifier),

    #[error("Expected end of input after program, found {0} instead")]
    TrailingInput(Token),

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Un flujo de tokens, posiblemente fallido.
pub trait TokenStream: Iterator<Item = Result<Located<Token>, Located<LexerError>>> {}

impl<I> TokenStream for I where I: Iterator<Item = Result<Located<Token>, Located<LexerError>>> {}

/// Una unidad de compilación ya analizada.
#[derive(Debug)]
pub struct Unit {
    body: Stmt,
    width: u32,
}

impl Unit {
    /// Sentencia que forma el bloque exterior.
    pub fn body(&self) -> &Stmt {
        &self.body
    }

    /// Almacenamiento total ocupado por todas las declaraciones.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Emite el programa completo, delimitado por sus etiquetas de
    /// inicio y fin.
    pub fn gen<S: Sink>(&self, emitter: &mut Emitter<S>) {
        let begin = emitter.new_label();
        let after = emitter.new_label();

        emitter.emit_label(begin);
        self.body.gen(emitter, begin, after);
        emitter.emit_label(after);

        debug!(
            "Emitted {} instructions, {} labels, {} temporaries",
            emitter.emitted(),
            emitter.labels(),
            emitter.temps()
        );
    }
}

/// Analiza una unidad de compilación completa.
///
/// `start` es la ubicación que se reporta si la entrada está vacía.
pub fn parse<I: TokenStream>(tokens: I, start: Location) -> Result<Unit, Located<CompileError>> {
    let mut parser = Parser {
        tokens: tokens.peekable(),
        last_known: start,
        top: SymbolTable::new(),
        used: 0,
        loops: Vec::new(),
    };

    parser.program()
}

/// Traduce una unidad de compilación a código de tres direcciones.
///
/// Si ocurre un error, no se emite ninguna instrucción.
pub fn translate<I, S>(
    tokens: I,
    start: Location,
    emitter: &mut Emitter<S>,
) -> Result<(), Located<CompileError>>
where
    I: TokenStream,
    S: Sink,
{
    parse(tokens, start)?.gen(emitter);
    Ok(())
}

struct Parser<I: TokenStream> {
    tokens: Peekable<I>,
    last_known: Location,
    top: SymbolTable,
    used: u32,
    loops: Vec<BreakTarget>,
}

type Parse<T> = Result<T, Located<CompileError>>;

impl<I: TokenStream> Parser<I> {
    fn program(&mut self) -> Parse<Unit> {
        let body = self.block()?;
        if let Some(token) = self.peek()? {
            let token = token.clone();
            self.next()?;
            return self.fail(ParserError::TrailingInput(token));
        }

        Ok(Unit {
            body,
            width: self.used,
        })
    }

    fn block(&mut self) -> Parse<Stmt> {
        self.expect(Token::OpenCurly)?;

        self.top.enter();
        let body = self.decls().and_then(|()| self.stmts());
        self.top.exit();

        let body = body?;
        self.expect(Token::CloseCurly)?;

        Ok(body)
    }

    fn decls(&mut self) -> Parse<()> {
        while let Some(Token::Basic(_)) = self.peek()? {
            let typ = self.typ()?;
            let (location, name) = self.id()?.split();

            let typ = match self.peek()? {
                Some(Token::OpenSquare) if typ.is_array() => {
                    return Err(Located::at(ParserError::DuplicateDims(name).into(), location))
                }

                Some(Token::OpenSquare) => self.dims(typ)?,
                _ => typ,
            };

            self.expect(Token::Semicolon)?;
            self.declare(name, typ, location)?;
        }

        Ok(())
    }

    fn declare(&mut self, name: Identifier, typ: Type, location: Location) -> Parse<()> {
        let width = typ.width();
        let used = self
            .used
            .checked_add(width)
            .filter(|&used| used <= MAX_WIDTH)
            .ok_or_else(|| SemanticError::TooLarge(name.clone()));

        let used = semantic(used, &location)?;
        let symbol = Rc::new(Symbol::new(name, typ, self.used));

        semantic(self.top.declare(Rc::clone(&symbol)), &location)?;
        debug!(
            "Declared `{}` of type `{}` at offset {}, width {}",
            symbol,
            symbol.typ(),
            symbol.offset(),
            width
        );

        self.used = used;
        Ok(())
    }

    fn typ(&mut self) -> Parse<Type> {
        let basic = match self.next()?.into_inner() {
            Token::Basic(basic) => basic,
            token => return self.fail(ParserError::ExpectedType(token)),
        };

        match self.peek()? {
            Some(Token::OpenSquare) => self.dims(Type::Basic(basic)),
            _ => Ok(Type::Basic(basic)),
        }
    }

    /// Dimensiones de arreglo. El corchete más a la izquierda es la
    /// dimensión más externa, por lo que el tipo se construye de
    /// derecha a izquierda.
    fn dims(&mut self, of: Type) -> Parse<Type> {
        self.expect(Token::OpenSquare)?;
        let (location, token) = self.next()?.split();
        let length = match token {
            Token::IntLiteral(length) => length as u32,
            token => return self.fail(ParserError::ExpectedLength(token)),
        };

        self.expect(Token::CloseSquare)?;

        let of = match self.peek()? {
            Some(Token::OpenSquare) => self.dims(of)?,
            _ => of,
        };

        let element = of.clone();
        let typ = Type::array(length, of).ok_or(SemanticError::ArrayTooLarge { length, element });
        semantic(typ, &location)
    }

    fn stmts(&mut self) -> Parse<Stmt> {
        let mut statements = Vec::new();
        while !matches!(self.peek()?, None | Some(Token::CloseCurly)) {
            statements.push(self.stmt()?);
        }

        Ok(Stmt::sequence(statements))
    }

    fn stmt(&mut self) -> Parse<Stmt> {
        match self.peek()? {
            Some(Token::Semicolon) => {
                self.next()?;
                Ok(Stmt::Null)
            }

            Some(Token::OpenCurly) => self.block(),
            Some(Token::Keyword(Keyword::If)) => self.if_statement(),
            Some(Token::Keyword(Keyword::While)) => self.while_statement(),
            Some(Token::Keyword(Keyword::Do)) => self.do_statement(),
            Some(Token::Keyword(Keyword::Break)) => self.break_statement(),
            _ => self.assign(),
        }
    }

    fn if_statement(&mut self) -> Parse<Stmt> {
        let location = self.keyword(Keyword::If)?;
        let condition = self.condition("if", &location)?;
        let body = self.stmt()?;

        if let Some(Token::Keyword(Keyword::Else)) = self.peek()? {
            self.next()?;
            let otherwise = self.stmt()?;

            return Ok(Stmt::Else {
                condition,
                then: Box::new(body),
                otherwise: Box::new(otherwise),
            });
        }

        Ok(Stmt::If {
            condition,
            body: Box::new(body),
        })
    }

    fn while_statement(&mut self) -> Parse<Stmt> {
        let location = self.keyword(Keyword::While)?;
        let condition = self.condition("while", &location)?;

        let exit = BreakTarget::default();
        let body = self.loop_body(&exit, Parser::stmt)?;

        Ok(Stmt::While {
            condition,
            body: Box::new(body),
            exit,
        })
    }

    fn do_statement(&mut self) -> Parse<Stmt> {
        self.keyword(Keyword::Do)?;

        let exit = BreakTarget::default();
        let body = self.loop_body(&exit, Parser::stmt)?;

        let location = self.keyword(Keyword::While)?;
        let condition = self.condition("do", &location)?;
        self.expect(Token::Semicolon)?;

        Ok(Stmt::Do {
            body: Box::new(body),
            condition,
            exit,
        })
    }

    fn break_statement(&mut self) -> Parse<Stmt> {
        let location = self.keyword(Keyword::Break)?;
        let exit = match self.loops.last() {
            Some(exit) => exit.clone(),
            None => return semantic(Err(SemanticError::BreakOutsideLoop), &location),
        };

        self.expect(Token::Semicolon)?;
        Ok(Stmt::Break(exit))
    }

    /// Analiza el cuerpo de un ciclo con `exit` como destino de
    /// cualquier `break` que no esté dentro de un ciclo más interno.
    fn loop_body<F>(&mut self, exit: &BreakTarget, rule: F) -> Parse<Stmt>
    where
        F: FnOnce(&mut Self) -> Parse<Stmt>,
    {
        self.loops.push(exit.clone());
        debug!("Entered loop at depth {}", self.loops.len());

        let body = rule(self);
        self.loops.pop();
        debug!("Left loop, depth is now {}", self.loops.len());

        body
    }

    /// `( bool )`, cuyo tipo debe ser `bool`.
    fn condition(&mut self, construct: &'static str, location: &Location) -> Parse<Expr> {
        self.expect(Token::OpenParen)?;
        let condition = self.bool()?;
        self.expect(Token::CloseParen)?;

        let typ = condition.typ();
        if typ != Type::BOOL {
            return semantic(Err(SemanticError::ExpectedBool(construct, typ)), location);
        }

        Ok(condition)
    }

    fn assign(&mut self) -> Parse<Stmt> {
        let (location, name) = self.id()?.split();
        let symbol = self.lookup(&name, &location)?;

        let statement = match self.peek()? {
            Some(Token::Assign) => {
                let location = self.next()?.location().clone();
                let value = self.bool()?;

                let (target, value_type) = (symbol.typ(), value.typ());
                let compatible = (target.is_numeric() && value_type.is_numeric())
                    || (*target == Type::BOOL && value_type == Type::BOOL);

                if !compatible {
                    let error = SemanticError::AssignMismatch {
                        target: target.clone(),
                        value: value_type,
                    };

                    return semantic(Err(error), &location);
                }

                Stmt::Set {
                    target: symbol,
                    value,
                }
            }

            _ => {
                let target = self.offset(symbol, &location)?;
                let location = self.expect(Token::Assign)?;
                let value = self.bool()?;

                let value_type = value.typ();
                let compatible = !target.typ.is_array()
                    && !value_type.is_array()
                    && (target.typ == value_type
                        || (target.typ.is_numeric() && value_type.is_numeric()));

                if !compatible {
                    let error = SemanticError::AssignMismatch {
                        target: target.typ.clone(),
                        value: value_type,
                    };

                    return semantic(Err(error), &location);
                }

                Stmt::SetElem { target, value }
            }
        };

        self.expect(Token::Semicolon)?;
        Ok(statement)
    }

    fn bool(&mut self) -> Parse<Expr> {
        let mut expr = self.join()?;
        while let Some(Token::Or) = self.peek()? {
            let location = self.next()?.location().clone();
            let rhs = self.join()?;
            expr = semantic(Expr::or(expr, rhs), &location)?;
        }

        Ok(expr)
    }

    fn join(&mut self) -> Parse<Expr> {
        let mut expr = self.equality()?;
        while let Some(Token::And) = self.peek()? {
            let location = self.next()?.location().clone();
            let rhs = self.equality()?;
            expr = semantic(Expr::and(expr, rhs), &location)?;
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Parse<Expr> {
        let mut expr = self.rel()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Equal) => RelOp::Equal,
                Some(Token::NotEqual) => RelOp::NotEqual,
                _ => break Ok(expr),
            };

            let location = self.next()?.location().clone();
            let rhs = self.rel()?;
            expr = semantic(Expr::rel(op, expr, rhs), &location)?;
        }
    }

    fn rel(&mut self) -> Parse<Expr> {
        let expr = self.expr()?;
        let op = match self.peek()? {
            Some(Token::Less) => RelOp::Less,
            Some(Token::LessOrEqual) => RelOp::LessOrEqual,
            Some(Token::GreaterOrEqual) => RelOp::GreaterOrEqual,
            Some(Token::Greater) => RelOp::Greater,
            _ => return Ok(expr),
        };

        let location = self.next()?.location().clone();
        let rhs = self.expr()?;
        semantic(Expr::rel(op, expr, rhs), &location)
    }

    fn expr(&mut self) -> Parse<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break Ok(expr),
            };

            let location = self.next()?.location().clone();
            let rhs = self.term()?;
            expr = semantic(Expr::arith(op, expr, rhs), &location)?;
        }
    }

    fn term(&mut self) -> Parse<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Times) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => break Ok(expr),
            };

            let location = self.next()?.location().clone();
            let rhs = self.unary()?;
            expr = semantic(Expr::arith(op, expr, rhs), &location)?;
        }
    }

    fn unary(&mut self) -> Parse<Expr> {
        match self.peek()? {
            Some(Token::Minus) => {
                let location = self.next()?.location().clone();
                let operand = self.unary()?;
                semantic(Expr::negate(operand), &location)
            }

            Some(Token::Not) => {
                let location = self.next()?.location().clone();
                let operand = self.unary()?;
                semantic(Expr::not(operand), &location)
            }

            _ => self.factor(),
        }
    }

    fn factor(&mut self) -> Parse<Expr> {
        let (location, token) = self.next()?.split();
        match token {
            Token::OpenParen => {
                let expr = self.bool()?;
                self.expect(Token::CloseParen)?;
                Ok(expr)
            }

            Token::IntLiteral(integer) => Ok(Expr::Constant(Constant::Int(integer))),
            Token::RealLiteral(real) => Ok(Expr::Constant(Constant::Real(real))),
            Token::Keyword(Keyword::True) => Ok(Expr::Constant(Constant::Bool(true))),
            Token::Keyword(Keyword::False) => Ok(Expr::Constant(Constant::Bool(false))),

            Token::Id(name) => {
                let symbol = self.lookup(&name, &location)?;
                match self.peek()? {
                    Some(Token::OpenSquare) => Ok(Expr::Access(self.offset(symbol, &location)?)),
                    _ => Ok(Expr::Id(symbol)),
                }
            }

            token => self.fail(ParserError::ExpectedExpr(token)),
        }
    }

    /// Desplazamiento lineal de `a[i1][i2]...[ik]`.
    ///
    /// Cada índice se escala por el ancho del tipo que resulta de
    /// remover una dimensión más, y los términos se suman de izquierda
    /// a derecha. El tipo del acceso es el del elemento más interno.
    fn offset(&mut self, array: Rc<Symbol>, location: &Location) -> Parse<Access> {
        let (mut index, mut typ) = self.subscript(&array, array.typ(), location)?;
        while let Some(Token::OpenSquare) = self.peek()? {
            let (term, element) = self.subscript(&array, &typ, location)?;
            index = semantic(Expr::arith(ArithOp::Add, index, term), location)?;
            typ = element;
        }

        Ok(Access {
            array,
            index: Box::new(index),
            typ,
        })
    }

    /// `[ bool ]`, escalado por el ancho de los elementos de `typ`.
    fn subscript(
        &mut self,
        array: &Symbol,
        typ: &Type,
        location: &Location,
    ) -> Parse<(Expr, Type)> {
        let bracket = self.expect(Token::OpenSquare)?;
        let index = self.bool()?;
        self.expect(Token::CloseSquare)?;

        let element = match typ.element() {
            Some(element) => element.clone(),
            None => {
                let error = SemanticError::NotAnArray(array.name().clone(), typ.clone());
                return semantic(Err(error), location);
            }
        };

        let width = Expr::Constant(Constant::Int(element.width() as i32));
        let term = semantic(Expr::arith(ArithOp::Mul, index, width), &bracket)?;

        Ok((term, element))
    }

    fn lookup(&self, name: &Identifier, location: &Location) -> Parse<Rc<Symbol>> {
        match self.top.lookup(name.as_ref()) {
            Some(symbol) => Ok(Rc::clone(symbol)),
            None => semantic(Err(SemanticError::Undeclared(name.clone())), location),
        }
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            token => self.fail(ParserError::ExpectedId(token)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<Location> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<Location> {
        match self.next() {
            Ok(found) if *found.as_ref() == token => Ok(found.location().clone()),
            Ok(found) => self.fail(ParserError::UnexpectedToken(token, found.into_inner())),
            Err(error) => {
                let eof = matches!(
                    error.val(),
                    CompileError::Syntax(ParserError::UnexpectedEof)
                );

                if eof {
                    self.fail(ParserError::MissingToken(token))
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Observa el siguiente token sin consumirlo.
    fn peek(&mut self) -> Parse<Option<&Token>> {
        if matches!(self.tokens.peek(), Some(Err(_))) {
            return match self.tokens.next() {
                Some(Err(error)) => Err(error.map(CompileError::from)),
                _ => unreachable!(),
            };
        }

        Ok(match self.tokens.peek() {
            Some(Ok(token)) => Some(token.as_ref()),
            _ => None,
        })
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(Ok(token)) => {
                self.last_known = token.location().clone();
                Ok(token)
            }

            Some(Err(error)) => Err(error.map(CompileError::from)),
            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error.into(), self.last_known.clone()))
    }
}

/// Ubica un error semántico.
fn semantic<T>(result: Result<T, SemanticError>, location: &Location) -> Parse<T> {
    result.map_err(|error| Located::at(error.into(), location.clone()))
}

#[cfg(test)]
mod tests;
