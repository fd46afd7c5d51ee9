//! Análisis léxico.
//!
//! # Tokenization
//! Descompone un [`InputStream`] (flujo de caracteres) en unidades
//! léxicas denominadas tokens. Los espacios en blanco y los comentarios
//! de línea (`// ...`) se descartan durante esta operación. Cada token
//! emitido está asociado a una ubicación en el código fuente original.
//!
//! # Contenido de un token
//! Operadores, puntuación, palabras clave y tipos básicos se identifican
//! por lo que son y no incluyen lexemas. Los identificadores sí incluyen
//! su lexema original. Las constantes literales se resuelven a sus
//! valores en vez de preservar sus lexemas.
//!
//! # Errores
//! El lexer es perezoso: solo escanea cuando el parser solicita el
//! siguiente token. Luego del primer error no emite nada más, ya
//! que cualquier error aborta la traducción completa.

use crate::{
    source::{InputStream, Located, Location},
    types::Basic,
};

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Literal entero máximo.
const INT_MAX: i32 = i32::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Una constante real no pudo interpretarse.
    #[error("Malformed real literal `{0}`")]
    BadReal(String),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Nombre de un tipo básico.
    Basic(Basic),

    /// Literal de entero.
    IntLiteral(i32),

    /// Literal de punto flotante.
    RealLiteral(f64),

    /// `=`
    Assign,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `<`
    Less,

    /// `<=`
    LessOrEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterOrEqual,

    /// `&&`
    And,

    /// `||`
    Or,

    /// `!`
    Not,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `;`
    Semicolon,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Basic(basic) => write!(fmt, "type `{}`", basic),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            RealLiteral(real) => write!(fmt, "literal `{:?}`", real),
            Assign => fmt.write_str("`=`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            Less => fmt.write_str("`<`"),
            LessOrEqual => fmt.write_str("`<=`"),
            Greater => fmt.write_str("`>`"),
            GreaterOrEqual => fmt.write_str("`>=`"),
            And => fmt.write_str("`&&`"),
            Or => fmt.write_str("`||`"),
            Not => fmt.write_str("`!`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Semicolon => fmt.write_str("`;`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            OpenSquare => fmt.write_str("`[`"),
            CloseSquare => fmt.write_str("`]`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    While,
    Do,
    Break,
    True,
    False,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            If    => "if",
            Else  => "else",
            While => "while",
            Do    => "do",
            Break => "break",
            True  => "true",
            False => "false",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("if",    If),
            ("else",  Else),
            ("while", While),
            ("do",    Do),
            ("break", Break),
            ("true",  True),
            ("false", False),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

impl FromStr for Basic {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "int" => Ok(Basic::Int),
            "float" => Ok(Basic::Float),
            "char" => Ok(Basic::Char),
            "bool" => Ok(Basic::Bool),
            _ => Err(()),
        }
    }
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: InputStream> {
    source: Peekable<S>,
    state: State,
    start: Location,
    last: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado terminal luego de un error.
    Error,

    /// Estado de completitud; siempre emite el token incluido
    /// sin consumir más entrada.
    Complete(Token),

    /// Se encontró el primer carácter de un operador que podría
    /// extenderse a dos caracteres (`<`, `>`, `=`, `!`, `&`, `|`, `/`).
    Operator(char),

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    Comment,

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que
    /// el siguiente carácter sea un dígito.
    Integer(i32),

    /// Constante real, a partir del punto decimal.
    Real(String),

    /// Término que puede ser un identificador, una palabra clave
    /// o un tipo básico.
    Word(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let last = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            last,
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use {State::*, Token::*};

        loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok((c, location))) => {
                    // El inicio del token se mueve junto a la entrada
                    // siempre que no se haya encontrado una frontera
                    if let Start = self.state {
                        self.start = location.clone();
                    }

                    Some(*c)
                }

                Some(Err(_)) => match self.source.next() {
                    Some(Err(error)) => return Err(error.into()),
                    _ => unreachable!(),
                },
            };

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                (Error, _) => return Ok(None),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('{')) => self.state = Complete(OpenCurly),
                (Start, Some('}')) => self.state = Complete(CloseCurly),
                (Start, Some('[')) => self.state = Complete(OpenSquare),
                (Start, Some(']')) => self.state = Complete(CloseSquare),
                (Start, Some(c @ ('<' | '>' | '=' | '!' | '&' | '|' | '/'))) => {
                    self.state = Operator(c)
                }

                // Identificadores, palabras clave y tipos
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume
                // el dígito, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera. Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_ascii_whitespace() => (),
                (Start, Some(c)) => return Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => return Ok(Some(std::mem::replace(token, Plus))),

                // `//` inicia un comentario
                (Operator('/'), Some('/')) => self.state = Comment,

                // Operadores de dos caracteres, o de uno si el segundo
                // carácter no extiende al primero
                (Operator(first), next) => match next.and_then(|second| double(*first, second)) {
                    Some(token) => self.state = Complete(token),
                    None => return single(*first).map(Some),
                },

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) => self.state = Start,
                (Comment, Some(_)) => (),
                (Comment, None) => self.state = Start,

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit as i32 - '0' as i32;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => return Err(LexerError::IntOverflow),
                    }
                }

                // Un punto convierte la constante entera en real
                (Integer(integer), Some('.')) => self.state = Real(format!("{}.", integer)),

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => return Ok(Some(IntLiteral(*integer))),

                (Real(digits), Some(digit)) if digit.is_ascii_digit() => digits.push(digit),
                (Real(digits), _) => {
                    return match digits.parse() {
                        Ok(real) => Ok(Some(RealLiteral(real))),
                        Err(_) => Err(LexerError::BadReal(std::mem::take(digits))),
                    }
                }

                // Extensión de términos
                (Word(word), Some(c)) if c.is_ascii_alphanumeric() || c == '_' => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    let token = if let Ok(keyword) = self::Keyword::from_str(word) {
                        Keyword(keyword)
                    } else if let Ok(basic) = crate::types::Basic::from_str(word) {
                        Basic(basic)
                    } else {
                        Id(Identifier::from(word.as_str()))
                    };

                    return Ok(Some(token));
                }
            }

            // Si no hubo `continue` ni retorno, aquí se consume el carácter
            // que se observó con lookahead anteriormente
            if let Some(Ok((_, location))) = self.source.next() {
                self.last = location;
            }
        }
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &self.last);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;

                let location = match self.source.peek() {
                    Some(Ok((_, location))) => location.clone(),
                    _ => self.last.clone(),
                };

                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Operador de dos caracteres, si los hay.
fn double(first: char, second: char) -> Option<Token> {
    let token = match (first, second) {
        ('<', '=') => Token::LessOrEqual,
        ('>', '=') => Token::GreaterOrEqual,
        ('=', '=') => Token::Equal,
        ('!', '=') => Token::NotEqual,
        ('&', '&') => Token::And,
        ('|', '|') => Token::Or,
        _ => return None,
    };

    Some(token)
}

/// Operador de un carácter, cuando no sigue un segundo carácter válido.
fn single(first: char) -> Result<Token, LexerError> {
    match first {
        '<' => Ok(Token::Less),
        '>' => Ok(Token::Greater),
        '=' => Ok(Token::Assign),
        '!' => Ok(Token::Not),
        '/' => Ok(Token::Slash),
        other => Err(LexerError::Expected(other)),
    }
}
