//! Errores fatales y su presentación.
//!
//! Cualquier error aborta la traducción completa, por lo que nunca
//! existe más de un diagnóstico por ejecución.

use crate::{
    lex::LexerError,
    parse::ParserError,
    semantic::SemanticError,
    source::Located,
};

use std::fmt::{self, Display};
use thiserror::Error;

/// Error de cualquiera de las fases de la traducción.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Lexical(#[from] LexerError),

    #[error(transparent)]
    Syntax(#[from] ParserError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl CompileError {
    /// Nombre de la clase de error, para reportes.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lexical(_) => "Lexical error",
            CompileError::Syntax(_) => "Syntax error",
            CompileError::Semantic(_) => "Semantic error",
        }
    }
}

/// Reporte legible de un error fatal, con un extracto del código
/// fuente señalando la ubicación del error.
#[derive(Debug)]
pub struct Diagnostics {
    error: Located<CompileError>,
}

impl Diagnostics {
    pub fn error(&self) -> &Located<CompileError> {
        &self.error
    }
}

impl From<Located<CompileError>> for Diagnostics {
    fn from(error: Located<CompileError>) -> Self {
        Diagnostics { error }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let error = self.error.val();
        let location = self.error.location();

        writeln!(fmt, "{}: {}", error.kind(), error)?;
        writeln!(fmt, " --> {}", location)?;

        let line_number = location.line();
        let digits = line_number.to_string().len();
        writeln!(fmt, "{:digits$} |", "", digits = digits)?;

        location.source().with_line(line_number, |line| {
            writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
        })?;

        // El subrayado cubre solo la primera línea del rango
        let (start, end) = (location.start(), location.end());
        let from = start.column();
        let to = if end.line() == start.line() {
            end.column().max(from + 1)
        } else {
            from + 1
        };

        let skip = (from - 1) as usize;
        let highlight = (to - from) as usize;

        writeln!(
            fmt,
            "{:digits$} | {:skip$}{:^<highlight$}",
            "",
            "",
            "",
            digits = digits,
            skip = skip,
            highlight = highlight
        )?;

        writeln!(fmt)?;
        writeln!(fmt, "Translation aborted")
    }
}
