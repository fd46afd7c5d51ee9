//! Análisis semántico mínimo.
//!
//! El parser consulta este módulo mientras reconoce cada constructo:
//! los identificadores deben declararse antes de usarse, cada bloque
//! abre un nuevo marco de símbolos y los operadores verifican los
//! tipos de sus operandos en el momento de construirse.

use log::debug;
use thiserror::Error;

use std::{
    collections::HashMap,
    fmt::{self, Display},
    rc::Rc,
};

use crate::{lex::Identifier, types::Type};

/// Error semántico. Todos son fatales.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Symbol `{0}` is undeclared")]
    Undeclared(Identifier),

    #[error("Symbol `{0}` is already declared in this block")]
    Redeclared(Identifier),

    #[error("Type mismatch: operator `{op}` cannot be applied to `{lhs}` and `{rhs}`")]
    BinaryMismatch {
        op: &'static str,
        lhs: Type,
        rhs: Type,
    },

    #[error("Type mismatch: operator `{op}` cannot be applied to `{operand}`")]
    UnaryMismatch { op: &'static str, operand: Type },

    #[error("Type mismatch: cannot assign `{value}` to `{target}`")]
    AssignMismatch { target: Type, value: Type },

    #[error("Type mismatch: `{0}` condition must be `bool`, found `{1}`")]
    ExpectedBool(&'static str, Type),

    #[error("`{0}` has type `{1}` and cannot be indexed")]
    NotAnArray(Identifier, Type),

    #[error("`break` outside of a loop")]
    BreakOutsideLoop,

    #[error("Declaration of `{0}` exceeds the addressable storage")]
    TooLarge(Identifier),

    #[error("An array of {length} `{element}` exceeds the addressable storage")]
    ArrayTooLarge { length: u32, element: Type },
}

/// Un símbolo declarado.
///
/// El desplazamiento de almacenamiento se asigna al declararse y es
/// único dentro de la unidad de compilación.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: Identifier,
    typ: Type,
    offset: u32,
}

impl Symbol {
    pub fn new(name: Identifier, typ: Type, offset: u32) -> Self {
        Symbol { name, typ, offset }
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn typ(&self) -> &Type {
        &self.typ
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(fmt)
    }
}

/// Tabla de símbolos con anidamiento por bloques.
///
/// Cada marco asocia nombres con símbolos. El marco más interno es el
/// último de la cadena; una búsqueda recorre los marcos de adentro
/// hacia afuera y retorna el primer resultado, por lo que una
/// declaración interna oculta a una externa sin modificarla. Siempre
/// existe al menos un marco exterior, el cual nunca se descarta.
#[derive(Debug)]
pub struct SymbolTable {
    frames: Vec<HashMap<Identifier, Rc<Symbol>>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            frames: vec![HashMap::new()],
        }
    }

    /// Abre un marco vacío cuyo padre es el marco actual.
    pub fn enter(&mut self) {
        self.frames.push(HashMap::new());
        debug!("Entered scope at depth {}", self.depth());
    }

    /// Descarta el marco actual junto con todas sus declaraciones.
    pub fn exit(&mut self) {
        if self.frames.len() > 1 {
            let frame = self.frames.pop();
            debug!(
                "Left scope at depth {}, dropping {} symbols",
                self.depth() + 1,
                frame.map_or(0, |frame| frame.len())
            );
        }
    }

    /// Profundidad de anidamiento; el marco exterior es la profundidad 0.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Declara un símbolo en el marco actual.
    ///
    /// Marcos padres no son afectados. Redeclarar un nombre en el mismo
    /// marco es un error.
    pub fn declare(&mut self, symbol: Rc<Symbol>) -> Result<(), SemanticError> {
        let depth = self.depth();
        let frame = &mut self.frames[depth];
        if frame.contains_key(symbol.name()) {
            return Err(SemanticError::Redeclared(symbol.name().clone()));
        }

        frame.insert(symbol.name().clone(), symbol);
        Ok(())
    }

    /// Busca el símbolo visible más cercano con este nombre.
    pub fn lookup(&self, name: &str) -> Option<&Rc<Symbol>> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, offset: u32) -> Rc<Symbol> {
        Rc::new(Symbol::new(name.into(), Type::INT, offset))
    }

    #[test]
    fn inner_declarations_shadow_outer_ones() {
        let mut table = SymbolTable::new();
        table.enter();
        table.declare(symbol("x", 0)).unwrap();

        table.enter();
        table.declare(symbol("x", 4)).unwrap();
        assert_eq!(table.lookup("x").map(|x| x.offset()), Some(4));

        table.exit();
        assert_eq!(table.lookup("x").map(|x| x.offset()), Some(0));
    }

    #[test]
    fn sibling_blocks_do_not_share_symbols() {
        let mut table = SymbolTable::new();
        table.enter();

        table.enter();
        table.declare(symbol("y", 0)).unwrap();
        table.exit();

        table.enter();
        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn outer_symbols_are_visible_inside() {
        let mut table = SymbolTable::new();
        table.enter();
        table.declare(symbol("z", 8)).unwrap();
        table.enter();
        table.enter();

        assert_eq!(table.depth(), 3);
        assert_eq!(table.lookup("z").map(|z| z.offset()), Some(8));
    }

    #[test]
    fn redeclaration_in_the_same_frame() {
        let mut table = SymbolTable::new();
        table.enter();
        table.declare(symbol("x", 0)).unwrap();

        let error = table.declare(symbol("x", 4)).unwrap_err();
        assert!(matches!(error, SemanticError::Redeclared(name) if name.as_ref() == "x"));
        assert_eq!(table.lookup("x").map(|x| x.offset()), Some(0));
    }

    #[test]
    fn outermost_frame_survives_exit() {
        let mut table = SymbolTable::new();
        table.declare(symbol("g", 0)).unwrap();
        table.exit();
        table.exit();

        assert_eq!(table.depth(), 0);
        assert!(table.lookup("g").is_some());
    }
}
