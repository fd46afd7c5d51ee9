//! Sistema de tipos.
//!
//! Un tipo es básico (`int`, `float`, `char`, `bool`), con un ancho
//! de almacenamiento fijo, o un arreglo de longitud declarada sobre
//! otro tipo cualquiera. Los arreglos se anidan arbitrariamente:
//! `int[3][4]` es un arreglo de 3 elementos, cada uno de los cuales
//! es un arreglo de 4 enteros. El ancho de un arreglo es su longitud
//! multiplicada por el ancho de sus elementos.
//!
//! Los tipos son valores inmutables. Dos descripciones estructuralmente
//! iguales construyen tipos iguales.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

/// Ancho máximo de cualquier tipo. Los desplazamientos lineales
/// se calculan con constantes enteras, así que ningún ancho puede
/// exceder el rango de estas.
pub const MAX_WIDTH: u32 = i32::MAX as u32;

/// Un tipo básico.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Basic {
    Int,
    Float,
    Char,
    Bool,
}

impl Basic {
    /// Ancho de almacenamiento, en bytes.
    pub fn width(self) -> u32 {
        match self {
            Basic::Int => 4,
            Basic::Float => 8,
            Basic::Char => 1,
            Basic::Bool => 1,
        }
    }

    /// Determina si el tipo admite aritmética.
    pub fn is_numeric(self) -> bool {
        matches!(self, Basic::Int | Basic::Float | Basic::Char)
    }
}

impl Display for Basic {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Basic::Int => "int",
            Basic::Float => "float",
            Basic::Char => "char",
            Basic::Bool => "bool",
        };

        fmt.write_str(name)
    }
}

/// Un tipo cualquiera.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(Basic),
    Array(Array),
}

/// Un tipo arreglo.
///
/// Solo puede construirse por medio de [`Type::array()`], lo cual
/// garantiza que su ancho sea representable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Array {
    of: Rc<Type>,
    length: u32,
}

impl Array {
    /// Tipo de cada elemento.
    pub fn of(&self) -> &Type {
        &self.of
    }

    /// Cantidad de elementos.
    pub fn length(&self) -> u32 {
        self.length
    }
}

impl Type {
    pub const INT: Type = Type::Basic(Basic::Int);
    pub const FLOAT: Type = Type::Basic(Basic::Float);
    pub const CHAR: Type = Type::Basic(Basic::Char);
    pub const BOOL: Type = Type::Basic(Basic::Bool);

    /// Construye un arreglo de `length` elementos de tipo `of`.
    ///
    /// Falla si el ancho resultante excede [`MAX_WIDTH`].
    pub fn array(length: u32, of: Type) -> Option<Type> {
        length
            .checked_mul(of.width())
            .filter(|&width| width <= MAX_WIDTH)?;

        Some(Type::Array(Array {
            of: Rc::new(of),
            length,
        }))
    }

    /// Ancho de almacenamiento, en bytes.
    pub fn width(&self) -> u32 {
        match self {
            Type::Basic(basic) => basic.width(),
            Type::Array(array) => array.length * array.of.width(),
        }
    }

    /// Tipo de los elementos, si este tipo es un arreglo.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(array) => Some(&array.of),
            Type::Basic(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Basic(basic) if basic.is_numeric())
    }

    /// Tipo resultante de combinar dos operandos aritméticos.
    ///
    /// Los tipos numéricos se ordenan `char < int < float` y el
    /// resultado es el más amplio de ambos. No existe tipo común
    /// si alguno de los dos no es numérico.
    pub fn max(lhs: &Type, rhs: &Type) -> Option<Type> {
        if !lhs.is_numeric() || !rhs.is_numeric() {
            None
        } else if *lhs == Type::FLOAT || *rhs == Type::FLOAT {
            Some(Type::FLOAT)
        } else if *lhs == Type::INT || *rhs == Type::INT {
            Some(Type::INT)
        } else {
            Some(Type::CHAR)
        }
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dims = Vec::new();
        let mut base = self;
        while let Type::Array(array) = base {
            dims.push(array.length);
            base = &array.of;
        }

        if let Type::Basic(basic) = base {
            basic.fmt(fmt)?;
        }

        for length in dims {
            write!(fmt, "[{}]", length)?;
        }

        Ok(())
    }
}
