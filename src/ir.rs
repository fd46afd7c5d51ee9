//! Código de tres direcciones emitido por el front end.
//!
//! El flujo de instrucciones es la única salida de la traducción. Las
//! etiquetas pueden referenciarse antes de declararse (saltos hacia
//! adelante) y después (reentrada de ciclos).

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use crate::semantic::Symbol;

/// Punto de emisión con nombre. Nunca se reutiliza.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "L{}", self.0)
    }
}

/// Un valor constante.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i32),
    Real(f64),
    Bool(bool),
}

impl Display for Constant {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(integer) => write!(fmt, "{}", integer),
            Constant::Real(real) => write!(fmt, "{:?}", real),
            Constant::Bool(boolean) => write!(fmt, "{}", boolean),
        }
    }
}

/// Operando de una instrucción.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Var(Rc<Symbol>),
    Temp(u32),
    Constant(Constant),
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(symbol) => symbol.fmt(fmt),
            Operand::Temp(temp) => write!(fmt, "t{}", temp),
            Operand::Constant(constant) => constant.fmt(fmt),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl RelOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Equal => "==",
            RelOp::NotEqual => "!=",
            RelOp::Less => "<",
            RelOp::LessOrEqual => "<=",
            RelOp::Greater => ">",
            RelOp::GreaterOrEqual => ">=",
        }
    }
}

/// Lado derecho de una asignación: a lo sumo un operador
/// aplicado sobre operandos ya reducidos.
#[derive(Clone, Debug, PartialEq)]
pub enum Rvalue {
    Use(Operand),
    Binary(ArithOp, Operand, Operand),
    Negate(Operand),
    Index(Rc<Symbol>, Operand),
}

impl Display for Rvalue {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Use(operand) => operand.fmt(fmt),
            Rvalue::Binary(op, lhs, rhs) => write!(fmt, "{} {} {}", lhs, op.symbol(), rhs),
            Rvalue::Negate(operand) => write!(fmt, "minus {}", operand),
            Rvalue::Index(array, offset) => write!(fmt, "{} [ {} ]", array, offset),
        }
    }
}

/// Condición de un salto condicional.
#[derive(Clone, Debug, PartialEq)]
pub enum Test {
    Compare(Operand, RelOp, Operand),
    Truth(Operand),
}

impl Display for Test {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Compare(lhs, op, rhs) => write!(fmt, "{} {} {}", lhs, op.symbol(), rhs),
            Test::Truth(operand) => operand.fmt(fmt),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Declara una etiqueta en este punto del flujo.
    SetLabel(Label),

    /// Salto incondicional.
    Jump(Label),

    /// Salto si `test` evalúa a `when`.
    Branch { test: Test, when: bool, target: Label },

    /// `dest = value`
    Assign { dest: Operand, value: Rvalue },

    /// `array [ offset ] = value`
    Store {
        array: Rc<Symbol>,
        offset: Operand,
        value: Operand,
    },
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::SetLabel(label) => write!(fmt, "{}:", label),
            Instruction::Jump(label) => write!(fmt, "goto {}", label),
            Instruction::Branch { test, when, target } => {
                let keyword = if *when { "if" } else { "iffalse" };
                write!(fmt, "{} {} goto {}", keyword, test, target)
            }

            Instruction::Assign { dest, value } => write!(fmt, "{} = {}", dest, value),
            Instruction::Store {
                array,
                offset,
                value,
            } => write!(fmt, "{} [ {} ] = {}", array, offset, value),
        }
    }
}
