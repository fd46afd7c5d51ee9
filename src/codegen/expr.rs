//! Nodos de expresión: cálculo de valores y código de saltos.

use std::rc::Rc;

use super::{Emitter, Sink, Target};
use crate::{
    ir::{ArithOp, Constant, Instruction, Operand, RelOp, Rvalue, Test},
    semantic::{SemanticError, Symbol},
    types::Type,
};

/// Nodo de expresión.
///
/// Cada nodo se construye de abajo hacia arriba durante el parsing,
/// con sus tipos ya resueltos, y no se modifica después.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(Constant),
    Id(Rc<Symbol>),
    Access(Access),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        typ: Type,
    },
    Negate {
        operand: Box<Expr>,
        typ: Type,
    },
    Not(Box<Expr>),
    Rel {
        op: RelOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Acceso indexado a un arreglo.
///
/// `index` es el desplazamiento lineal en bytes, ya escalado por
/// los anchos de cada dimensión.
#[derive(Clone, Debug)]
pub struct Access {
    pub array: Rc<Symbol>,
    pub index: Box<Expr>,
    pub typ: Type,
}

impl Expr {
    pub fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Result<Expr, SemanticError> {
        let (lhs_type, rhs_type) = (lhs.typ(), rhs.typ());
        let typ = Type::max(&lhs_type, &rhs_type).ok_or(SemanticError::BinaryMismatch {
            op: op.symbol(),
            lhs: lhs_type,
            rhs: rhs_type,
        })?;

        Ok(Expr::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            typ,
        })
    }

    pub fn negate(operand: Expr) -> Result<Expr, SemanticError> {
        let operand_type = operand.typ();
        let typ = Type::max(&Type::INT, &operand_type).ok_or(SemanticError::UnaryMismatch {
            op: "-",
            operand: operand_type,
        })?;

        Ok(Expr::Negate {
            operand: Box::new(operand),
            typ,
        })
    }

    pub fn not(operand: Expr) -> Result<Expr, SemanticError> {
        let operand_type = operand.typ();
        if operand_type != Type::BOOL {
            return Err(SemanticError::UnaryMismatch {
                op: "!",
                operand: operand_type,
            });
        }

        Ok(Expr::Not(Box::new(operand)))
    }

    /// Comparación relacional. Ambos operandos deben tener el mismo
    /// tipo y ninguno puede ser un arreglo.
    pub fn rel(op: RelOp, lhs: Expr, rhs: Expr) -> Result<Expr, SemanticError> {
        let (lhs_type, rhs_type) = (lhs.typ(), rhs.typ());
        if lhs_type.is_array() || rhs_type.is_array() || lhs_type != rhs_type {
            return Err(SemanticError::BinaryMismatch {
                op: op.symbol(),
                lhs: lhs_type,
                rhs: rhs_type,
            });
        }

        Ok(Expr::Rel {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Result<Expr, SemanticError> {
        logical("&&", &lhs, &rhs)?;
        Ok(Expr::And(Box::new(lhs), Box::new(rhs)))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Result<Expr, SemanticError> {
        logical("||", &lhs, &rhs)?;
        Ok(Expr::Or(Box::new(lhs), Box::new(rhs)))
    }

    /// Tipo resuelto de la expresión.
    pub fn typ(&self) -> Type {
        match self {
            Expr::Constant(Constant::Int(_)) => Type::INT,
            Expr::Constant(Constant::Real(_)) => Type::FLOAT,
            Expr::Constant(Constant::Bool(_)) => Type::BOOL,
            Expr::Id(symbol) => symbol.typ().clone(),
            Expr::Access(access) => access.typ.clone(),
            Expr::Arith { typ, .. } | Expr::Negate { typ, .. } => typ.clone(),
            Expr::Not(_) | Expr::Rel { .. } | Expr::And(..) | Expr::Or(..) => Type::BOOL,
        }
    }

    /// Emite el código necesario para que el valor quede expresado
    /// como un solo operador sobre operandos.
    ///
    /// Las expresiones booleanas en contexto de valor se materializan
    /// en un temporal por medio de código de saltos.
    pub fn gen<S: Sink>(&self, emitter: &mut Emitter<S>) -> Rvalue {
        match self {
            Expr::Constant(constant) => Rvalue::Use(Operand::Constant(*constant)),
            Expr::Id(symbol) => Rvalue::Use(Operand::Var(Rc::clone(symbol))),

            Expr::Access(access) => {
                let offset = access.index.reduce(emitter);
                Rvalue::Index(Rc::clone(&access.array), offset)
            }

            Expr::Arith { op, lhs, rhs, .. } => {
                let lhs = lhs.reduce(emitter);
                let rhs = rhs.reduce(emitter);
                Rvalue::Binary(*op, lhs, rhs)
            }

            Expr::Negate { operand, .. } => Rvalue::Negate(operand.reduce(emitter)),

            Expr::Not(_) | Expr::Rel { .. } | Expr::And(..) | Expr::Or(..) => {
                let on_false = emitter.new_label();
                let after = emitter.new_label();
                let temp = emitter.new_temp();

                self.jumping(emitter, Target::Fall, Target::Label(on_false));
                emitter.emit(Instruction::Assign {
                    dest: temp.clone(),
                    value: Rvalue::Use(Operand::Constant(Constant::Bool(true))),
                });

                emitter.emit(Instruction::Jump(after));
                emitter.emit_label(on_false);
                emitter.emit(Instruction::Assign {
                    dest: temp.clone(),
                    value: Rvalue::Use(Operand::Constant(Constant::Bool(false))),
                });

                emitter.emit_label(after);
                Rvalue::Use(temp)
            }
        }
    }

    /// Emite el cálculo del valor y retorna el operando que lo contiene.
    ///
    /// Constantes e identificadores no emiten nada; cualquier otra
    /// expresión termina en un temporal nuevo.
    pub fn reduce<S: Sink>(&self, emitter: &mut Emitter<S>) -> Operand {
        match self.gen(emitter) {
            Rvalue::Use(operand) => operand,
            value => {
                let temp = emitter.new_temp();
                emitter.emit(Instruction::Assign {
                    dest: temp.clone(),
                    value,
                });

                temp
            }
        }
    }

    /// Emite código de saltos: el control llega a `on_true` si la
    /// expresión es verdadera y a `on_false` si no.
    pub fn jumping<S: Sink>(&self, emitter: &mut Emitter<S>, on_true: Target, on_false: Target) {
        match self {
            Expr::Constant(Constant::Bool(value)) => {
                let target = if *value { on_true } else { on_false };
                if let Target::Label(label) = target {
                    emitter.emit(Instruction::Jump(label));
                }
            }

            Expr::Not(operand) => operand.jumping(emitter, on_false, on_true),

            Expr::Rel { op, lhs, rhs } => {
                let lhs = lhs.reduce(emitter);
                let rhs = rhs.reduce(emitter);
                emitter.emit_jumps(Test::Compare(lhs, *op, rhs), on_true, on_false);
            }

            // El operando derecho solo se alcanza si el izquierdo es
            // verdadero; el falso reutiliza la etiqueta del llamador
            Expr::And(lhs, rhs) => {
                let label = match on_false {
                    Target::Label(label) => label,
                    Target::Fall => emitter.new_label(),
                };

                lhs.jumping(emitter, Target::Fall, Target::Label(label));
                rhs.jumping(emitter, on_true, on_false);

                if on_false == Target::Fall {
                    emitter.emit_label(label);
                }
            }

            Expr::Or(lhs, rhs) => {
                let label = match on_true {
                    Target::Label(label) => label,
                    Target::Fall => emitter.new_label(),
                };

                lhs.jumping(emitter, Target::Label(label), Target::Fall);
                rhs.jumping(emitter, on_true, on_false);

                if on_true == Target::Fall {
                    emitter.emit_label(label);
                }
            }

            _ => {
                let value = self.reduce(emitter);
                emitter.emit_jumps(Test::Truth(value), on_true, on_false);
            }
        }
    }
}

fn logical(op: &'static str, lhs: &Expr, rhs: &Expr) -> Result<(), SemanticError> {
    let (lhs, rhs) = (lhs.typ(), rhs.typ());
    if lhs == Type::BOOL && rhs == Type::BOOL {
        Ok(())
    } else {
        Err(SemanticError::BinaryMismatch { op, lhs, rhs })
    }
}
