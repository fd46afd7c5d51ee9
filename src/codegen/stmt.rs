//! Nodos de sentencia y su traducción con etiquetas de inicio y fin.

use std::{cell::Cell, rc::Rc};

use super::{Access, Emitter, Expr, Sink, Target};
use crate::{
    ir::{Instruction, Label, Operand},
    semantic::Symbol,
};

/// Destino de `break` para un ciclo.
///
/// El ciclo y cada `break` que el parser resolvió contra él comparten
/// el mismo destino. La etiqueta se fija cuando el ciclo genera su
/// código, antes de generar su cuerpo.
#[derive(Clone, Debug, Default)]
pub struct BreakTarget(Rc<Cell<Option<Label>>>);

impl BreakTarget {
    /// Etiqueta de salida del ciclo, si este ya comenzó a generarse.
    pub fn get(&self) -> Option<Label> {
        self.0.get()
    }

    fn set(&self, after: Label) {
        self.0.set(Some(after));
    }

    /// Determina si dos destinos pertenecen al mismo ciclo.
    #[cfg(test)]
    pub(crate) fn same_loop(&self, other: &BreakTarget) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Nodo de sentencia.
#[derive(Clone, Debug)]
pub enum Stmt {
    Null,

    /// Dos o más sentencias no vacías, en orden.
    Seq(Vec<Stmt>),
    If {
        condition: Expr,
        body: Box<Stmt>,
    },
    Else {
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        exit: BreakTarget,
    },
    Do {
        body: Box<Stmt>,
        condition: Expr,
        exit: BreakTarget,
    },
    Break(BreakTarget),
    Set {
        target: Rc<Symbol>,
        value: Expr,
    },
    SetElem {
        target: Access,
        value: Expr,
    },
}

impl Stmt {
    /// Encadena sentencias de izquierda a derecha.
    ///
    /// Las sentencias vacías se descartan, por lo que nunca reciben
    /// etiqueta. Una secuencia de una sola sentencia es esa sentencia.
    pub fn sequence<I>(statements: I) -> Stmt
    where
        I: IntoIterator<Item = Stmt>,
    {
        let mut statements: Vec<_> = statements
            .into_iter()
            .filter(|statement| !matches!(statement, Stmt::Null))
            .collect();

        match statements.len() {
            0 => Stmt::Null,
            1 => statements.pop().unwrap_or(Stmt::Null),
            _ => Stmt::Seq(statements),
        }
    }

    /// Emite el código de esta sentencia.
    ///
    /// `begin` es la etiqueta donde inicia (ya emitida por el llamador)
    /// y `after` es a donde debe llegar el control al completarse.
    pub fn gen<S: Sink>(&self, emitter: &mut Emitter<S>, begin: Label, after: Label) {
        match self {
            Stmt::Null => (),

            // Cada sentencia cae en la siguiente por una etiqueta intermedia
            Stmt::Seq(statements) => {
                let mut begin = begin;
                if let Some((last, init)) = statements.split_last() {
                    for statement in init {
                        let middle = emitter.new_label();
                        statement.gen(emitter, begin, middle);
                        emitter.emit_label(middle);
                        begin = middle;
                    }

                    last.gen(emitter, begin, after);
                }
            }

            Stmt::If { condition, body } => {
                let label = emitter.new_label();
                condition.jumping(emitter, Target::Fall, Target::Label(after));
                emitter.emit_label(label);
                body.gen(emitter, label, after);
            }

            Stmt::Else {
                condition,
                then,
                otherwise,
            } => {
                let then_label = emitter.new_label();
                let else_label = emitter.new_label();

                condition.jumping(emitter, Target::Fall, Target::Label(else_label));
                emitter.emit_label(then_label);
                then.gen(emitter, then_label, after);
                emitter.emit(Instruction::Jump(after));

                emitter.emit_label(else_label);
                otherwise.gen(emitter, else_label, after);
            }

            // `begin` es el punto de prueba; el cuerpo regresa a él
            Stmt::While {
                condition,
                body,
                exit,
            } => {
                exit.set(after);
                condition.jumping(emitter, Target::Fall, Target::Label(after));

                let label = emitter.new_label();
                emitter.emit_label(label);
                body.gen(emitter, label, begin);
                emitter.emit(Instruction::Jump(begin));
            }

            Stmt::Do {
                body,
                condition,
                exit,
            } => {
                exit.set(after);

                let label = emitter.new_label();
                body.gen(emitter, begin, label);
                emitter.emit_label(label);
                condition.jumping(emitter, Target::Label(begin), Target::Fall);
            }

            Stmt::Break(exit) => match exit.get() {
                Some(label) => emitter.emit(Instruction::Jump(label)),
                None => unreachable!("`break` generated outside of its loop"),
            },

            Stmt::Set { target, value } => {
                let value = value.gen(emitter);
                emitter.emit(Instruction::Assign {
                    dest: Operand::Var(Rc::clone(target)),
                    value,
                });
            }

            Stmt::SetElem { target, value } => {
                let offset = target.index.reduce(emitter);
                let value = value.reduce(emitter);
                emitter.emit(Instruction::Store {
                    array: Rc::clone(&target.array),
                    offset,
                    value,
                });
            }
        }
    }
}
