//! Traducción dirigida por sintaxis.
//!
//! Los nodos de expresión ([`Expr`]) y de sentencia ([`Stmt`]) que
//! construye el parser exponen tres contratos de emisión:
//!
//! - [`Expr::reduce()`] emite el cálculo de un valor y retorna el
//!   operando que lo contiene.
//! - [`Expr::jumping()`] emite "código de saltos": una expresión
//!   booleana nunca materializa su valor, sino que transfiere el
//!   control a una de dos etiquetas. Cualquiera de ellas puede ser
//!   [`Target::Fall`], en cuyo caso no se emite salto alguno y el
//!   control continúa en la siguiente instrucción.
//! - [`Stmt::gen()`] recibe la etiqueta donde inicia la sentencia y
//!   la etiqueta a la cual debe llegar el control al completarse.
//!
//! Todas las etiquetas y temporales provienen de un mismo [`Emitter`],
//! el cual pertenece a una sola unidad de compilación.

use log::trace;
use std::io::{self, Write};

use crate::ir::{Instruction, Label, Operand, Test};

mod expr;
mod stmt;

pub use expr::{Access, Expr};
pub use stmt::{BreakTarget, Stmt};

/// Destino de un flujo de instrucciones.
pub trait Sink {
    fn push(&mut self, instruction: Instruction);
}

impl Sink for Vec<Instruction> {
    fn push(&mut self, instruction: Instruction) {
        Vec::push(self, instruction)
    }
}

/// Destino de un salto condicional.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Label(Label),

    /// No se emite salto; el control cae en la siguiente instrucción.
    Fall,
}

/// Contexto de emisión.
///
/// Lleva los contadores monotónicos de etiquetas y temporales.
pub struct Emitter<S: Sink> {
    sink: S,
    labels: u32,
    temps: u32,
    emitted: usize,
}

impl<S: Sink> Emitter<S> {
    pub fn new(sink: S) -> Self {
        Emitter {
            sink,
            labels: 0,
            temps: 0,
            emitted: 0,
        }
    }

    /// Reserva una etiqueta nueva.
    pub fn new_label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels)
    }

    /// Reserva un temporal nuevo.
    pub fn new_temp(&mut self) -> Operand {
        self.temps += 1;
        Operand::Temp(self.temps)
    }

    pub fn emit_label(&mut self, label: Label) {
        self.emit(Instruction::SetLabel(label));
    }

    pub fn emit(&mut self, instruction: Instruction) {
        trace!("{}", instruction);

        self.emitted += 1;
        self.sink.push(instruction);
    }

    /// Emite los saltos mínimos que llevan a `on_true` si `test` se
    /// cumple y a `on_false` si no.
    pub fn emit_jumps(&mut self, test: Test, on_true: Target, on_false: Target) {
        match (on_true, on_false) {
            (Target::Label(on_true), Target::Label(on_false)) => {
                self.emit(Instruction::Branch {
                    test,
                    when: true,
                    target: on_true,
                });

                self.emit(Instruction::Jump(on_false));
            }

            (Target::Label(target), Target::Fall) => self.emit(Instruction::Branch {
                test,
                when: true,
                target,
            }),

            (Target::Fall, Target::Label(target)) => self.emit(Instruction::Branch {
                test,
                when: false,
                target,
            }),

            (Target::Fall, Target::Fall) => (),
        }
    }

    /// Cantidad de etiquetas reservadas hasta el momento.
    pub fn labels(&self) -> u32 {
        self.labels
    }

    /// Cantidad de temporales reservados hasta el momento.
    pub fn temps(&self) -> u32 {
        self.temps
    }

    /// Cantidad de instrucciones emitidas, incluyendo etiquetas.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Escribe un listado textual de código de tres direcciones.
///
/// Cada etiqueta se escribe en línea, antes de la siguiente instrucción;
/// cada instrucción va indentada en su propia línea.
pub fn write<W: Write>(program: &[Instruction], output: &mut W) -> io::Result<()> {
    for instruction in program {
        match instruction {
            Instruction::SetLabel(label) => write!(output, "{}:", label)?,
            instruction => writeln!(output, "\t{}", instruction)?,
        }
    }

    writeln!(output)
}

#[cfg(test)]
mod tests;
