//! Front end de un lenguaje pequeño estructurado por bloques.
//!
//! # Fases
//! Cada programa deriva de un único archivo de código fuente, el cual
//! se somete a análisis léxico en [`lex`] para obtener un flujo de
//! tokens. El parser en [`parse`] consume ese flujo en una sola pasada,
//! consultando en [`semantic`] la tabla de símbolos y verificando tipos
//! ([`types`]) a medida que construye cada nodo.
//!
//! # Traducción
//! Los nodos construidos se traducen en [`codegen`] a código de tres
//! direcciones ([`ir`]) en el cual las expresiones booleanas se
//! expresan como saltos y nunca como valores, excepto cuando se asignan.
//!
//! Cualquier error es fatal y se reporta por medio de [`error`].

pub mod codegen;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod source;
pub mod types;
