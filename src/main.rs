//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases de la traducción y
//! expone una CLI.

use anyhow::{self, Context};
use bitflags::bitflags;
use clap::{crate_version, Arg, Command};
use smallc::{
    codegen::{self, Emitter},
    error::Diagnostics,
    lex::{Lexer, LexerError, Token},
    parse,
    source::{self, Located},
};

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};

bitflags! {
    /// Representaciones intermedias que se vuelcan a stderr.
    struct Dump: u32 {
        /// Flujo de tokens, antes del parsing.
        const TOKENS = 0x01;

        /// Árbol de sentencias, antes de generar código.
        const TREE = 0x02;
    }
}

type Tokens = Box<dyn Iterator<Item = Result<Located<Token>, Located<LexerError>>>>;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parsing de CLI
    let args = Command::new("smallc")
        .version(crate_version!())
        .about("Translates a block-structured program to three-address code")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .default_value("-")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .help("Write the listing to FILE instead of stdout"),
        )
        .arg(
            Arg::new("dump-tokens")
                .long("dump-tokens")
                .help("Print the token stream to stderr"),
        )
        .arg(
            Arg::new("dump-tree")
                .long("dump-tree")
                .help("Print the statement tree to stderr"),
        )
        .get_matches();

    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output");

    let mut dump = Dump::empty();
    if args.is_present("dump-tokens") {
        dump |= Dump::TOKENS;
    }

    if args.is_present("dump-tree") {
        dump |= Dump::TREE;
    }

    let reader: Box<dyn BufRead> = match input {
        "-" => Box::new(BufReader::new(io::stdin())),
        path => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            Box::new(BufReader::new(file))
        }
    };

    let name = match input {
        "-" => String::from("<stdin>"),
        path => String::from(path),
    };

    let (start, stream) = source::consume(reader, name);
    let lexer = Lexer::new(start.clone(), stream);

    let tokens: Tokens = if dump.contains(Dump::TOKENS) {
        let tokens: Vec<_> = lexer.collect();
        for token in tokens.iter().flatten() {
            eprintln!("{}: {}", token.location(), token.val());
        }

        Box::new(tokens.into_iter())
    } else {
        Box::new(lexer)
    };

    let unit = match parse::parse(tokens, start) {
        Ok(unit) => unit,
        Err(error) => {
            eprint!("{}", Diagnostics::from(error));
            std::process::exit(1);
        }
    };

    if dump.contains(Dump::TREE) {
        eprintln!("{:#?}", unit.body());
    }

    let mut emitter = Emitter::new(Vec::new());
    unit.gen(&mut emitter);
    let program = emitter.into_sink();

    match output {
        None | Some("-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            codegen::write(&program, &mut stdout).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }

        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            codegen::write(&program, &mut file)
                .with_context(|| format!("Failed to write to file: {}", path))?;
        }
    }

    Ok(())
}
