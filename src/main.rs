mod repl;

use std::fs;
use std::process;

use clap::{Arg, Command};
use lispy::interpreter::Interpreter;
use log::info;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = Command::new("lispy")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A minimal Lisp interpreter")
        .arg(
            Arg::new("FILE")
                .help("Source file to run; starts an interactive session when omitted"),
        )
        .get_matches();

    match matches.get_one::<String>("FILE") {
        Some(path) => run_file(path),
        None => {
            if let Err(e) = repl::run() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

/// Evaluate every form in the file, printing each result that is not unspecified
fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("lispy: cannot read {path}: {e}");
            process::exit(1);
        }
    };
    info!("running {path} ({} bytes)", source.len());

    let interp = Interpreter::new();
    if let Err(e) = interp.for_each_result(&source, |value| println!("{value}")) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
