use lispy::PROMPT;
use lispy::SyntaxErrorKind;
use lispy::evaluator::Environment;
use lispy::interpreter::Interpreter;
use lispy::reader::{check_balance, tokenize};
use lispy::value::Value;
use log::debug;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Prompt shown while a form is still missing closing parentheses
const CONTINUATION_PROMPT: &str = "...   ";

/// Interactive loop: read a line, evaluate it, print each result.
///
/// Input whose parentheses are still open is buffered and completed by the
/// following lines. Errors are reported and the loop keeps going.
pub fn run() -> Result<(), ReadlineError> {
    println!("Lispy - a minimal Lisp interpreter");
    println!("Type :help for commands, or Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;
    let interp = Interpreter::new();
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(command);

                    match command {
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(interp.environment());
                            continue;
                        }
                        ":quit" | ":exit" => break,
                        _ => {}
                    }
                } else {
                    let _ = rl.add_history_entry(line.trim());
                    pending.push('\n');
                }
                pending.push_str(&line);

                if let Err(e) = check_balance(&tokenize(&pending))
                    && e.syntax_kind() == Some(SyntaxErrorKind::UnbalancedOpen)
                {
                    debug!("waiting for more input to close open parentheses");
                    continue;
                }

                let source = std::mem::take(&mut pending);
                if let Err(e) = interp.for_each_result(&source, |value| println!("{value}")) {
                    println!("Error: {e}");
                }
            }
            Err(ReadlineError::Interrupted) if !pending.is_empty() => {
                // Ctrl+C abandons a half-typed form
                pending.clear();
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+D     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  quote define lambda cond if delay force");
    println!();
    println!("Examples:");
    println!("  (define sq (lambda (x) (* x x)))");
    println!("  (sq 12)");
    println!("  (cond ((= 1 2) 10) (else 20))");
    println!("  (force (delay (display 1 2)))");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();
    for (name, value) in bindings {
        match value {
            Value::Primitive { .. } => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Primitives ({}):", builtins.len());
        // Columns of four
        for row in builtins.chunks(4) {
            for name in row {
                print!("  {name:<15}");
            }
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
