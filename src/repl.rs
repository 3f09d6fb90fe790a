use crate::environment::Context;
use crate::evaluator;
use std::io::{self, Write};

static PROMPT: &str = ">> ";

/// Read expressions from stdin one line at a time and evaluate them
/// against a single long-lived context, so assignments and definitions
/// carry over between lines.
pub fn start() {
    let mut ctx = Context::new();
    loop {
        print!("{}", PROMPT);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }

        match evaluator::run(&line, &mut ctx) {
            Ok(value) => println!("{}", value.repr()),
            Err(err) => println!("ERROR: {}", err),
        }
    }
}
