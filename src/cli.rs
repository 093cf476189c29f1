use std::io::{self, Write};
use facematch::FaceDB;

/// Upper bound for `match --k_top`
pub const MAX_K_TOP: usize = 1000;

#[derive(Debug, PartialEq)]
pub enum Command {
    Register { label: String, vec: Vec<f32> },
    Match { vec: Vec<f32>, k_top: usize },
    Count,
    Status,
}

/// Parse a command from one whitespace-split REPL line
pub fn parse_command(args: &[String]) -> Result<Command, String> {
    let Some(command) = args.first() else {
        return Err("No command provided. Use: register, match, count, status".to_string());
    };

    match command.as_str() {
        "register" => parse_register(args),
        "match" => parse_match(args),
        "count" => Ok(Command::Count),
        "status" => Ok(Command::Status),
        _ => Err(format!("Unknown command: {}. Available: register, match, count, status", command)),
    }
}

/// Parse the 'register' command
/// Usage: register <label> <v1> <v2> ...
fn parse_register(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'register' requires a label and an embedding. Usage: register <label> <v1> <v2> ...".to_string());
    }

    let label = args[1].clone();
    let vec = parse_vector(&args[2..])?;

    Ok(Command::Register { label, vec })
}

/// Parse the 'match' command
/// Usage: match <v1> <v2> ... [--k_top <number>]
/// k_top must lie in 1..=MAX_K_TOP
fn parse_match(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("'match' requires at least one embedding component. Usage: match <v1> <v2> ... [--k_top <number>]".to_string());
    }

    let mut k_top = 1;
    let mut vector_end = args.len();

    // Trailing "--k_top N"
    if args.len() >= 3 && args[args.len() - 2] == "--k_top" {
        match args[args.len() - 1].parse::<usize>() {
            Ok(k) if (1..=MAX_K_TOP).contains(&k) => {
                k_top = k;
                vector_end = args.len() - 2;
            }
            _ => {
                return Err(format!("Invalid --k_top value: '{}'. Must be an integer between 1 and {}.", args[args.len() - 1], MAX_K_TOP));
            }
        }
    }

    let vec = parse_vector(&args[1..vector_end])?;
    if vec.is_empty() {
        return Err("Match embedding cannot be empty".to_string());
    }

    Ok(Command::Match { vec, k_top })
}

fn parse_vector(parts: &[String]) -> Result<Vec<f32>, String> {
    parts.iter()
        .map(|s| s.parse::<f32>().map_err(|_| format!("Failed to parse '{}' as a number", s)))
        .collect()
}

/// REPL mode - interactive session against an in-process database
pub fn run_repl(db: &FaceDB) -> io::Result<()> {
    println!("facematch - face identity index");
    println!("Type 'help' for commands, 'exit' or 'quit' to quit\n");

    let stdin = io::stdin();
    loop {
        print!("facematch> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            println!("Goodbye!");
            break;
        }

        if input == "help" {
            print_help();
            continue;
        }

        let args: Vec<String> = input.split_whitespace().map(|s| s.to_string()).collect();

        match parse_command(&args) {
            Ok(command) => println!("{}", execute_command(db, command)),
            Err(error) => eprintln!("Error: {}", error),
        }
    }

    Ok(())
}

/// Runs one command and renders its outcome, errors included
pub fn execute_command(db: &FaceDB, command: Command) -> String {
    match command {
        Command::Count => db.count().to_string(),

        Command::Status => {
            let status = db.status();
            let dimension = status.dimension.map_or("unset".to_string(), |d| d.to_string());
            format!("faces: {}, identities: {}, dimension: {}",
                status.faces, status.unique_identities, dimension)
        }

        Command::Register { label, vec } => {
            match db.register(label, &vec) {
                Ok(reg) => format!("Registered '{}' at row {}", reg.label, reg.row),
                Err(error) => format!("Error: {}", error),
            }
        }

        Command::Match { vec, k_top } => {
            match db.search(&vec, k_top) {
                Ok(results) => {
                    let mut out = format!("Top {} results:", results.len());
                    for (rank, m) in results.iter().enumerate() {
                        out.push_str(&format!("\n{}. {} (row {}), score: {:.4}", rank + 1, m.label, m.row, m.score));
                    }
                    out
                }
                Err(error) => format!("Error: {}", error),
            }
        }
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  register <label> <v1> <v2> ...   - Register an embedding under a label");
    println!("  match <v1> <v2> ... [--k_top N]  - Best matches for an embedding (default k=1)");
    println!("  count                            - Show face count");
    println!("  status                           - Show face count, identities and dimension");
    println!("  help                             - Show this help");
    println!("  exit, quit                       - Exit the program");
}
