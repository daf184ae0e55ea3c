use simdex::{Index, IndexKind, Metric, SearchOptions, DEFAULT_TOP_K};
use std::env;
use std::io::{self, Write};

pub enum Command {
    New { kind: IndexKind, metric: Metric },
    Insert { id: String, vec: Vec<f32> },
    Search { vec: Vec<f32>, k: usize, num_probe: usize },
    Train { num_clusters: usize },
    Get { position: usize },
    Count,
    Stats,
    Save { path: String },
    Load { path: String },
}

/// Parse a command from a provided argument vector
/// This is used both for command-line args and REPL input
pub fn parse_command_from_args(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command provided. Use: new, insert, search, train, get, count, stats, save, load".to_string());
    }

    let command = &args[1];

    match command.as_str() {
        "new" => parse_new(args),
        "insert" => parse_insert(args),
        "search" => parse_search(args),
        "train" => parse_train(args),
        "get" => parse_get(args),
        "count" => parse_count(args),
        "stats" => parse_stats(args),
        "save" => parse_save(args),
        "load" => parse_load(args),
        _ => Err(format!("Unknown command: {}. Available: new, insert, search, train, get, count, stats, save, load", command)),
    }
}

/// Parse the 'new' command
/// Usage: simdex new <flat|clustered> [l2|cosine]
fn parse_new(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'new' command requires an index kind. Usage: simdex new <flat|clustered> [l2|cosine]".to_string());
    }

    let kind = match args[2].as_str() {
        "flat" => IndexKind::Flat,
        "clustered" => IndexKind::Clustered,
        other => return Err(format!("Unknown index kind: '{}'. Use 'flat' or 'clustered'", other)),
    };

    let metric = match args.get(3).map(|s| s.as_str()) {
        None | Some("l2") => Metric::SquaredL2,
        Some("cosine") | Some("ip") => Metric::InnerProduct,
        Some(other) => return Err(format!("Unknown metric: '{}'. Use 'l2' or 'cosine'", other)),
    };

    Ok(Command::New { kind, metric })
}

/// Parse the 'insert' command
/// Usage: simdex insert <id> <vector>
fn parse_insert(args: &[String]) -> Result<Command, String> {
    // args[0] = program name
    // args[1] = "insert"
    // args[2] = id (required)
    // args[3..] = vector (required, at least 1)
    if args.len() < 4 {
        return Err("'insert' command requires an ID and a vector. Usage: simdex insert <id> <vector>".to_string());
    }

    let id = args[2].clone();
    let vec: Result<Vec<f32>, _> = args[3..].iter()
        .map(|s| s.parse::<f32>())
        .collect();

    match vec {
        Ok(v) => Ok(Command::Insert { id, vec: v }),
        Err(_) => Err("Vector parsing error".to_string()),
    }
}

/// Parse the 'search' command
/// Usage: simdex search <v1> <v2> ... [--k <number>] [--probe <number>]
fn parse_search(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'search' command requires at least one vector component. Usage: simdex search <v1> <v2> ... [--k N] [--probe N]".to_string());
    }

    let mut k = DEFAULT_TOP_K;
    let mut num_probe = 1;
    let mut vec = Vec::new();

    let mut iter = args[2..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--k" => {
                let value = iter.next().ok_or("--k requires a value")?;
                k = value.parse::<usize>()
                    .map_err(|_| format!("Invalid --k value: '{}'. Must be a positive integer.", value))?;
            }
            "--probe" => {
                let value = iter.next().ok_or("--probe requires a value")?;
                num_probe = value.parse::<usize>()
                    .map_err(|_| format!("Invalid --probe value: '{}'. Must be a positive integer.", value))?;
            }
            component => {
                let parsed = component.parse::<f32>()
                    .map_err(|_| format!("Failed to parse vector component '{}'", component))?;
                vec.push(parsed);
            }
        }
    }

    if vec.is_empty() {
        return Err("Search vector cannot be empty".to_string());
    }

    Ok(Command::Search { vec, k, num_probe })
}

/// Parse the 'train' command
/// Usage: simdex train <num_clusters>
fn parse_train(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'train' command requires a cluster count. Usage: simdex train <num_clusters>".to_string());
    }

    match args[2].parse::<usize>() {
        Ok(num_clusters) => Ok(Command::Train { num_clusters }),
        Err(_) => Err(format!("Invalid cluster count: '{}'", args[2])),
    }
}

/// Parse the 'get' command
/// Usage: simdex get <position>
fn parse_get(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'get' command requires a position. Usage: simdex get <position>".to_string());
    }

    match args[2].parse::<usize>() {
        Ok(position) => Ok(Command::Get { position }),
        Err(_) => Err(format!("Invalid position: '{}'", args[2])),
    }
}

/// Parse the 'count' command
/// Usage: simdex count
fn parse_count(args: &[String]) -> Result<Command, String> {
    // Count takes no arguments
    if args.len() > 2 {
        eprintln!("Warning: 'count' command takes no arguments, ignoring extras");
    }

    Ok(Command::Count)
}

/// Parse the 'stats' command
/// Usage: simdex stats
fn parse_stats(args: &[String]) -> Result<Command, String> {
    if args.len() > 2 {
        eprintln!("Warning: 'stats' command takes no arguments, ignoring extras");
    }

    Ok(Command::Stats)
}

/// Parse the 'save' command
/// Usage: simdex save <path>
fn parse_save(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'save' command requires a file path. Usage: save <path>".to_string());
    }
    let path = args[2].clone();
    Ok(Command::Save { path })
}

/// Parse the 'load' command
/// Usage: simdex load <path>
fn parse_load(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'load' command requires a file path. Usage: load <path>".to_string());
    }
    let path = args[2].clone();
    Ok(Command::Load { path })
}

/// REPL mode - interactive session with a persistent in-memory index
pub fn run_repl(index: &mut Index) {
    println!("simdex - Embedding Similarity Index");
    println!("Type 'help' for commands, 'exit' or 'quit' to quit\n");

    loop {
        print!("simdex> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => {}
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                continue;
            }
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

        let mut args: Vec<String> = vec!["simdex".to_string()];
        args.extend(input.split_whitespace().map(|s| s.to_string()));

        let command = match parse_command_from_args(&args) {
            Ok(cmd) => cmd,
            Err(error) => {
                eprintln!("Error: {}", error);
                continue;
            }
        };

        execute_command(index, command);
    }
}

/// Single-command mode - load index from path, execute command, save back
/// Usage: simdex <index_path> <command> [args...]
pub fn run_single_command() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: simdex <index_path> <command> [args...]");
        std::process::exit(1);
    }

    let index_path = &args[1];

    // Load existing index or create a new flat one
    let mut index = if std::path::Path::new(index_path).exists() {
        match Index::load(index_path) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("Error loading '{}': {}", index_path, e);
                std::process::exit(1);
            }
        }
    } else {
        Index::new(IndexKind::Flat, Metric::SquaredL2)
    };

    // Rebuild args: shift so args[1] becomes the command
    let shifted_args: Vec<String> = std::iter::once(args[0].clone())
        .chain(args[2..].iter().cloned())
        .collect();

    let command = match parse_command_from_args(&shifted_args) {
        Ok(cmd) => cmd,
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    };

    execute_command(&mut index, command);

    // Save index back to path
    if let Err(e) = index.save(index_path) {
        eprintln!("Error saving '{}': {}", index_path, e);
        std::process::exit(1);
    }
}

fn execute_command(index: &mut Index, command: Command) {
    match command {
        Command::New { kind, metric } => {
            *index = Index::new(kind, metric);
            println!("Created empty {:?} index ({:?})", kind, metric);
        }

        Command::Insert { id, vec } => {
            match index.append(id.clone(), vec) {
                Ok(()) => println!("Appended vector with id: {}", id),
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Search { vec, k, num_probe } => {
            let options = SearchOptions { k, num_probe };
            match index.search(&vec, &options) {
                Ok(results) => {
                    if results.is_empty() {
                        println!("No results found");
                    } else {
                        println!("Top {} results:", results.len());
                        for (rank, neighbor) in results.iter().enumerate() {
                            println!("{}. ID: {}, Distance: {:.4}",
                                rank + 1, neighbor.identifier, neighbor.distance);
                        }
                    }
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Train { num_clusters } => {
            match index {
                Index::Clustered(clustered) => {
                    match clustered.train(num_clusters).and_then(|()| clustered.add()) {
                        Ok(()) => println!("Trained {} clusters over {} vectors", num_clusters, clustered.len()),
                        Err(error) => eprintln!("Error: {}", error),
                    }
                }
                Index::Flat(_) => eprintln!("Error: flat index does not need training"),
            }
        }

        Command::Get { position } => {
            match index.get(position) {
                Ok((embedding, id)) => println!("{}: {:?}", id, embedding),
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Count => println!("{}", index.len()),

        Command::Stats => {
            println!("kind: {:?}", index.kind());
            println!("metric: {:?}", index.metric());
            println!("count: {}", index.len());
            match index.dimension() {
                Some(dim) => println!("dimension: {}", dim),
                None => println!("dimension: (unset)"),
            }
            println!("trained: {}", index.is_trained());
        }

        Command::Save { path } => {
            match index.save(&path) {
                Ok(()) => println!("Index saved to '{}'", path),
                Err(error) => eprintln!("Error: {}", error),
            }
        }

        Command::Load { path } => {
            match Index::load(&path) {
                Ok(loaded) => {
                    let count = loaded.len();
                    *index = loaded;
                    println!("Index loaded from '{}' ({} vectors)", path, count);
                }
                Err(error) => eprintln!("Error: {}", error),
            }
        }
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  new <flat|clustered> [l2|cosine]        - Reset to an empty index");
    println!("  insert <id> <v1> <v2> ...               - Append an embedding");
    println!("  search <v1> <v2> ... [--k N] [--probe N] - Top-k similarity search (default k=5)");
    println!("  train <num_clusters>                    - Train a clustered index");
    println!("  get <position>                          - Show the entry at a position");
    println!("  count                                   - Show vector count");
    println!("  stats                                   - Show index metadata");
    println!("  save <path>                             - Save index to file");
    println!("  load <path>                             - Load index from file");
    println!("  help                                    - Show this help");
    println!("  exit, quit                              - Exit the program");
}
