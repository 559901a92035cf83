//! Perft CLI: drive the move generator from a stockfish-like prompt.
//!
//! Commands: `position startpos|fen <...> [moves ...]`, `perft N`,
//! `divide N`, `d`, `help`, `quit`.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use peregrine::board::Board;
use peregrine::perft::{divide, perft};

fn print_help() {
    println!(
        "Commands:\n\
         \x20 position startpos [moves ...]\n\
         \x20 position fen <FEN...> [moves ...]\n\
         \x20 perft <N>\n\
         \x20 divide <N>\n\
         \x20 d              (prints board + fen)\n\
         \x20 help\n\
         \x20 quit"
    );
}

fn apply_moves(board: &mut Board, tokens: &[&str]) {
    for uci in tokens {
        if board.make_uci_move(uci).is_none() {
            println!("Illegal move: {uci}");
            break;
        }
    }
}

fn handle_position(board: &mut Board, args: &[&str]) {
    match args.first() {
        Some(&"startpos") => {
            *board = Board::new();
            let rest = &args[1..];
            if rest.first() == Some(&"moves") {
                apply_moves(board, &rest[1..]);
            }
            println!("ok");
        }
        Some(&"fen") if args.len() >= 5 => {
            let fen_fields = args[1..].iter().take_while(|t| **t != "moves").count();
            let fen = args[1..=fen_fields].join(" ");
            match Board::from_fen(&fen) {
                Ok(parsed) => {
                    *board = parsed;
                    let rest = &args[1 + fen_fields..];
                    if rest.first() == Some(&"moves") {
                        apply_moves(board, &rest[1..]);
                    }
                    println!("ok");
                }
                Err(err) => println!("error: {err}"),
            }
        }
        _ => println!("error: expected startpos or fen"),
    }
}

fn main() {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let mut board = Board::new();

    println!("peregrine perft CLI");
    print_help();

    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush().expect("flush stdout");

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = tokens.first() else { continue };

        match cmd {
            "quit" | "exit" => break,
            "help" => print_help(),
            "d" => board.print(),
            "position" => handle_position(&mut board, &tokens[1..]),
            "perft" => {
                let Some(depth) = tokens.get(1).and_then(|t| t.parse::<u32>().ok()) else {
                    println!("error: depth must be >= 0");
                    continue;
                };
                // Run on a copy so the CLI position stays put.
                let mut scratch = board.clone();
                let start = Instant::now();
                let counts = perft(&mut scratch, depth);
                let elapsed = start.elapsed();
                println!(
                    "Nodes: {}  Captures: {}  Checks: {}  Mates: {}  Time: {:.1} ms",
                    counts.nodes,
                    counts.captures,
                    counts.checks,
                    counts.mates,
                    elapsed.as_secs_f64() * 1000.0
                );
            }
            "divide" => {
                let Some(depth) = tokens.get(1).and_then(|t| t.parse::<u32>().ok()) else {
                    println!("error: depth must be >= 1");
                    continue;
                };
                if depth == 0 {
                    println!("error: depth must be >= 1");
                    continue;
                }
                let mut scratch = board.clone();
                let lines = divide(&mut scratch, depth);
                let mut total = 0;
                for line in &lines {
                    println!("{}: {}", line.uci, line.nodes);
                    total += line.nodes;
                }
                println!("\nNodes searched: {total}");
            }
            _ => println!("error: unknown command '{cmd}' (try help)"),
        }
    }
}
