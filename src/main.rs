use std::{fs, process};

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rustyline::{error::ReadlineError, Editor};

use eldr::{lexer::Lexer, Config, Outcome, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn read_file(filename: &str) -> anyhow::Result<String> {
    fs::read_to_string(filename).with_context(|| format!("problem reading file: {}", filename))
}

fn report(outcome: &Outcome) {
    let text = outcome.to_string();
    if text.is_empty() {
        return;
    }

    match outcome {
        Outcome::Value(_) => println!("{}", text),
        _ => eprintln!("{}", text),
    }
}

fn repl(config: Config, quiet: bool) -> anyhow::Result<()> {
    let mut rl = Editor::<()>::new()?;
    let mut session = Session::with_config(config);
    let mut buffer = String::new();

    if !quiet {
        println!("Eldr ({})", VERSION);
        println!("Statements run once a line contains ';'. Type 'exit' to quit.");
    }

    loop {
        let prompt = if buffer.is_empty() { ">> " } else { ".. " };
        match rl.readline(prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str());

                if buffer.is_empty() {
                    match line.trim() {
                        "exit" => break,
                        "clear" => {
                            print!("\x1B[2J\x1B[1;1H");
                            continue;
                        }
                        _ => {}
                    }
                }

                buffer.push_str(&line);
                buffer.push('\n');
                if !line.contains(';') {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                report(&session.run(&source));
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn config_from(matches: &ArgMatches) -> Config {
    let mut config = Config::default();
    if let Some(namespace) = matches.get_one::<String>("namespace") {
        config.namespace = namespace.clone();
    }
    if let Some(depth) = matches.get_one::<usize>("max-call-depth") {
        config.max_call_depth = *depth;
    }
    config
}

fn file_arg(about: &'static str) -> Arg {
    Arg::new("file").help(about).required(true)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = Command::new("eldr")
        .version(VERSION)
        .about("Interpreter for the Eldr language")
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .global(true)
                .help("Namespace parsed packages are tagged with"),
        )
        .arg(
            Arg::new("max-call-depth")
                .long("max-call-depth")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Nested function calls allowed before evaluation stops"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Don't print the REPL banner"),
        )
        .subcommand(
            Command::new("run")
                .about("Execute an Eldr program")
                .arg(file_arg("The file to run")),
        )
        .subcommand(
            Command::new("ast")
                .about("Print the parsed program in canonical form")
                .arg(file_arg("The file to parse")),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the token stream of a file")
                .arg(file_arg("The file to lex")),
        )
        .get_matches();

    let config = config_from(&app);

    let (command, subcommand) = match app.subcommand() {
        Some(found) => found,
        None => return repl(config, app.get_flag("quiet")),
    };

    let filename = subcommand
        .get_one::<String>("file")
        .context("missing file argument")?;
    let source = read_file(filename)?;

    match command {
        "run" => {
            let outcome = Session::with_config(config).run(&source);
            report(&outcome);
            if outcome.errors().is_some() {
                process::exit(1);
            }
        }
        "ast" => {
            let (package, errors) = eldr::parser::parse_package(&source, &config.namespace);
            if !errors.is_empty() {
                eprint!("{}", errors);
                process::exit(1);
            }
            print!("{}", package);
        }
        "tokens" => {
            for token in Lexer::new(&source).lex() {
                println!("{}\t{:?}\t{:?}", token.line, token.kind, token.literal);
            }
        }
        _ => unreachable!(),
    }

    Ok(())
}
