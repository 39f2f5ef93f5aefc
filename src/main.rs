use clap::{Arg, ArgAction, ArgMatches, Command, crate_name, crate_version, value_parser};
use clap_complete::Shell;
use core::fmt::{self, Display, Formatter};
use folders::{ast::Program, decode, encoder, error, eval, parser, span::Span, store};
use log::info;
use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

fn main() {
    if let Err(error) = run() {
        match error {
            Error::Clap(error) => {
                error.print().expect("error writing error");
                match error.kind() {
                    clap::error::ErrorKind::DisplayHelp
                    | clap::error::ErrorKind::DisplayVersion
                    | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        std::process::exit(0)
                    }
                    _ => std::process::exit(1),
                }
            }
            _ => {
                eprintln!("{error}");
                std::process::exit(1);
            }
        }
    }
}

fn cli() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Compile programs into folder trees and run them")
        .disable_help_subcommand(true)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("compile")
                .about("Compile a source file into a folder tree")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("source file"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("build")
                        .value_parser(value_parser!(PathBuf))
                        .help("output directory, replaced if it exists"),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("report how many folders were created"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a compiled folder tree")
                .arg(
                    Arg::new("tree")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("compiled folder tree"),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_parser(value_parser!(PathBuf))
                        .help("file to read program input from instead of stdin"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("Print the program stored in a folder tree")
                .arg(
                    Arg::new("tree")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("compiled folder tree"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

fn run() -> Result<()> {
    let matches = cli().try_get_matches()?;
    init_logger(&matches);

    match matches.subcommand() {
        Some(("compile", sub_matches)) => compile_cmd(
            required(sub_matches, "file")?,
            required(sub_matches, "output")?,
            sub_matches.get_flag("verbose"),
        ),
        Some(("run", sub_matches)) => run_cmd(
            required(sub_matches, "tree")?,
            sub_matches.get_one::<PathBuf>("input"),
        ),
        Some(("list", sub_matches)) => list_cmd(required(sub_matches, "tree")?),
        Some(("completions", sub_matches)) => {
            let shell = *sub_matches
                .get_one::<Shell>("shell")
                .ok_or_else(|| missing("shell"))?;
            clap_complete::generate(shell, &mut cli(), crate_name!(), &mut io::stdout());
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn init_logger(matches: &ArgMatches) {
    let verbose = matches
        .subcommand_matches("compile")
        .is_some_and(|sub_matches| sub_matches.get_flag("verbose"));
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a PathBuf> {
    matches.get_one::<PathBuf>(id).ok_or_else(|| missing(id))
}

fn missing(id: &str) -> Error {
    Error::Clap(clap::Error::raw(
        clap::error::ErrorKind::MissingRequiredArgument,
        format!("missing argument '{id}'\n"),
    ))
}

#[derive(Debug)]
enum Error {
    Clap(clap::Error),
    Io(io::Error),
    Syntax(PathBuf, String, Box<parser::Error>),
    Folders(PathBuf, error::Error),
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<clap::Error> for Error {
    fn from(value: clap::Error) -> Self {
        Error::Clap(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Error::Clap(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::Syntax(filename, source, err) => {
                write_message(f, filename, err.span(), &err.to_string())?;
                write_lines(f, source, err.span())
            }
            Error::Folders(path, err) => write!(f, "{}: {err}", path.display()),
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

fn compile_cmd(source_path: &Path, output: &Path, verbose: bool) -> Result<()> {
    let contents = fs::read_to_string(source_path)?;
    let program = match parser::parse(&contents) {
        Ok(program) => program,
        Err(err) => {
            return Err(Error::Syntax(
                source_path.to_path_buf(),
                contents,
                Box::new(err),
            ));
        }
    };

    let (ctr, root) = encoder::encode(&program);
    store::write(&ctr, root, output).map_err(|err| Error::Folders(output.into(), err))?;

    if verbose {
        let folders =
            store::count_folders(output).map_err(|err| Error::Folders(output.into(), err))?;
        println!("Program compiled to {folders} folders");
    }

    Ok(())
}

fn run_cmd(tree: &Path, input: Option<&PathBuf>) -> Result<()> {
    let (ctr, root) = store::read(tree).map_err(|err| Error::Folders(tree.into(), err))?;

    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            info!("reading program input from {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
        None => Box::new(io::stdin().lock()),
    };
    let io = eval::StreamIo::new(reader, io::stdout().lock());

    eval::execute(&ctr, root, io).map_err(|err| Error::Folders(tree.into(), err))?;
    Ok(())
}

fn list_cmd(tree: &Path) -> Result<()> {
    let (ctr, root) = store::read(tree).map_err(|err| Error::Folders(tree.into(), err))?;
    let program =
        decode::decode_program(&ctr, root).map_err(|err| Error::Folders(tree.into(), err))?;
    print!("{}", Program(&program));
    Ok(())
}

fn write_message(f: &mut Formatter, filename: &Path, span: Span, message: &str) -> fmt::Result {
    writeln!(
        f,
        "{}:{}:{}: {}",
        filename.display(),
        span.start.line,
        span.start.column,
        message
    )
}

fn write_lines(f: &mut Formatter, source: &str, span: Span) -> fmt::Result {
    let Some(line) = source.lines().nth(span.start.line.saturating_sub(1)) else {
        return Ok(());
    };
    let width = if span.end.line == span.start.line {
        span.start.column.abs_diff(span.end.column) + 1
    } else {
        line.chars().count().saturating_sub(span.start.column) + 1
    };

    writeln!(f, "     | ")?;
    writeln!(f, "{:4} | {}", span.start.line, line)?;
    writeln!(
        f,
        "     | {}{}",
        " ".repeat(span.start.column.saturating_sub(1)),
        "^".repeat(width)
    )
}
