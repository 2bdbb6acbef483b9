use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal, ValidationResult, Validator};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use cellscheme::interpreter::{parse_code, Interpreter};
use cellscheme::reader::lexer::{ends_inside_string, tokenize, Token};

#[derive(Parser, Debug)]
#[command(name = "cellscheme", version, about = "A small Scheme interpreter with proper tail calls")]
struct Args {
    /// Source files, run in order in one shared environment
    files: Vec<PathBuf>,

    /// Evaluate an expression and print its results
    #[arg(short, long)]
    eval: Option<String>,

    /// Print the parse tree as JSON instead of evaluating
    #[arg(long)]
    ast: bool,

    #[arg(long, env = "CELLSCHEME_LOG", default_value = "warn")]
    log_level: String,

    /// Write logs to a daily rolled file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // reedline logs through `log`
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_timer(ChronoLocal::rfc_3339());
    match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "cellscheme.log"));
            let _ = tracing::subscriber::set_global_default(builder.with_writer(writer).with_ansi(false).finish());
            Some(guard)
        }
        None => {
            let _ = tracing::subscriber::set_global_default(builder.with_writer(io::stderr).finish());
            None
        }
    }
}

/// Keeps reading lines while parentheses are open or a string is unterminated.
/// Other lexical errors are complete input, so evaluation reports them.
struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(_) if ends_inside_string(line) => return ValidationResult::Incomplete,
            Err(_) => return ValidationResult::Complete,
        };
        let depth = tokens.iter().fold(0i64, |depth, token| match token {
            Token::LParen => depth + 1,
            Token::RParen => depth - 1,
            _ => depth,
        });
        if depth > 0 {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

fn print_ast(src: &str) -> bool {
    let nodes = match parse_code(src) {
        Ok(nodes) => nodes,
        Err(err) => {
            eprintln!("error: {}", err);
            return false;
        }
    };
    match serde_json::to_string_pretty(&nodes) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(err) => {
            eprintln!("error: {}", err);
            false
        }
    }
}

// false if anything failed; with `echo`, non-empty results are printed
fn run_source(interpreter: &mut Interpreter, src: &str, echo: bool) -> bool {
    let results = match interpreter.execute(src) {
        Ok(results) => results,
        Err(err) => {
            eprintln!("error: {}", err);
            return false;
        }
    };
    let mut ok = true;
    for result in results {
        match result {
            Ok(val) if echo && !val.is_empty() => println!("{}", val),
            Ok(_) => {}
            Err(err) => {
                eprintln!("error: {}", err);
                ok = false;
            }
        }
    }
    ok
}

fn run_file(interpreter: &mut Interpreter, path: &Path, ast: bool) -> bool {
    info!("running {}", path.display());
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("error: {}: {}", path.display(), err);
            return false;
        }
    };
    if ast {
        print_ast(&src)
    } else {
        run_source(interpreter, &src, false)
    }
}

fn repl(interpreter: &mut Interpreter, ast: bool) {
    let mut line_editor = Reedline::create().with_validator(Box::new(ParenValidator));
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("cellscheme".to_string()), DefaultPromptSegment::Empty);

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                if buffer.trim().is_empty() {
                    continue;
                }
                if ast {
                    print_ast(&buffer);
                    continue;
                }
                match interpreter.execute(&buffer) {
                    Ok(results) => {
                        for result in results {
                            match result {
                                Ok(val) if val.is_empty() => {}
                                Ok(val) => println!("=> {}", val),
                                Err(err) => println!("error: {}", err),
                            }
                        }
                    }
                    Err(err) => println!("error: {}", err),
                }
            }
            Ok(Signal::CtrlD) => break,
            Ok(_) => continue,
            Err(err) => {
                error!("line editor failed: {}", err);
                break;
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = init_logging(&args.log_level, args.log_dir.as_deref());

    let mut interpreter = Interpreter::new();
    let mut ok = true;
    for path in &args.files {
        ok &= run_file(&mut interpreter, path, args.ast);
    }
    if let Some(ref src) = args.eval {
        ok &= if args.ast { print_ast(src) } else { run_source(&mut interpreter, src, true) };
    }
    if args.files.is_empty() && args.eval.is_none() {
        repl(&mut interpreter, args.ast);
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
