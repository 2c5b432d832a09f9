use argh::FromArgs;
use fancyline::{
    config::{self, BackendKind, Config},
    helper,
    install::{self, Installer},
    value::{self, Evaluator, Namespace, Value},
};
use log::warn;
use rustyline::error::ReadlineError;
use simplelog::WriteLogger;
use std::{
    cell::RefCell,
    env, fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    process,
    rc::Rc,
};

#[derive(FromArgs, PartialEq, Debug)]
/// An interactive REPL with tab completions colorized by value type.
struct Args {
    /// write debug logs to this file
    #[argh(option)]
    log_file: Option<String>,

    #[argh(subcommand)]
    command: Option<Command>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Command {
    Install(InstallArgs),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Write the startup script and print the environment variable to export.
#[argh(subcommand, name = "install")]
struct InstallArgs {
    /// overwrite an existing startup script
    #[argh(switch)]
    force: bool,

    /// directory to install into (defaults to the home directory)
    #[argh(option)]
    dir: Option<String>,
}

fn main() -> Result<(), io::Error> {
    let args: Args = argh::from_env();
    if let Some(log_file) = &args.log_file {
        let file = fs::File::create(log_file)?;
        if let Err(err) = WriteLogger::init(
            log::LevelFilter::Debug,
            simplelog::Config::default(),
            file,
        ) {
            eprintln!("logging disabled: {}", err);
        }
    }
    match args.command {
        Some(Command::Install(install_args)) => {
            let dir = match install_args.dir {
                Some(dir) => PathBuf::from(dir),
                None => match directories::BaseDirs::new() {
                    Some(dirs) => dirs.home_dir().to_path_buf(),
                    None => {
                        eprintln!("no home directory, pass --dir");
                        process::exit(1);
                    }
                },
            };
            let installer = Installer::new(dir, install_args.force);
            process::exit(if installer.install() { 0 } else { 1 });
        }
        None => run_repl(),
    }
}

fn run_repl() -> Result<(), io::Error> {
    let (settings, backend) = Config::load().resolve();
    let settings = Rc::new(settings);
    let namespace = Rc::new(RefCell::new(value::builtins()));
    let evaluator = Evaluator::new();
    run_startup_script(&evaluator, &namespace);
    match backend.kind {
        BackendKind::Fancy => run_fancy(settings, namespace, &evaluator),
        BackendKind::Plain => run_plain(namespace, &evaluator),
    }
}

fn run_startup_script(evaluator: &Evaluator, namespace: &RefCell<Namespace>) {
    let path = match env::var(install::ENV_VAR) {
        Ok(path) if !path.is_empty() => path,
        _ => return,
    };
    match fs::read_to_string(&path) {
        Ok(script) => {
            for line in script.lines() {
                execute(evaluator, namespace, line, true);
            }
        }
        Err(err) => warn!("could not read startup script {}: {}", path, err),
    }
}

fn run_fancy(
    settings: Rc<config::Settings>,
    namespace: Rc<RefCell<Namespace>>,
    evaluator: &Evaluator,
) -> Result<(), io::Error> {
    let mut editor = helper::setup(settings, namespace.clone());
    loop {
        match editor.readline(">>> ") {
            Ok(line) => execute(evaluator, &namespace, &line, false),
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {}", err);
                break;
            }
        }
    }
    if let Some(path) = config::history_path() {
        let _ = editor.save_history(&path);
    }
    Ok(())
}

fn run_plain(namespace: Rc<RefCell<Namespace>>, evaluator: &Evaluator) -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!(">>> ");
        io::stdout().flush()?;
        match lines.next() {
            Some(line) => execute(evaluator, &namespace, &line?, false),
            None => break,
        }
    }
    Ok(())
}

/// One statement: assignment, import, del, or a bare expression. `quiet`
/// suppresses expression output (startup scripts), never errors.
fn execute(evaluator: &Evaluator, namespace: &RefCell<Namespace>, line: &str, quiet: bool) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }
    if let Some(name) = line.strip_prefix("import ") {
        let name = name.trim();
        match value::find_module(name) {
            Some(module) => namespace.borrow_mut().insert(name, Value::Module(module)),
            None => eprintln!("no module named '{}'", name),
        }
        return;
    }
    if let Some(name) = line.strip_prefix("del ") {
        let name = name.trim();
        if namespace.borrow_mut().remove(name).is_none() {
            eprintln!("name '{}' is not defined", name);
        }
        return;
    }
    if let Some((name, expr)) = split_assignment(line) {
        let value = match serde_json::from_str::<serde_json::Value>(expr) {
            Ok(json) => Ok(Value::from_json(&json)),
            Err(_) => evaluator.eval(&namespace.borrow(), expr),
        };
        match value {
            Ok(value) => namespace.borrow_mut().insert(name, value),
            Err(err) => eprintln!("{}", err),
        }
        return;
    }
    match evaluator.eval(&namespace.borrow(), line) {
        Ok(value) => {
            if !quiet {
                println!("{}", value.repr());
            }
        }
        Err(err) => eprintln!("{}", err),
    }
}

/// `name = expr`, but not `==`. Left side must be a plain identifier.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=')?;
    if line[eq + 1..].starts_with('=') {
        return None;
    }
    let (name, expr) = (line[..eq].trim(), line[eq + 1..].trim());
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, expr))
}
