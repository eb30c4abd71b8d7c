mod output;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, LevelFilter};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use output::{data_table, slot_usage_table, stats_table, FormatStyle, Printer};
use slate_core::{compile, CompileOptions, CompileUnit, CompiledProgram, SlateErrorExt};

const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_IO: i32 = 2;

fn main() {
    let cli = Command::new("slate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lower typed programs to stack-machine assembly");

    let cli = setup_cli(cli);
    let matches = cli.get_matches();
    init_logging(matches.get_count("verbose"));
    let code = dispatch_commands(&matches);
    process::exit(code);
}

/// Sets up the CLI with subcommands and arguments.
fn setup_cli(cli: Command) -> Command {
    let unit_arg = || {
        Arg::new("file")
            .help("Compile unit (typed program + table) as JSON")
            .required(true)
            .index(1)
    };
    let config_arg = || {
        Arg::new("config")
            .help("Compile options as JSON")
            .short('c')
            .long("config")
            .value_parser(clap::value_parser!(String))
            .value_name("FILE")
    };

    cli.arg(
        Arg::new("verbose")
            .help("Increase log verbosity (-v, -vv, -vvv)")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true),
    )
    .arg(
        Arg::new("plain")
            .help("Disable colored output")
            .long("plain")
            .action(ArgAction::SetTrue)
            .global(true),
    )
    .subcommand(
        Command::new("build")
            .about("Compile a unit and write the assembly listing")
            .arg(unit_arg())
            .arg(config_arg())
            .arg(
                Arg::new("output")
                    .help("Specify the output file")
                    .short('o')
                    .long("output")
                    .value_parser(clap::value_parser!(String))
                    .value_name("FILE"),
            )
            .arg(
                Arg::new("json")
                    .help("Emit the instruction stream as JSON")
                    .long("json")
                    .action(ArgAction::SetTrue),
            ),
    )
    .subcommand(
        Command::new("inspect")
            .about("Compile a unit and print statistics and the data part")
            .arg(unit_arg())
            .arg(config_arg()),
    )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();
}

fn stderr_printer(matches: &ArgMatches) -> Printer<std::io::Stderr> {
    let printer = Printer::new(std::io::stderr());
    if matches.get_flag("plain") {
        printer.with_formatting(FormatStyle::plain())
    } else {
        printer
    }
}

fn load_options(sub_m: &ArgMatches) -> Result<CompileOptions, Box<dyn SlateErrorExt>> {
    match sub_m.get_one::<String>("config") {
        Some(path) => CompileOptions::load_from_file(path).map_err(|e| Box::new(e) as Box<dyn SlateErrorExt>),
        None => Ok(CompileOptions::default()),
    }
}

/// Load options, compile the unit and report failures on stderr.
fn compile_unit(matches: &ArgMatches, sub_m: &ArgMatches) -> Result<CompiledProgram, i32> {
    let mut err_out = stderr_printer(matches);
    let file = match sub_m.get_one::<String>("file") {
        Some(f) => f,
        None => return Err(EXIT_IO),
    };
    let options = match load_options(sub_m) {
        Ok(o) => o,
        Err(e) => {
            let _ = err_out.diagnostics(&[e]);
            return Err(EXIT_IO);
        }
    };
    let unit = match CompileUnit::load_from_file(Path::new(file)) {
        Ok(u) => u,
        Err(e) => {
            let _ = err_out.diagnostics(&[Box::new(e) as Box<dyn SlateErrorExt>]);
            return Err(EXIT_IO);
        }
    };
    debug!("compiling `{}` with entry event `{}`", file, options.entry_event);
    match compile(&unit, &options) {
        Ok(program) => Ok(program),
        Err(errors) => {
            let errors: Vec<Box<dyn SlateErrorExt>> =
                errors.into_iter().map(|e| Box::new(e) as Box<dyn SlateErrorExt>).collect();
            let _ = err_out.diagnostics(&errors);
            Err(EXIT_DIAGNOSTICS)
        }
    }
}

/// Dispatches the command based on the parsed arguments; returns the
/// process exit code.
fn dispatch_commands(matches: &ArgMatches) -> i32 {
    match matches.subcommand() {
        Some(("build", sub_m)) => {
            let program = match compile_unit(matches, sub_m) {
                Ok(p) => p,
                Err(code) => return code,
            };
            let rendered = if sub_m.get_flag("json") {
                match program.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        let _ = stderr_printer(matches).error(&format!("serialize program: {}", e));
                        return EXIT_IO;
                    }
                }
            } else {
                program.to_string()
            };

            match sub_m.get_one::<String>("output") {
                Some(path) => {
                    if let Err(e) = fs::write(path, &rendered) {
                        let _ = stderr_printer(matches).error(&format!("write `{}`: {}", path, e));
                        return EXIT_IO;
                    }
                    let _ = stderr_printer(matches).success(&format!(
                        "wrote {} block(s), {} data slot(s) to {}",
                        program.blocks.len(),
                        program.data.len(),
                        path
                    ));
                }
                None => print!("{}", rendered),
            }
            0
        }
        Some(("inspect", sub_m)) => {
            let program = match compile_unit(matches, sub_m) {
                Ok(p) => p,
                Err(code) => return code,
            };
            let mut out = Printer::new(std::io::stdout());
            if matches.get_flag("plain") {
                out = out.with_formatting(FormatStyle::plain());
            }
            match print_report(&mut out, &program) {
                Ok(()) => 0,
                Err(_) => EXIT_IO,
            }
        }
        _ => {
            let _ = stderr_printer(matches).info("No valid subcommand was used. Use --help for more information.");
            EXIT_IO
        }
    }
}

fn print_report<T: Write>(out: &mut Printer<T>, program: &CompiledProgram) -> io::Result<()> {
    out.title("Program")?;
    out.raw(&stats_table(program).to_string())?;
    out.title("Data part")?;
    out.raw(&data_table(program).to_string())?;
    out.title("Out-value pool")?;
    out.raw(&slot_usage_table(program).to_string())
}
