use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, miette, IntoDiagnostic, Result};

use ls8::output::Output;
use ls8::{disassemble, parse_program, RunEnvironment};

/// ls8 runs and inspects programs for the LS-8, a minimal 8-bit register machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.ls8` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.ls8` or raw `.bin` file and output to terminal
    Run {
        /// `.ls8` or `.bin` file to run
        name: PathBuf,
        /// Print machine state before every instruction (also `LS8_TRACE=1`)
        #[arg(short, long)]
        trace: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a `.ls8` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Create raw `.bin` file holding the program bytes
    Compile {
        /// `.ls8` file to compile
        name: PathBuf,
        /// Destination to output .bin file
        dest: Option<PathBuf>,
    },
    /// List the instructions of a program
    Dump {
        /// `.ls8` or `.bin` file to list
        name: PathBuf,
    },
    /// Place a watch on a `.ls8` file to re-check it on every change
    Watch {
        /// `.ls8` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    ls8::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(ls8::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, ls8::env::is_trace_enabled(), false);
        }
        println!("\n~ ls8 v{VERSION} ~");
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Run {
            name,
            trace,
            minimal,
        } => run(&name, trace || ls8::env::is_trace_enabled(), minimal),
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let program = load(&name)?;
            message(
                Green,
                "Success",
                &format!("{} bytes, no errors found!", program.len()),
            );
            Ok(())
        }
        Command::Compile { name, dest } => {
            file_message(Green, "Loading", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let program = parse_program(&src)?;

            let out_file_name = match dest {
                Some(dest) => dest,
                None => name
                    .with_extension("bin")
                    .file_name()
                    .ok_or_else(|| miette!("File has no name. Exiting..."))?
                    .into(),
            };
            fs::write(&out_file_name, &program).into_diagnostic()?;

            message(Green, "Finished", "emit binary");
            file_message(Green, "Saved", &out_file_name);
            Ok(())
        }
        Command::Dump { name } => {
            let program = load(&name)?;
            for line in disassemble(&program) {
                let bytes: Vec<String> = line.bytes.iter().map(|b| format!("{b:08b}")).collect();
                let text = match line.instr {
                    Ok(instr) => instr.to_string(),
                    Err(_) => "??".dimmed().to_string(),
                };
                println!("0x{:02x}  {:<26}  {}", line.addr, bytes.join(" "), text);
            }
            Ok(())
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        // Editors may still be writing the file
                        sleep(Duration::from_millis(50));

                        let src = match fs::read_to_string(&name) {
                            Ok(src) => src,
                            Err(e) => {
                                eprintln!("{e}. Exiting...");
                                std::process::exit(1)
                            }
                        };
                        match parse_program(&src) {
                            Ok(program) => message(
                                Green,
                                "Success",
                                &format!("{} bytes, no errors found!", program.len()),
                            ),
                            Err(e) => println!("\n{:?}", e),
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    if Output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Read program bytes: `.ls8` files as text, `.bin` files as raw bytes.
fn load(name: &Path) -> Result<Vec<u8>> {
    let Some(ext) = name.extension() else {
        bail!("File has no extension. Exiting...");
    };
    match ext.to_str() {
        Some("ls8") => {
            let src = fs::read_to_string(name).into_diagnostic()?;
            parse_program(&src)
        }
        Some("bin") => fs::read(name).into_diagnostic(),
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

fn run(name: &Path, trace: bool, minimal: bool) -> Result<()> {
    Output::set_minimal(minimal);
    file_message(MsgColor::Green, "Loading", name);
    let program = load(name)?;
    let mut env = RunEnvironment::from_raw(&program)?;
    env.set_trace(trace);

    message(MsgColor::Green, "Running", "loaded program");
    env.run()?;

    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

const SHORT_INFO: &str = r"
Welcome to ls8, an emulator for the LS-8 8-bit register machine.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
