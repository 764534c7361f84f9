use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process,
};

use clap::Parser as ClapParser;
use log::LevelFilter;

use pseudo_lmc::{
    asm::{Assembled, assemble_program, print_listing},
    codegen::{Compiler, CompilerOptions},
    frontend::{Lexer, Parser, TokenDumper},
    harness::{Outcome, classify_halt},
    logger,
    runtime::{Output, Status, Vm, VmConfig},
};

/// Compile pseudocode to Little Man Computer assembly and run it.
#[derive(ClapParser, Debug)]
#[command(name = "plmc", version)]
struct Cli {
    /// A `.pseudo` source or a `.lmc` assembly file
    file: PathBuf,

    /// Print the token stream and stop
    #[arg(long)]
    tokens: bool,

    /// Disable colours in the token dump
    #[arg(long)]
    no_color: bool,

    /// Describe tokens in words instead of their debug form
    #[arg(long)]
    pretty: bool,

    /// Print the syntax tree and stop
    #[arg(long)]
    ast: bool,

    /// Print the generated assembly and stop
    #[arg(long)]
    asm: bool,

    /// Print a disassembly of the memory image and stop
    #[arg(long)]
    listing: bool,

    /// Write the assembled image (postcard) to this path and stop
    #[arg(long, value_name = "OUT")]
    image: Option<PathBuf>,

    /// Values for INP, consumed before stdin is read
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    input: Vec<i64>,

    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,

    /// Leave `//` annotations out of the generated assembly
    #[arg(long)]
    no_comments: bool,

    /// Log phase milestones
    #[arg(short, long)]
    verbose: bool,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.trace {
        LevelFilter::Trace
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = logger::init(level) {
        eprintln!("Failed to install logger: {}", e);
    }

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => fail(&format!("Failed to read '{}': {}", cli.file.display(), e)),
    };

    let assembly = match extension(&cli.file) {
        Some("pseudo") => match compile_source(&source, &cli) {
            Some(text) => text,
            None => return,
        },
        Some("lmc") => source,
        _ => fail(&format!(
            "expected a .pseudo or .lmc file, got {}",
            cli.file.display()
        )),
    };

    if cli.asm {
        print!("{}", assembly);
        return;
    }

    let image = match assemble_program(&assembly) {
        Ok(image) => image,
        Err(e) => fail(&e.to_string()),
    };

    if cli.listing {
        print_listing(&image.memory, &image.labels);
        return;
    }

    if let Some(out) = &cli.image {
        write_image(&image, out);
        return;
    }

    run_image(&image, &cli);
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

/// Front half of the pipeline. Returns `None` when a dump flag already
/// produced the requested output.
fn compile_source(source: &str, cli: &Cli) -> Option<String> {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => fail(&format!("Lexer error: {}", e)),
    };

    if cli.tokens {
        let mut dumper = TokenDumper::new();
        if cli.no_color {
            dumper = dumper.no_color();
        }
        if cli.pretty {
            dumper = dumper.pretty();
        }
        if let Err(e) = dumper.dump(&tokens) {
            fail(&format!("Failed to write tokens: {}", e));
        }
        return None;
    }

    let program = match Parser::new(tokens).parse() {
        Ok(program) => program,
        Err(e) => fail(&format!("Parse error: {}", e)),
    };

    if cli.ast {
        println!("{:#?}", program);
        return None;
    }

    let options = CompilerOptions {
        comments: !cli.no_comments,
    };
    match Compiler::new(options).compile_program(&program) {
        Ok(text) => Some(text),
        Err(e) => fail(&e.to_string()),
    }
}

fn write_image(image: &Assembled, out: &Path) {
    let bytes = match image.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => fail(&format!("Failed to encode image: {}", e)),
    };
    if let Err(e) = fs::write(out, bytes) {
        fail(&format!("Failed to write '{}': {}", out.display(), e));
    }
    log::debug!("wrote {} words to {}", image.memory.len(), out.display());
}

/// Prompt on stderr and read one line from stdin. EOF suspends the machine.
fn read_stdin_line() -> Option<String> {
    eprint!("? ");
    let _ = io::stderr().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn run_image(image: &Assembled, cli: &Cli) {
    let config = VmConfig {
        max_steps: cli.max_steps,
        ..VmConfig::default()
    };
    let mut vm = Vm::with_config(config);
    vm.load(image.memory.clone());
    for &value in &cli.input {
        vm.push_input(value);
    }

    vm.set_input_provider(Box::new(read_stdin_line));
    vm.set_print_hook(Box::new(|out: &Output| {
        print!("{}", out);
        let _ = io::stdout().flush();
    }));

    let status = match vm.run() {
        Ok(status) => status,
        Err(e) => fail(&e.to_string()),
    };
    log::debug!("executed {} steps", vm.steps());

    if status == Status::AwaitingInput {
        fail("program is waiting for input but stdin is closed");
    }
    if let Outcome::AssertionFailed { address } = classify_halt(image, vm.halted_at()) {
        fail(&format!("assertion failed at {:03}", address));
    }
}
