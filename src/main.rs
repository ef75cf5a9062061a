extern crate exitcode;

// Standard Imports
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use regex::Regex;
use simple_error::SimpleError;

use pegforge::{
    create_generator, generate_parser, parse_grammar, run_self_test,
    CompileError, CustomAction, CustomActions, GenerationError, GeneratorSettings,
    PestProgramParser, Pipeline,
};


/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
#[clap(name = "pegforge", version, about = "PEG parser generator and tree-to-source compiler")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a parser for a PEG grammar
    Generate(GenerateOptions),

    /// Compile a mini-language source file to output source
    Compile(CompileOptions),
}

#[derive(Args)]
struct GenerateOptions {
    /// Grammar file to generate a parser for
    #[clap(long, parse(from_os_str))]
    peg: PathBuf,

    /// Destination directory, default is the grammar's directory suffixed with _<generator>
    /// for every generator except native
    #[clap(long, parse(from_os_str))]
    outpath: Option<PathBuf>,

    /// Base name of the generated files
    #[clap(long)]
    outfile: Option<String>,

    /// Backend to generate with: native, c, cpp, java or py
    #[clap(long, default_value = "native")]
    generator: String,

    /// Comma separated rules that are matched without producing nodes
    #[clap(long)]
    ignore: Option<RuleList>,

    /// Comma separated rules whose nodes are hoisted into the calling rule
    #[clap(long)]
    call: Option<RuleList>,

    /// Input file the generated test harness parses
    #[clap(long)]
    testfile: Option<String>,

    /// Type, namespace or class name of the generated parser, default is the grammar file stem
    #[clap(long)]
    name: Option<String>,

    /// Text put at the top of every generated file
    #[clap(long)]
    header: Option<String>,

    /// Debug level of the generated parser
    #[clap(long, default_value_t = 0)]
    debug: u32,

    // Flags

    /// Also generate a benchmark harness
    #[clap(long, action)]
    bench: bool,

    /// Also generate a parser counting rule invocations
    #[clap(long, action)]
    heatmap: bool,

    /// Print the grammar tree and make the generated test harness print the parsed tree
    #[clap(long, action)]
    dumptree: bool,

    /// Do not build and run the generated test harness
    #[clap(long, action)]
    notest: bool,
}

#[derive(Args)]
struct CompileOptions {
    /// Path of the mini-language file to compile
    #[clap(parse(from_os_str))]
    path: PathBuf,

    /// Path to output file, default is <path_filename>.cpp
    #[clap(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Write compilation result to stdout instead of output
    #[clap(long, action)]
    stdout: bool,
}

/// Comma separated list of grammar rule names given on the command line.
#[derive(Debug, Clone, PartialEq)]
struct RuleList(Vec<String>);

impl FromStr for RuleList {
    type Err = SimpleError;

    /// Syntax: identifier(,identifier)*
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|error| SimpleError::new(error.to_string()))?;

        let mut rules = Vec::new();
        for rule in input.split(',').map(str::trim).filter(|rule| !rule.is_empty()) {
            if !re.is_match(rule) {
                return Err(SimpleError::new(format!("`{}` is not a valid rule name", rule)));
            }
            rules.push(rule.to_owned());
        }
        Ok(Self(rules))
    }
}

impl GenerateOptions {
    /// Derives default values for empty arguments that cannot be set to constants.
    /// Output directory and parser name are derived from the grammar path.
    fn derive_defaults(mut self) -> Self {
        if self.outpath.is_none() {
            let directory = self.peg.parent().unwrap_or_else(|| Path::new("."));
            let directory = if directory.as_os_str().is_empty() { Path::new(".") } else { directory };
            self.outpath = Some(match self.generator.as_str() {
                "native" => directory.to_path_buf(),
                generator => {
                    let mut suffixed = directory.as_os_str().to_owned();
                    suffixed.push(format!("_{}", generator));
                    PathBuf::from(suffixed)
                }
            });
        }

        if self.name.is_none() {
            let stem = self.peg.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut characters = stem.chars();
            self.name = Some(match characters.next() {
                Some(first) => first.to_uppercase().chain(characters).collect(),
                None => stem,
            });
        }

        self
    }

    fn custom_actions(&self) -> CustomActions {
        let ignored = self.ignore.iter()
            .flat_map(|rules| rules.0.iter())
            .map(|rule| CustomAction::ignore(rule.as_str()));
        let called = self.call.iter()
            .flat_map(|rules| rules.0.iter())
            .map(|rule| CustomAction::call(rule.as_str()));
        CustomActions::new(ignored.chain(called))
    }

    fn settings(&self, outpath: &Path) -> GeneratorSettings {
        let directory = outpath.to_path_buf();
        let write_file = Box::new(move |file: &str, content: &str| {
            fs::create_dir_all(&directory)?;
            fs::write(directory.join(file), content)
        });

        let mut settings = GeneratorSettings::new(self.name.clone().unwrap_or_default(), write_file)
            .with_debug(self.dumptree)
            .with_debug_level(self.debug)
            .with_bench(self.bench)
            .with_heatmap(self.heatmap);
        if let Some(header) = &self.header {
            settings = settings.with_header(header.as_str());
        }
        if let Some(testfile) = &self.testfile {
            settings = settings.with_test_name(testfile.as_str());
        }
        if let Some(outfile) = &self.outfile {
            settings = settings.with_file_name(outfile.as_str());
        }
        settings
    }
}

fn generation_exit_code(error: &GenerationError) -> exitcode::ExitCode {
    match error {
        GenerationError::UnknownVariant(_) | GenerationError::InvalidSettings(_) | GenerationError::UnknownRule(_) => exitcode::USAGE,
        GenerationError::Syntax(_) => exitcode::DATAERR,
        GenerationError::Io { .. } => exitcode::IOERR,
        GenerationError::StructuralContractViolation { .. } => exitcode::SOFTWARE,
    }
}

fn run_generate(options: GenerateOptions) -> exitcode::ExitCode {
    let options = options.derive_defaults();
    let outpath = options.outpath.clone().unwrap_or_default();

    let source = match fs::read_to_string(&options.peg) {
        Ok(source) => source,
        Err(why) => {
            log::error!("couldn't read {}: {}", options.peg.display(), why);
            return exitcode::NOINPUT;
        }
    };

    let result = create_generator(&options.generator)
        .and_then(|mut generator| {
            let root = parse_grammar(&source)?;
            if options.dumptree {
                print!("{}", root);
            }
            generator.set_custom_actions(options.custom_actions());
            let settings = options.settings(&outpath);
            generate_parser(&root, generator.as_ref(), &settings)?;
            Ok((generator, settings))
        });

    let (generator, settings) = match result {
        Ok(generated) => generated,
        Err(why) => {
            log::error!("{}", why);
            return generation_exit_code(&why);
        }
    };

    if options.notest || options.testfile.is_none() {
        log::debug!("skipping the generated test harness");
        return exitcode::OK;
    }
    match run_self_test(generator.as_ref(), &settings, &outpath) {
        Ok(output) => {
            log::info!("{}", output);
            exitcode::OK
        }
        Err(why) => {
            log::error!("couldn't run the test command: {}", why);
            exitcode::UNAVAILABLE
        }
    }
}

fn run_compile(options: CompileOptions) -> exitcode::ExitCode {
    let pipeline: Pipeline<PestProgramParser> = Pipeline::default();
    let source_path = options.path.as_path();

    // Check if output should be to stdout
    let result = if options.stdout {
        pipeline.compile(source_path).map(|compiled| print!("{}", compiled))
    } else {
        let dest_path = options.output.clone().unwrap_or_else(|| source_path.with_extension("cpp"));
        pipeline.compile_and_save(source_path, &dest_path)
    };

    match result {
        Ok(_) => exitcode::OK,
        Err(why) => {
            log::error!("compile error: {}", why);
            match why {
                CompileError::Syntax(_) => exitcode::DATAERR,
                CompileError::MalformedNode { .. } => exitcode::SOFTWARE,
                CompileError::Io(_) => exitcode::IOERR,
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse Command line arguments
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Generate(options) => run_generate(options),
        Command::Compile(options) => run_compile(options),
    };
    std::process::exit(code);
}
