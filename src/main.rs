use calculator::{Calculator, ComputationError, EvalConfig, Lexer, RoundingMode, ValidationError};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, NamedSource, Report};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Validate and evaluate decimal arithmetic expressions")]
struct Args {
    /// Fraction digits kept on every quotient
    #[arg(long, env = "CALC_SCALE", default_value_t = calculator::config::DEFAULT_SCALE, global = true)]
    scale: u32,

    #[arg(long, env = "CALC_ROUNDING", value_enum, default_value_t = Rounding::HalfUp, global = true)]
    rounding: Rounding,

    /// Deepest bracket nesting accepted
    #[arg(long, env = "CALC_MAX_DEPTH", default_value_t = calculator::config::DEFAULT_MAX_DEPTH, global = true)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Tokenize { expression: String },
    Validate { expression: String },
    Evaluate { expression: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Rounding {
    HalfUp,
    HalfEven,
    Down,
}

impl From<Rounding> for RoundingMode {
    fn from(rounding: Rounding) -> Self {
        match rounding {
            Rounding::HalfUp => RoundingMode::HalfUp,
            Rounding::HalfEven => RoundingMode::HalfEven,
            Rounding::Down => RoundingMode::Down,
        }
    }
}

/// Renders `error` against the expression text and leaves with `code`.
fn fail<E>(error: E, expression: &str, code: i32) -> !
where
    E: Diagnostic + Send + Sync + 'static,
{
    let report =
        Report::new(error).with_source_code(NamedSource::new("<expression>", expression.to_string()));
    eprintln!("{report:?}");
    std::process::exit(code);
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = EvalConfig::default()
        .with_scale(args.scale)
        .with_rounding(args.rounding.into())
        .with_max_depth(args.max_depth);
    let calculator = Calculator::new(config);

    match args.command {
        Commands::Tokenize { expression } => {
            for token in Lexer::new(&expression) {
                println!("{token}");
            }
            println!("EOF");
        }
        Commands::Validate { expression } => match calculator.validate(&expression) {
            Ok(_) => println!("ok"),
            Err(e) => fail::<ValidationError>(e, &expression, 65),
        },
        Commands::Evaluate { expression } => {
            if let Err(e) = calculator.validate(&expression) {
                fail::<ValidationError>(e, &expression, 65);
            }
            match calculator.evaluate(&expression) {
                Ok(value) => println!("{value}"),
                Err(e) => fail::<ComputationError>(e, &expression, 70),
            }
        }
    }
    Ok(())
}
