use std::path::PathBuf;

use clap::Parser;
use log::info;

use smtfe_rs::session::{Session, SessionConfig};
use smtfe_rs::smtlib::emit_script;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input SMT-LIB 2 script.
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Solver timeout (in milliseconds).
    #[clap(long, value_name = "INT")]
    timeout: Option<u32>,

    /// Minimum number of hex digits of bit-vector values.
    #[clap(long, value_name = "INT")]
    hex_digits: Option<usize>,

    /// Print the normalized script before solving.
    #[clap(long)]
    emit: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let config = SessionConfig {
        hex_digits: args.hex_digits,
        timeout_ms: args.timeout,
        ..SessionConfig::default()
    };
    let s = Session::new(config);

    let text = std::fs::read_to_string(&args.path)?;
    let formula = s.parse_script(&text)?;
    info!("Parsed {} symbols and {} functions", formula.symbols().len(), formula.functions().len());
    println!("formula = {}", formula);

    if args.emit {
        print!("{}", emit_script(&formula));
    }

    match s.check_formula(&formula)? {
        Some(model) => {
            println!("sat");
            println!("{}", model);
        }
        None => println!("unsat"),
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
