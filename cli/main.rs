#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use dreval::{DatasetError, DrugResponseDataset, Fold, Persist, ResponseColumns, SplitConfig};
use itertools::Itertools;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "dreval",
    version,
    about = "Cross-validation splits for drug response prediction benchmarks."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a response table into cross-validation folds
    Split(SplitArgs),
    /// Print a short summary of a response table
    Describe(ResponseFileArgs),
}

#[derive(Args)]
struct ResponseFileArgs {
    /// Path to the response table (GDSC column layout by default)
    responses: PathBuf,

    /// Column holding the response values
    #[arg(long, default_value = "LN_IC50")]
    response_column: String,

    /// Column holding the cell line identifiers
    #[arg(long, default_value = "CELL_LINE_NAME")]
    cell_line_column: String,

    /// Column holding the drug identifiers
    #[arg(long, default_value = "DRUG_NAME")]
    drug_column: String,

    /// Kind of response value: IC50, EC50, AUC or classification
    #[arg(long, default_value = "IC50")]
    target_type: String,

    /// Field separator of the response table
    #[arg(long, default_value_t = ',')]
    separator: char,
}

#[derive(Args)]
struct SplitArgs {
    #[command(flatten)]
    input: ResponseFileArgs,

    /// TOML file with cross-validation settings; flags below take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long, value_name = "K")]
    n_cv_splits: Option<usize>,

    /// Split mode: LPO, LCO or LDO
    #[arg(long)]
    mode: Option<String>,

    /// Do not carve a validation set out of the training pool
    #[arg(long)]
    no_validation: bool,

    /// Fraction of each training pool used for validation
    #[arg(long)]
    validation_ratio: Option<f64>,

    /// Seed for shuffling and validation sampling
    #[arg(long)]
    random_state: Option<u64>,

    /// Write the fold assignment here instead of standard output
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

impl ResponseFileArgs {
    fn columns(&self) -> Result<ResponseColumns, DatasetError> {
        if !self.separator.is_ascii() {
            return Err(DatasetError::InvalidArgument(format!(
                "separator '{}' is not a single-byte character",
                self.separator
            )));
        }
        Ok(ResponseColumns {
            response: self.response_column.clone(),
            cell_line_id: self.cell_line_column.clone(),
            drug_id: self.drug_column.clone(),
            target_type: self.target_type.parse()?,
            separator: self.separator as u8,
        })
    }

    fn load(&self) -> Result<DrugResponseDataset, DatasetError> {
        DrugResponseDataset::load(&self.responses, &self.columns()?)
    }
}

impl SplitArgs {
    fn split_config(&self) -> Result<SplitConfig, DatasetError> {
        let mut config = match &self.config {
            Some(path) => SplitConfig::load(path)?,
            None => SplitConfig::default(),
        };
        if let Some(n_cv_splits) = self.n_cv_splits {
            config.n_cv_splits = n_cv_splits;
        }
        if let Some(mode) = &self.mode {
            config.mode = mode.parse()?;
        }
        if self.no_validation {
            config.split_validation = false;
        }
        if let Some(ratio) = self.validation_ratio {
            config.validation_ratio = ratio;
        }
        if let Some(seed) = self.random_state {
            config.random_state = seed;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();
    let result = match command {
        Some(Commands::Split(args)) => run_split(&args),
        Some(Commands::Describe(args)) => run_describe(&args),
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_split(args: &SplitArgs) -> Result<(), Box<dyn Error>> {
    let config = args.split_config()?;
    let mut dataset = args.input.load()?;
    log::info!(
        "Splitting {} records into {} {} folds (validation: {}, ratio {}, seed {})",
        dataset.len(),
        config.n_cv_splits,
        config.mode,
        config.split_validation,
        config.validation_ratio,
        config.random_state
    );

    dataset.split_dataset(&config)?;
    let folds = dataset.cv_splits().unwrap_or_default();
    for (i, fold) in folds.iter().enumerate() {
        log::info!(
            "Fold {}: {} train, {} validation, {} test",
            i + 1,
            fold.train.len(),
            fold.validation.len(),
            fold.test.len()
        );
    }

    let writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    write_fold_assignment(BufWriter::new(writer), &dataset, folds)?;
    if let Some(path) = &args.out {
        println!("Fold assignment written to: {}", path.display());
    }
    Ok(())
}

/// One row per (fold, record): `fold role index cell_line_id drug_id`.
fn write_fold_assignment<W: Write>(
    mut out: W,
    dataset: &DrugResponseDataset,
    folds: &[Fold],
) -> io::Result<()> {
    writeln!(out, "fold\trole\tindex\tcell_line_id\tdrug_id")?;
    for (i, fold) in folds.iter().enumerate() {
        for (role, indices) in [
            ("train", &fold.train),
            ("validation", &fold.validation),
            ("test", &fold.test),
        ] {
            for &record in indices {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    i + 1,
                    role,
                    record,
                    dataset.cell_line_ids()[record],
                    dataset.drug_ids()[record]
                )?;
            }
        }
    }
    out.flush()
}

fn run_describe(args: &ResponseFileArgs) -> Result<(), Box<dyn Error>> {
    let dataset = args.load()?;
    let response = dataset.response();
    let min = response.iter().copied().fold(f64::INFINITY, f64::min);
    let max = response.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = response.mean().unwrap_or(f64::NAN);

    println!("Target type: {}", dataset.target_type());
    println!("Records: {}", dataset.len());
    println!("Cell lines: {}", dataset.cell_line_ids().iter().unique().count());
    println!("Drugs: {}", dataset.drug_ids().iter().unique().count());
    println!("Response range: ({min:.3}, {max:.3}), mean {mean:.3}");
    Ok(())
}
