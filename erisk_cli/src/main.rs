//! Command line evaluation of eRisk runs and hate-speech classifiers.
//!
//! Usage:
//!   erisk-eval erisk --golden golden_truth.txt --predictions run.jsonl --o 5 --o 50
//!   erisk-eval hate-speech --golden test.jsonl --predictions output.jsonl

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use erisk_eval::{
    evaluate_erisk_conf, evaluate_hate_speech, EriskConfigBuilder, GoldExample, GroundTruthStore,
    MissingSubjectStrat, PostCounting, PostRecord, PredictedExample, DEFAULT_MIN_TEXT_LEN,
};
use serde_jsonlines::json_lines;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "erisk-eval")]
#[command(about = "Evaluate early risk detection runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Accumulate the classified posts of every subject and compute the ERDE
    Erisk {
        /// Golden truth, one `<subject> <0|1>` per line
        #[arg(long)]
        golden: PathBuf,

        /// Classified posts as JSON lines, in chronological order
        #[arg(long)]
        predictions: PathBuf,

        /// ERDE parameter, can be repeated
        #[arg(long = "o", default_values_t = [5.0, 50.0])]
        os: Vec<f64>,

        /// Posts with at most this number of characters are ignored
        #[arg(long, default_value_t = DEFAULT_MIN_TEXT_LEN)]
        min_text_len: usize,

        /// Fail when a subject of the stream has no golden truth
        #[arg(long)]
        strict_subjects: bool,

        /// Number the posts of a subject from 1 instead of 2
        #[arg(long)]
        one_based_delay: bool,

        /// Compute the per-subject ERDE on multiple cores
        #[arg(long)]
        parallel: bool,

        /// Where to write the misclassified subjects
        #[arg(long)]
        misclassifications: Option<PathBuf>,
    },
    /// Join gold and predicted labels on the problem text and print a classification report
    HateSpeech {
        /// Gold examples as JSON lines with `problem` and `label`
        #[arg(long)]
        golden: PathBuf,

        /// Predictions as JSON lines with `problem` and `classification`
        #[arg(long)]
        predictions: PathBuf,

        /// Where to write the misclassified problems
        #[arg(long)]
        misclassifications: Option<PathBuf>,
    },
}

fn read_golden_truth(path: &Path) -> Result<GroundTruthStore> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    GroundTruthStore::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing the golden truth {}", path.display()))
}

fn read_json_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    json_lines::<T, _>(path)
        .with_context(|| format!("opening {}", path.display()))?
        .collect::<std::io::Result<Vec<T>>>()
        .with_context(|| format!("parsing {}", path.display()))
}

fn write_lines<I, D>(path: &Path, blocks: I) -> Result<()>
where
    I: IntoIterator<Item = D>,
    D: std::fmt::Display,
{
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for block in blocks {
        writeln!(writer, "{}", block)?;
    }
    writer.flush()?;
    tracing::info!("misclassifications written to {}", path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_erisk(
    golden: &Path,
    predictions: &Path,
    os: Vec<f64>,
    min_text_len: usize,
    strict_subjects: bool,
    one_based_delay: bool,
    parallel: bool,
    misclassifications: Option<&Path>,
) -> Result<()> {
    let golden = read_golden_truth(golden)?;
    let records: Vec<PostRecord> = read_json_lines(predictions)?;
    tracing::info!(
        subjects = golden.len(),
        positives = golden.positives(),
        records = records.len(),
        "inputs loaded"
    );
    let counting = if one_based_delay {
        PostCounting::OneBased
    } else {
        PostCounting::Legacy
    };
    let config = EriskConfigBuilder::default()
        .os(os)
        .min_text_len(min_text_len)
        .missing_subjects(MissingSubjectStrat::from(strict_subjects))
        .post_counting(counting)
        .parallel(parallel)
        .build();
    tracing::debug!("{}", config);
    let report = evaluate_erisk_conf(&golden, &records, config)?;
    println!("{}", report);
    println!(
        "Scored subjects: {} ({} positives), misclassified: {}",
        report.subjects,
        report.positives,
        report.misclassifications.len()
    );
    println!("\nClassification Report:");
    println!("{}", report.classification);
    println!("{}", report.classification.confusion_matrix);
    println!("Normalized confusion matrix:");
    println!("{:.2}", report.classification.confusion_matrix.normalized());
    if let Some(path) = misclassifications {
        // Each block already ends with a newline, the extra one separates the blocks
        write_lines(path, report.misclassifications.iter())?;
    }
    Ok(())
}

fn run_hate_speech(
    golden: &Path,
    predictions: &Path,
    misclassifications: Option<&Path>,
) -> Result<()> {
    let gold: Vec<GoldExample> = read_json_lines(golden)?;
    let predicted: Vec<PredictedExample> = read_json_lines(predictions)?;
    let evaluation = evaluate_hate_speech(gold, predicted)?;
    println!("\nClassification Report:");
    println!("{}", evaluation);
    println!("Normalized confusion matrix:");
    println!("{:.2}", evaluation.report.confusion_matrix.normalized());
    if let Some(path) = misclassifications {
        write_lines(path, evaluation.misclassifications.iter())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Erisk {
            golden,
            predictions,
            os,
            min_text_len,
            strict_subjects,
            one_based_delay,
            parallel,
            misclassifications,
        } => run_erisk(
            &golden,
            &predictions,
            os,
            min_text_len,
            strict_subjects,
            one_based_delay,
            parallel,
            misclassifications.as_deref(),
        ),
        Commands::HateSpeech {
            golden,
            predictions,
            misclassifications,
        } => run_hate_speech(&golden, &predictions, misclassifications.as_deref()),
    }
}
