#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use octofhir_sdc_assemble::*;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sdc-assemble")]
#[command(about = "Assemble a modular FHIR Questionnaire into a single self-contained Questionnaire")]
#[command(version)]
struct Cli {
    /// Parameters resource or bare root Questionnaire (JSON)
    #[arg(short, long)]
    input: PathBuf,
    /// Directory of Questionnaire JSON files used to resolve sub-questionnaires
    #[arg(short, long)]
    source_dir: PathBuf,
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Assembly configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AssembleConfig::from_file(path)?,
        None => AssembleConfig::default(),
    };

    let content = std::fs::read_to_string(&cli.input)?;
    let input: serde_json::Value = serde_json::from_str(&content)?;

    let source = MemoryQuestionnaireSource::from_dir(&cli.source_dir).await?;
    let assembler = QuestionnaireAssembler::new(source).with_config(config);
    let output = assembler.assemble_value(input, None).await;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)?;
            report(&output);
            eprintln!("📁 Written to {}", path.display());
        }
        None => println!("{json}"),
    }

    if output.is_error() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn report(output: &AssembleOutput) {
    match output {
        AssembleOutput::Questionnaire(questionnaire) => {
            eprintln!("✅ Assembled {questionnaire}");
        }
        AssembleOutput::Parameters(result) => {
            eprintln!(
                "⚠️  Assembled {} with {} warnings:",
                result.questionnaire,
                result.outcome.issue.len()
            );
            for issue in &result.outcome.issue {
                eprintln!("  {issue}");
            }
        }
        AssembleOutput::OperationOutcome(outcome) => {
            eprintln!("❌ Assembly failed:");
            for issue in &outcome.issue {
                eprintln!("  {issue}");
            }
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Please compile with --features cli");
    std::process::exit(1);
}
