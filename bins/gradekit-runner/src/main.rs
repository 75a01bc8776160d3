mod allocator;
mod assembler;
mod config;
mod executor;
mod report;
mod runner;
mod scanner;


use anyhow::Context;
use clap::Parser;
use config::{CommandEnv, GraderInputs};
use executor::GradingJob;
use gradekit_common::output;
use runner::ShellRunner;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Logs go to stderr; stdout belongs to the graded command and the result line
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .init();

    let inputs = GraderInputs::parse();

    // Last-resort guard: the pipeline itself always produces a result, so
    // anything landing here is a bug or an unusable environment
    if let Err(e) = run(inputs).await {
        error!(error = ?e, "Grading runner failed");
        std::process::exit(1);
    }
}

async fn run(inputs: GraderInputs) -> anyhow::Result<()> {
    inputs.validate()?;

    let workspace = std::env::current_dir().context("Failed to resolve working directory")?;
    let job = GradingJob::from_inputs(&inputs, &workspace, CommandEnv::from_process())?;

    info!(
        test = %job.test_name,
        command = %job.command,
        setup = job.setup_command.is_some(),
        timeout_secs = job.timeout.as_secs_f64(),
        max_score = job.max_score,
        scoring_mode = %job.scoring_mode,
        reports_dir = %job.reports_dir.display(),
        "Grader booting..."
    );

    let result = executor::execute(&job, &ShellRunner).await;

    info!(
        status = %result.status,
        passed = result.passed(),
        score = result.total_score(),
        max_score = result.max_score,
        tests = result.tests.len(),
        "Grading completed"
    );

    let encoded = output::encode_result(&result)?;
    match &inputs.output_file {
        Some(path) => {
            output::append_output(path, &encoded)?;
            info!(path = %path.display(), key = output::RESULT_OUTPUT_KEY, "Result published");
        }
        None => println!("{}", output::output_line(&encoded)),
    }

    Ok(())
}
