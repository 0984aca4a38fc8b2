use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use boxcheck::config::{CropConfig, InspectConfig, LabelConfig};
use boxcheck::display::{AutoAdvance, DirectorySink, DisplaySink, LineOperator, LogSink};
use boxcheck::pipeline::{self, CropPipeline, CropStepper};
use boxcheck::{ExtractedArchive, HttpInferenceClient, Labeler};

#[derive(Parser)]
#[command(name = "boxcheck")]
#[command(about = "Inspect object-detection boxes on ZIP archives of images")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a ZIP to the detection API and draw the returned boxes
    Inspect(InspectConfig),
    /// Cut out the regions described by YOLO labels and step through them
    Crop(CropConfig),
    /// Sort a folder of images into garbage/normal/atypical and export the labels
    Label(LabelConfig),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "boxcheck=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_logging(args.verbose);

    let result = match args.command {
        Command::Inspect(config) => run_inspect(config).await,
        Command::Crop(config) => run_crop(config),
        Command::Label(config) => run_label(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_inspect(config: InspectConfig) -> anyhow::Result<()> {
    let client = HttpInferenceClient::new(&config.api_url, config.timeout())?;

    let report = match &config.output_dir {
        Some(dir) => {
            let mut sink = DirectorySink::new(dir)?;
            pipeline::inspect(&config, &client, &mut sink).await?
        }
        None => pipeline::inspect(&config, &client, &mut LogSink::default()).await?,
    };

    println!(
        "Rendered {} images ({} boxes), {} not found in ZIP",
        report.rendered.len(),
        report.boxes_drawn,
        report.not_found.len()
    );
    Ok(())
}

fn run_crop(config: CropConfig) -> anyhow::Result<()> {
    let archive = ExtractedArchive::extract(&config.zip_path)?;

    let report = CropPipeline::new().run(&archive)?;
    if report.empty.is_some() {
        return Ok(());
    }

    println!("Total Crops: {}", report.crops.len());
    println!("Showing crops one-by-one...\n");

    let mut stepper = CropStepper::new(&report);
    let shown = match &config.output_dir {
        Some(dir) => walk(&mut stepper, &mut DirectorySink::new(dir)?, config.wait)?,
        None => walk(&mut stepper, &mut LogSink::default(), config.wait)?,
    };

    println!("Viewed {} of {} crops", shown, report.crops.len());
    Ok(())
}

fn run_label(config: LabelConfig) -> anyhow::Result<()> {
    let store = config.store();
    if config.reset {
        store.reset()?;
    }

    let mut labeler = Labeler::open(&config.image_dir, store)?;
    if let Some(dir) = &config.export_dir {
        std::fs::create_dir_all(dir)?;
        labeler = labeler.with_export_dir(dir);
    }

    let stdin = std::io::stdin();
    let report = labeler.run(stdin.lock(), &mut LogSink::default())?;

    println!("Labeled {} images", report.labeled);
    for path in &report.exported {
        println!("Exported {}", path.display());
    }
    Ok(())
}

fn walk<S: DisplaySink>(stepper: &mut CropStepper<'_>, sink: &mut S, wait: bool) -> anyhow::Result<usize> {
    if wait {
        let stdin = std::io::stdin();
        pipeline::walk_crops(stepper, sink, &mut LineOperator::new(stdin.lock()))
    } else {
        pipeline::walk_crops(stepper, sink, &mut AutoAdvance)
    }
}
