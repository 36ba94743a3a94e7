use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use exhibit_assembler::config::{
    find_config_file, load_config, load_env_config, write_default_config, Config, LOCAL_CONFIG_FILE,
};
use exhibit_assembler::drive::DriveImporter;
use exhibit_assembler::models::{
    DeliveryMethod, NumberingStyle, PackageConfig, PackageRecord, RemoteFileDescriptor,
};
use exhibit_assembler::normalizer::UploadFilter;
use exhibit_assembler::pipeline::{
    resolve_result, CancelHandle, PersistOutcome, Pipeline, PollOutcome, ProgressEvent,
    WizardStep,
};
use exhibit_assembler::sequencer::number_at;
use exhibit_assembler::service::{GenerationService, HttpGenerationService};
use exhibit_assembler::store::{JsonlPackageStore, PackageStore};
use exhibit_assembler::ui::{self, GenerationProgress, Status};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exhibit Assembler - build numbered exhibit packages for immigration petitions
#[derive(Parser, Debug)]
#[command(name = "exhibit-assembler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble, submit and track exhibit packages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Log line format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the generation service base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    Table,
    Json,
    Plain,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Numbering {
    Letters,
    Numbers,
    Roman,
}

impl From<Numbering> for NumberingStyle {
    fn from(value: Numbering) -> Self {
        match value {
            Numbering::Letters => NumberingStyle::Letters,
            Numbering::Numbers => NumberingStyle::Numbers,
            Numbering::Roman => NumberingStyle::Roman,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Download,
    Email,
    Drive,
}

impl From<Delivery> for DeliveryMethod {
    fn from(value: Delivery) -> Self {
        match value {
            Delivery::Download => DeliveryMethod::Download,
            Delivery::Email => DeliveryMethod::Email,
            Delivery::Drive => DeliveryMethod::Drive,
        }
    }
}

/// Reordering applied before submission
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortMode {
    /// Keep the order given on the command line
    None,
    Label,
    Kind,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a package from files and links, generate it and wait for the result
    #[command(alias = "g")]
    Generate {
        /// PDF, JPG or PNG files, in exhibit order
        files: Vec<PathBuf>,

        /// Text file with pasted links, one or more per line
        #[arg(long)]
        links: Option<PathBuf>,

        /// JSON file with remote drive picks (`[{"id", "name", "mimeType"}]`)
        #[arg(long, requires = "drive_token")]
        drive_picks: Option<PathBuf>,

        /// Access token delivered by the remote drive picker
        #[arg(long)]
        drive_token: Option<String>,

        /// Package name
        #[arg(long)]
        name: String,

        /// Employer the package belongs to
        #[arg(long)]
        employer: String,

        #[arg(long)]
        case_id: Option<String>,

        #[arg(long)]
        visa_type: Option<String>,

        #[arg(long)]
        beneficiary: Option<String>,

        /// Requested visa duration in years
        #[arg(long)]
        duration_years: Option<u32>,

        #[arg(long, value_enum, default_value_t = Numbering::Letters)]
        numbering: Numbering,

        #[arg(long, value_enum, default_value_t = Delivery::Download)]
        delivery: Delivery,

        /// Recipient for email or drive delivery
        #[arg(long)]
        recipient: Option<String>,

        #[arg(long, value_enum, default_value_t = SortMode::None)]
        sort: SortMode,

        /// Reverse the final order
        #[arg(long)]
        reverse: bool,

        /// Print generation log lines as they arrive
        #[arg(long)]
        show_logs: bool,
    },

    /// Check a generation job once
    Status {
        job_id: String,
    },

    /// Download a finished package
    #[command(alias = "dl")]
    Download {
        job_id: String,

        /// Output file
        #[arg(long, short = 'O', default_value = "exhibits.pdf")]
        out: PathBuf,
    },

    /// Show the remote drive picker settings
    DriveConfig,

    /// List recorded packages
    Records {
        /// Only packages of this employer
        #[arg(long)]
        employer: Option<String>,
    },

    /// Print exhibit numbers for a given count
    Number {
        count: usize,

        #[arg(long, value_enum, default_value_t = Numbering::Letters)]
        style: Numbering,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination (defaults to ./exhibit-assembler.toml)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("exhibit_assembler={}", env_filter)),
    );
    let (text_layer, json_layer) = match cli.log_format {
        LogFormat::Text => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .init();

    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        load_env_config()?
    };
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }

    match cli.command {
        Commands::Generate {
            files,
            links,
            drive_picks,
            drive_token,
            name,
            employer,
            case_id,
            visa_type,
            beneficiary,
            duration_years,
            numbering,
            delivery,
            recipient,
            sort,
            reverse,
            show_logs,
        } => {
            let mut package_config = PackageConfig::new(name, employer)
                .numbering(numbering.into())
                .delivery(delivery.into(), recipient);
            package_config.case_id = case_id;
            package_config.visa_type = visa_type;
            package_config.beneficiary_name = beneficiary;
            package_config.requested_duration_years = duration_years;

            let request = GenerateRequest {
                files,
                links,
                drive_picks,
                drive_token,
                sort,
                reverse,
                show_logs,
                quiet: cli.quiet,
                output: cli.output,
            };
            run_generate(&config, package_config, request).await?;
        }

        Commands::Status { job_id } => {
            let service = http_service(&config)?;
            let report = service.status(&job_id).await?;

            match resolve_format(cli.output) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!("Job:      {}", job_id.bold());
                    println!("Status:   {:?}", report.status);
                    if let Some(progress) = report.progress {
                        println!("Progress: {:.0}%", progress);
                    }
                    if let Some(message) = &report.status_message {
                        println!("Message:  {}", message);
                    }
                    if let Some(url) = &report.download_url {
                        println!(
                            "Download: {}",
                            exhibit_assembler::pipeline::absolutize(url, service.base_url())
                        );
                    }
                    if let Some(link) = &report.drive_link {
                        println!("Drive:    {}", link);
                    }
                    if let Some(error) = &report.error {
                        println!("Error:    {}", error.red());
                    }
                }
            }
        }

        Commands::Download { job_id, out } => {
            let service = http_service(&config)?;
            let spinner = ui::Spinner::new(&format!("Downloading {}", job_id));
            let bytes = match service.download(&job_id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    spinner.finish_with_error(&e.to_string());
                    return Err(e.into());
                }
            };
            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            spinner.finish_with_success(&format!(
                "Saved {} ({})",
                out.display(),
                ui::format_file_size(bytes.len() as u64)
            ));
        }

        Commands::DriveConfig => {
            let service: Arc<dyn GenerationService> = Arc::new(http_service(&config)?);
            let importer = DriveImporter::new(service);
            let drive = importer.drive_config().await?;
            match resolve_format(cli.output) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&drive)?),
                _ => {
                    println!("Available: {}", "yes".green());
                    println!("Client id: {}", drive.client_id.unwrap_or_default());
                    println!("App id:    {}", drive.app_id.unwrap_or_default());
                    println!("Scope:     {}", drive.scope.unwrap_or_default());
                }
            }
        }

        Commands::Records { employer } => {
            let store = JsonlPackageStore::new(&config.storage.records_path);
            let records = match &employer {
                Some(employer) => store.list_by_employer(employer)?,
                None => store.list()?,
            };
            output_records(&records, cli.output)?;
        }

        Commands::Number { count, style } => {
            for i in 0..count {
                println!("Exhibit {}", number_at(i, style.into()));
            }
        }

        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
            write_default_config(&path)?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
        }
    }

    Ok(())
}

/// Options of the generate command that are not package configuration
struct GenerateRequest {
    files: Vec<PathBuf>,
    links: Option<PathBuf>,
    drive_picks: Option<PathBuf>,
    drive_token: Option<String>,
    sort: SortMode,
    reverse: bool,
    show_logs: bool,
    quiet: bool,
    output: OutputFormat,
}

async fn run_generate(
    config: &Config,
    package_config: PackageConfig,
    request: GenerateRequest,
) -> Result<()> {
    let service: Arc<dyn GenerationService> = Arc::new(http_service(config)?);
    let store: Arc<dyn PackageStore> =
        Arc::new(JsonlPackageStore::new(&config.storage.records_path));
    let undo_depth = config.sequencer.max_undo_depth;

    let mut step = WizardStep::start(package_config, undo_depth);
    if let Some(draft) = step.draft_mut() {
        let filter = UploadFilter::new(&config.limits.allowed_extensions);
        let uploads = filter.normalize_uploads(&request.files);
        if uploads.len() < request.files.len() && !request.quiet {
            ui::print_status(
                Status::Warning,
                &format!(
                    "Skipped {} file(s) that are not PDF, JPG or PNG",
                    request.files.len() - uploads.len()
                ),
            );
        }
        draft.add_items(uploads)?;

        if let Some(path) = &request.links {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            draft.add_links(&text)?;
        }

        if let Some(path) = &request.drive_picks {
            let picks = read_drive_picks(path).await?;
            draft.queue_picks(picks);
            let token = request.drive_token.clone().unwrap_or_default();
            let importer = DriveImporter::new(service.clone());
            if let Some(warning) = draft.import_pending(&importer, &token).await? {
                ui::print_import_warning(&warning);
            }
        }
    }

    let mut step = step.advance()?;
    if !request.quiet {
        if let WizardStep::Review(draft) = &step {
            ui::print_section("Exhibits");
            for (heading, item) in draft.sequencer.exhibit_index(draft.config.numbering_style) {
                println!("{} {} {}", ui::kind_icon(item.kind), heading.bold(), item.label);
            }
        }
    }

    step = step.advance()?;
    if let Some(draft) = step.draft_mut() {
        match request.sort {
            SortMode::None => {}
            SortMode::Label => draft.sequencer.sort_by_label(),
            SortMode::Kind => draft.sequencer.sort_by_kind(),
        }
        if request.reverse {
            draft.sequencer.reverse();
        }
    }

    let mut step = step.advance()?;

    let progress = GenerationProgress::new(request.show_logs && !request.quiet);
    let sink_progress = progress.clone();
    let pipeline = Pipeline::from_config(config, service.clone(), store).with_progress_sink(
        Arc::new(move |event: &ProgressEvent| sink_progress.update(event)),
    );

    let handle = CancelHandle::new();
    step.track_generation(handle.clone());
    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let package = match step.package_mut() {
        Some(package) => package,
        None => bail!("wizard did not reach the generate step"),
    };
    let report = match pipeline.run(package, handle.token()).await {
        Ok(report) => report,
        Err(e) => {
            progress.abandon("Generation did not start");
            return Err(e.into());
        }
    };

    match &report.outcome {
        PollOutcome::Cancelled => {
            progress.abandon("Stopped waiting");
            ui::print_status(
                Status::Info,
                &format!(
                    "Job {} keeps running remotely; check it with `exhibit-assembler status {}`",
                    report.job_id, report.job_id
                ),
            );
            return Ok(());
        }
        _ => progress.finish(package.status),
    }

    if let Some(PersistOutcome::Failed(reason)) = &report.persisted {
        ui::print_status(
            Status::Warning,
            &format!("Package finished but could not be recorded: {}", reason),
        );
    }

    let step = step.advance()?;
    let WizardStep::Complete(package) = &step else {
        bail!("wizard did not reach the complete step");
    };

    if resolve_format(request.output) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(package)?);
    }

    match &report.outcome {
        PollOutcome::Completed(result) => {
            let result = resolve_result(result, service.base_url());
            if !request.quiet {
                if let Some(url) = &result.delivery_url {
                    ui::print_status(Status::Success, &format!("Package ready: {}", url));
                }
                if let Some(pages) = result.total_pages {
                    println!("  {} pages", pages);
                }
                if let Some(size) = result.package_size_bytes {
                    println!("  {}", ui::format_file_size(size));
                }
            }
            Ok(())
        }
        PollOutcome::Failed(_) | PollOutcome::TimedOut => {
            let reason = package
                .failure
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| package.status.to_string());
            bail!("Package {} {}: {}", package.id, package.status, reason)
        }
        PollOutcome::Cancelled => Ok(()),
    }
}

fn http_service(config: &Config) -> Result<HttpGenerationService> {
    HttpGenerationService::new(&config.service).context("creating the generation service client")
}

async fn read_drive_picks(path: &Path) -> Result<Vec<RemoteFileDescriptor>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing drive picks in {}", path.display()))
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn output_records(records: &[PackageRecord], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Plain => {
            for record in records {
                println!(
                    "{} {} [{}] {} exhibits",
                    record.id, record.name, record.status, record.total_exhibits
                );
                if let Some(url) = &record.download_url {
                    println!("  {}", url);
                }
                if let Some(reason) = &record.failure_reason {
                    println!("  {}", reason);
                }
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Name", "Employer", "Status", "Exhibits", "Pages", "Size", "Updated"]);

            for record in records {
                let name = if record.name.chars().count() > 40 {
                    format!("{}...", record.name.chars().take(37).collect::<String>())
                } else {
                    record.name.clone()
                };

                table.add_row(vec![
                    Cell::new(name).add_attribute(Attribute::Bold),
                    Cell::new(&record.employer_id),
                    Cell::new(record.status.as_str()),
                    Cell::new(record.total_exhibits),
                    Cell::new(record.total_pages.map(|p| p.to_string()).unwrap_or_default()),
                    Cell::new(record.file_size.map(ui::format_file_size).unwrap_or_default()),
                    Cell::new(record.updated_at.format("%Y-%m-%d %H:%M").to_string()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["exhibit-assembler", "number", "3"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(matches!(
            cli.command,
            Commands::Number {
                count: 3,
                style: Numbering::Letters
            }
        ));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["exhibit-assembler", "-vv", "drive-config"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_generate_command() {
        let cli = Cli::parse_from([
            "exhibit-assembler",
            "generate",
            "cv.pdf",
            "badge.png",
            "--links",
            "links.txt",
            "--name",
            "O-1A petition",
            "--employer",
            "emp-1",
            "--numbering",
            "roman",
            "--delivery",
            "email",
            "--recipient",
            "hr@corp.example.com",
            "--sort",
            "kind",
        ]);

        match cli.command {
            Commands::Generate {
                files,
                links,
                numbering,
                delivery,
                recipient,
                sort,
                ..
            } => {
                assert_eq!(files, vec![PathBuf::from("cv.pdf"), PathBuf::from("badge.png")]);
                assert_eq!(links, Some(PathBuf::from("links.txt")));
                assert_eq!(NumberingStyle::from(numbering), NumberingStyle::Roman);
                assert_eq!(DeliveryMethod::from(delivery), DeliveryMethod::Email);
                assert_eq!(recipient.as_deref(), Some("hr@corp.example.com"));
                assert_eq!(sort, SortMode::Kind);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_drive_picks_require_token() {
        let result = Cli::try_parse_from([
            "exhibit-assembler",
            "generate",
            "--drive-picks",
            "picks.json",
            "--name",
            "n",
            "--employer",
            "e",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_download_command() {
        let cli = Cli::parse_from(["exhibit-assembler", "download", "job-1", "-O", "out/pkg.pdf"]);
        match cli.command {
            Commands::Download { job_id, out } => {
                assert_eq!(job_id, "job-1");
                assert_eq!(out, PathBuf::from("out/pkg.pdf"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
