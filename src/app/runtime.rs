use anyhow::{Context, Result};
use tracing::{debug, info};
use webdl_core::{
    HttpClient, HttpPageSource, LogFiles, PageSource, RenderedPageSource, Reporter, RunRequest,
    RunSummary,
};

use crate::app::{config_runtime, exit_handler, terminal};
use crate::app::exit_handler::ProcessExit;
use crate::app_config;
use crate::cli::Args;

pub(crate) async fn run_webdl() -> Result<ProcessExit> {
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();

    let default_level = config_runtime::resolve_default_log_level(&args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    terminal::init_tracing(default_level, force_cli_log_level);

    debug!(?args, "CLI arguments parsed");

    let loaded = match app_config::load_file_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return Ok(ProcessExit::Usage);
        }
    };
    if let (Some(path), Some(_)) = (loaded.path.as_deref(), loaded.config.as_ref()) {
        info!(path = %path.display(), "Loaded config file");
    }
    let file_config = loaded.config.as_ref();
    let args = config_runtime::apply_config_defaults(args, &cli_sources, file_config);

    let client_options = config_runtime::resolve_client_options(&args, file_config);
    let client = HttpClient::new(&client_options).context("Failed to build HTTP client")?;

    let source: Box<dyn PageSource> = if args.render {
        let options = config_runtime::resolve_render_options(file_config, &client_options.user_agent);
        Box::new(RenderedPageSource::new(options))
    } else {
        Box::new(HttpPageSource::new(client.clone()))
    };

    let logs = match LogFiles::open(&args.logs_dir) {
        Ok(logs) => logs,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(ProcessExit::Failure);
        }
    };
    let reporter = Reporter::new(terminal::select_console(&args), Some(logs));

    let request = RunRequest {
        page_url: args.url.clone(),
        file_type: args.file_type.clone(),
        output_dir: args.output_dir.clone(),
        concurrency: usize::from(args.concurrency),
    };
    info!(
        url = %request.page_url,
        file_type = %request.file_type,
        source = source.name(),
        "webdl starting"
    );

    match webdl_core::run(&request, source.as_ref(), &client, &reporter).await {
        Ok(summary) => {
            print_summary(&args, &summary)?;
            Ok(ProcessExit::Success)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Ok(exit_handler::exit_for_pipeline_error(&err))
        }
    }
}

/// The human-readable summary is printed by the reporter; `--json` adds
/// the machine-readable form on stdout.
fn print_summary(args: &Args, summary: &RunSummary) -> Result<()> {
    info!(
        found = summary.found,
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failed,
        retried = summary.retried,
        "Run complete"
    );
    if args.json {
        let json = serde_json::to_string_pretty(summary).context("Failed to encode summary")?;
        println!("{json}");
    }
    Ok(())
}
