use std::time::Duration;

use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use webdl_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use webdl_core::page::DEFAULT_RENDER_TIMEOUT;
use webdl_core::user_agent::resolve_user_agent;
use webdl_core::{ClientOptions, RenderOptions};

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Which options were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) logs_dir: bool,
    pub(crate) concurrency: bool,
    pub(crate) render: bool,
    pub(crate) timeout: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let command = Args::command();
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (args, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        output_dir: is_commandline_value(matches, "output_dir"),
        logs_dir: is_commandline_value(matches, "logs_dir"),
        concurrency: is_commandline_value(matches, "concurrency"),
        render: is_commandline_value(matches, "render"),
        timeout: is_commandline_value(matches, "timeout"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills options the user did not pass explicitly from the config file.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.output_dir
        && let Some(output_dir) = &file_config.output_dir
    {
        args.output_dir = output_dir.clone();
    }

    if !cli_sources.logs_dir
        && let Some(logs_dir) = &file_config.logs_dir
    {
        args.logs_dir = logs_dir.clone();
    }

    if !cli_sources.concurrency
        && let Some(concurrency) = file_config.concurrency
    {
        args.concurrency = concurrency;
    }

    if !cli_sources.render
        && let Some(render) = file_config.render
    {
        args.render = render;
    }

    if !cli_sources.timeout
        && args.timeout.is_none()
        && let Some(timeout) = file_config.timeout_secs
    {
        args.timeout = Some(timeout);
    }

    args
}

/// Timeouts and User-Agent for the shared HTTP client.
pub(crate) fn resolve_client_options(args: &Args, file_config: Option<&FileConfig>) -> ClientOptions {
    let connect_secs = file_config
        .and_then(|c| c.connect_timeout_secs)
        .unwrap_or(CONNECT_TIMEOUT_SECS);
    let timeout_secs = args.timeout.unwrap_or(READ_TIMEOUT_SECS);
    let user_agent = resolve_user_agent(file_config.and_then(|c| c.user_agent.as_deref()));

    ClientOptions {
        connect_timeout: Duration::from_secs(connect_secs),
        timeout: Duration::from_secs(timeout_secs),
        user_agent,
    }
}

/// Browser settings for `--render`. The browser presents the same
/// User-Agent as the HTTP client.
pub(crate) fn resolve_render_options(
    file_config: Option<&FileConfig>,
    user_agent: &str,
) -> RenderOptions {
    let Some(file_config) = file_config else {
        return RenderOptions {
            user_agent: user_agent.to_string(),
            ..RenderOptions::default()
        };
    };
    RenderOptions {
        browser: file_config.browser.unwrap_or_default(),
        executable: file_config.browser_path.clone(),
        user_agent: user_agent.to_string(),
        timeout: file_config
            .render_timeout_secs
            .map_or(DEFAULT_RENDER_TIMEOUT, Duration::from_secs),
    }
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use webdl_core::BrowserKind;

    use super::*;

    const PAGE: &str = "https://example.com/";

    fn parse(argv: &[&str]) -> (Args, CliValueSources) {
        let matches = Args::command()
            .try_get_matches_from(argv.iter().copied())
            .unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        (args, sources_from_matches(&matches))
    }

    fn file_config() -> FileConfig {
        FileConfig {
            output_dir: Some(PathBuf::from("from-config")),
            logs_dir: Some(PathBuf::from("config-logs")),
            concurrency: Some(4),
            timeout_secs: Some(90),
            connect_timeout_secs: Some(5),
            render: Some(true),
            browser: Some(BrowserKind::Edge),
            browser_path: Some(PathBuf::from("/opt/edge/msedge")),
            user_agent: Some("test-agent/1.0".to_string()),
            render_timeout_secs: Some(15),
        }
    }

    #[test]
    fn test_config_fills_unset_options() {
        let (args, sources) = parse(&["webdl", PAGE, "pdf"]);
        let config = file_config();
        let args = apply_config_defaults(args, &sources, Some(&config));

        assert_eq!(args.output_dir, PathBuf::from("from-config"));
        assert_eq!(args.logs_dir, PathBuf::from("config-logs"));
        assert_eq!(args.concurrency, 4);
        assert_eq!(args.timeout, Some(90));
        assert!(args.render);
    }

    #[test]
    fn test_cli_values_win_over_config() {
        let (args, sources) = parse(&[
            "webdl", PAGE, "pdf", "-o", "cli-out", "-c", "12", "--timeout", "7",
        ]);
        let config = file_config();
        let args = apply_config_defaults(args, &sources, Some(&config));

        assert_eq!(args.output_dir, PathBuf::from("cli-out"));
        assert_eq!(args.concurrency, 12);
        assert_eq!(args.timeout, Some(7));
        assert_eq!(args.logs_dir, PathBuf::from("config-logs"));
    }

    #[test]
    fn test_explicit_default_value_on_cli_still_wins() {
        let (args, sources) = parse(&["webdl", PAGE, "pdf", "-c", "10"]);
        assert!(sources.concurrency);
        let config = file_config();
        let args = apply_config_defaults(args, &sources, Some(&config));
        assert_eq!(args.concurrency, 10);
    }

    #[test]
    fn test_no_config_keeps_cli_defaults() {
        let (args, sources) = parse(&["webdl", PAGE, "pdf"]);
        let args = apply_config_defaults(args, &sources, None);
        assert_eq!(args.output_dir, PathBuf::from("downloads"));
        assert_eq!(args.concurrency, 10);
        assert!(!args.render);
    }

    #[test]
    fn test_client_options_from_config_and_cli() {
        let (args, _) = parse(&["webdl", PAGE, "pdf", "--timeout", "30"]);
        let config = file_config();
        let options = resolve_client_options(&args, Some(&config));
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
        assert_eq!(options.user_agent, "test-agent/1.0");
    }

    #[test]
    fn test_client_options_defaults() {
        let (args, _) = parse(&["webdl", PAGE, "pdf"]);
        let options = resolve_client_options(&args, None);
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_render_options_from_config() {
        let config = file_config();
        let options = resolve_render_options(Some(&config), "ua");
        assert_eq!(options.browser, BrowserKind::Edge);
        assert_eq!(options.executable, Some(PathBuf::from("/opt/edge/msedge")));
        assert_eq!(options.user_agent, "ua");
        assert_eq!(options.timeout, Duration::from_secs(15));

        let options = resolve_render_options(None, "ua");
        assert_eq!(options.browser, BrowserKind::Chrome);
        assert_eq!(options.timeout, DEFAULT_RENDER_TIMEOUT);
    }

    #[test]
    fn test_log_level_resolution() {
        let (args, sources) = parse(&["webdl", PAGE, "pdf"]);
        assert_eq!(resolve_default_log_level(&args), "info");
        assert!(!should_force_cli_log_level(&sources));

        let (args, sources) = parse(&["webdl", PAGE, "pdf", "-vv"]);
        assert_eq!(resolve_default_log_level(&args), "trace");
        assert!(should_force_cli_log_level(&sources));

        let (args, _) = parse(&["webdl", PAGE, "pdf", "-q"]);
        assert_eq!(resolve_default_log_level(&args), "error");
    }
}
