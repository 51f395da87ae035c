use anyhow::Context;
use clap::Parser;
use memory_game_harness::harness::Transcript;
use memory_game_harness::report::{self, OutputFormat};
use memory_game_harness::{
    ChromeDriver, CheckId, FailurePolicy, GameSuite, Harness, HarnessConfig, RunReport, SyncMode,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MEMORY_GAME_CONFIG")]
    config: Option<PathBuf>,

    /// Address of the game under test
    #[arg(short, long, env = "MEMORY_GAME_URL")]
    url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Keep Chrome's sandbox enabled
    #[arg(long)]
    sandbox: bool,

    /// Chrome executable to launch
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,

    /// Attach to a Chrome already listening on this remote debugging port
    #[arg(long)]
    debug_port: Option<u16>,

    /// What to do after a check fails
    #[arg(long, value_enum)]
    policy: Option<FailurePolicy>,

    /// How to wait for the page to react to an action
    #[arg(long, value_enum)]
    sync: Option<SyncMode>,

    /// Per-action timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Format of the final output on stdout
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Write a JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Save a screenshot here for every failed check
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Run only the named check (repeatable)
    #[arg(long = "only", value_name = "CHECK")]
    only: Vec<CheckId>,

    /// List the checks and exit
    #[arg(long)]
    list: bool,

    /// Exit with status 1 when any check failed
    #[arg(long)]
    strict_exit: bool,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(&self, config: &mut HarnessConfig) {
        if let Some(url) = &self.url {
            config.target_url = url.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
        if self.sandbox {
            config.browser.no_sandbox = false;
        }
        if let Some(path) = &self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }
        if let Some(port) = self.debug_port {
            config.browser.debug_port = Some(port);
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(mode) = self.sync {
            config.sync.mode = mode;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.action_timeout_ms = timeout_ms;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(path) = &self.report {
            config.report_path = Some(path.clone());
        }
        if let Some(dir) = &self.screenshot_dir {
            config.screenshot_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list {
        for id in CheckId::ALL {
            println!("{:<20} {}", id.name(), id.label());
        }
        return;
    }

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("❌ Run aborted: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path).await?,
        None => HarnessConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let suite = GameSuite::new(config.selectors.clone(), config.sync_strategy());
    let checks = if args.only.is_empty() {
        suite.checks()
    } else {
        suite.only(&args.only)
    };

    // Keep stdout clean for the JSON document
    let transcript = match config.output {
        OutputFormat::Text => Transcript::Stdout,
        OutputFormat::Json => Transcript::Stderr,
    };
    let mut harness = Harness::new(config.policy).with_transcript(transcript);
    if let Some(dir) = &config.screenshot_dir {
        harness = harness.with_screenshot_dir(dir);
    }

    log::info!(
        "Running {} checks against {} ({:?} policy, {:?} sync)",
        checks.len(),
        config.target_url,
        harness.policy(),
        config.sync.mode
    );

    let driver = ChromeDriver::launch(config.launch_options())
        .await
        .context("Cannot establish a browser session")?;

    let report = harness
        .run_session(driver, &config.target_url, &checks)
        .await
        .with_context(|| format!("Cannot load {}", config.target_url))?;

    log::info!(
        "{} of {} checks passed ({:.1}%)",
        report.passed,
        report.total,
        report.success_rate()
    );

    let closing = closing_output(&report, config.output)?;
    if let Some(line) = &closing.stderr {
        eprintln!("{}", line);
    }
    println!("{}", closing.stdout);

    if let Some(path) = &config.report_path {
        report::write_report(path, &report)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }

    Ok(if args.strict_exit && report.failed > 0 {
        1
    } else {
        0
    })
}

/// Final output, printed once after the session has been released
struct Closing {
    stdout: String,
    stderr: Option<String>,
}

fn closing_output(report: &RunReport, format: OutputFormat) -> anyhow::Result<Closing> {
    let stdout = report::render(report, format)?;
    // JSON mode keeps stdout for the document; the summary joins the transcript on stderr
    let stderr = match format {
        OutputFormat::Text => None,
        OutputFormat::Json => Some(report.summary_line()),
    };
    Ok(Closing { stdout, stderr })
}
