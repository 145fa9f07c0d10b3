use std::fs;
use std::io::{self, Read, Write};
use std::process;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use autotranslate::dom::{html_to_dom, serialize_document, LiveDocument};
use autotranslate::env::{core::LogLevel, EnvVar};
use autotranslate::translation::{
    ConfigManager, FixedLanguage, HttpBackend, TokioFrameScheduler, TranslationError,
    TranslationResult, TranslatorConfig, TranslatorEngine,
};

const DEFAULT_CHARSET: &str = "utf-8";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(
    name = "autotranslate",
    version,
    about = "Translate the visible text of an HTML document in place"
)]
struct Cli {
    /// Path to the HTML document, or "-" for stdin
    input: String,

    /// Write the translated document to this file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Target language code; omitted means the backend default
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Translation backend base URL
    #[arg(short = 'a', long = "api-base")]
    api_base: Option<String>,

    /// Charset of the input document, also used for the output
    #[arg(short = 'c', long, default_value = DEFAULT_CHARSET)]
    charset: String,

    /// Give up waiting for the backend after this many milliseconds
    #[arg(short = 't', long = "timeout", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Configuration file (TOML or JSON)
    #[arg(long)]
    config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let level = LogLevel::get()
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> TranslationResult<TranslatorConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?.into_config(),
        None => ConfigManager::new()?.into_config(),
    };

    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.trim_end_matches('/').to_string();
        config.validate()?;
    }

    Ok(config)
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input)
    }
}

fn write_output(output: Option<&str>, data: &[u8]) -> io::Result<()> {
    match output {
        Some(path) => fs::write(path, data),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()
        }
    }
}

fn run(cli: &Cli) -> TranslationResult<()> {
    let config = load_config(cli)?;

    let data = read_input(&cli.input)
        .map_err(|e| TranslationError::InvalidInput(format!("无法读取 {}: {}", cli.input, e)))?;
    let dom = html_to_dom(&data, &cli.charset)?;
    let document = Rc::new(LiveDocument::new(dom));

    let engine = TranslatorEngine::new(
        config.clone(),
        document.clone(),
        Rc::new(HttpBackend::new(&config)?),
        Rc::new(TokioFrameScheduler::new(config.frame_interval())),
        Rc::new(FixedLanguage::new(cli.lang.as_deref().unwrap_or_default())),
    )?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TranslationError::InternalError(format!("创建异步运行时失败: {}", e)))?;
    let local = tokio::task::LocalSet::new();

    let timeout = Duration::from_millis(cli.timeout_ms);
    let finished = local.block_on(&runtime, wait_until_idle(&engine, timeout));

    if finished {
        tracing::info!("翻译完成: {:?}", engine.stats());
    } else {
        tracing::warn!(
            "等待超时，仍有 {} 个节点未翻译，输出部分结果",
            engine.pending_count()
        );
    }
    engine.shutdown();

    let output = serialize_document(document.dom(), &cli.charset)?;
    write_output(cli.output.as_deref(), &output)?;

    Ok(())
}

/// 启动引擎并等待它没有剩余工作，超时返回 `false`
async fn wait_until_idle(engine: &TranslatorEngine, timeout: Duration) -> bool {
    engine.start();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        tokio::time::sleep(IDLE_POLL_INTERVAL).await;

        if engine.is_idle() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
    }
}
