//! Live Preview 命令行

use clap::{Parser, Subcommand};
use live_preview::externals::ExternalLib;
use live_preview::project::{contained_path, parse_response};
use live_preview::{Epoch, LivePreview, PreviewConfig, PreviewError, Project, Surface};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "live-preview", version, about = "Live preview engine for generated React projects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 生成浏览器预览文档
    Build {
        dir: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 无头渲染并打印表面
    Run {
        dir: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// 依次点击的元素 id / data-testid
        #[arg(long = "click")]
        clicks: Vec<String>,
    },
    /// 把生成结果中的文件变更写入目录
    Apply { dir: PathBuf, response: PathBuf },
    /// 写出起始项目
    Starter { dir: PathBuf },
    /// 列出外部库的固定源
    Bindings {
        #[arg(long)]
        verify: bool,
    },
}

fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<PreviewConfig, PreviewError> {
    if let Some(path) = explicit {
        return PreviewConfig::load(path);
    }
    let default = dir.join("preview.json");
    if default.exists() {
        PreviewConfig::load(default)
    } else {
        Ok(PreviewConfig::default())
    }
}

fn print_surface(surface: &Surface) -> bool {
    match surface {
        Surface::Blank => {
            println!("(blank)");
            true
        }
        Surface::Mounted { html } => {
            println!("{}", html);
            true
        }
        Surface::Diagnostic(d) => {
            eprintln!("❌ {}", d.kind.title());
            eprintln!("{}", d.message);
            false
        }
    }
}

fn build(dir: &Path, output: Option<&Path>, config: Option<&Path>) -> Result<(), PreviewError> {
    let config = load_config(dir, config)?;
    let project = Project::from_dir(dir)?;
    let html = LivePreview::new(config).document(&project);
    match output {
        Some(path) => {
            std::fs::write(path, html)?;
            println!("✅ wrote {}", path.display());
        }
        None => print!("{}", html),
    }
    Ok(())
}

fn run(dir: &Path, config: Option<&Path>, clicks: &[String]) -> Result<bool, PreviewError> {
    let config = load_config(dir, config)?;
    let project = Project::from_dir(dir)?;
    let mut preview = LivePreview::new(config);
    let mut surface = preview.render(&project, Epoch::default())?;
    for target in clicks {
        if surface.diagnostic().is_some() {
            break;
        }
        surface = preview.fire_event(target, "click", None)?;
    }
    Ok(print_surface(&surface))
}

fn apply(dir: &Path, response: &Path) -> Result<(), PreviewError> {
    let text = std::fs::read_to_string(response)?;
    let changes = parse_response(&text);
    if changes.legacy {
        tracing::warn!("response uses the legacy code-block format");
    }
    for path in &changes.deletions {
        let target = contained_path(dir, path)?;
        if target.exists() {
            std::fs::remove_file(&target)?;
            println!("- {}", path);
        }
    }
    Project::new(changes.files.clone()).write_to_dir(dir)?;
    for file in &changes.files {
        println!("+ {}", file.path);
    }
    if !changes.explanation.trim().is_empty() {
        println!("\n{}", changes.explanation.trim());
    }
    Ok(())
}

fn bindings(verify: bool) -> Result<bool, PreviewError> {
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(15)).build();
    let mut all_ok = true;
    for lib in ExternalLib::ALL {
        if !verify {
            println!("{:<20} {:<24} {}", lib.specifier(), lib.role(), lib.source_url());
            continue;
        }
        match agent.get(lib.source_url()).call() {
            Ok(resp) => println!("✅ {:<20} {}", lib.specifier(), resp.status()),
            Err(err) => {
                all_ok = false;
                println!("❌ {:<20} {}", lib.specifier(), PreviewError::Network(err.to_string()));
            }
        }
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Build { dir, output, config } => build(dir, output.as_deref(), config.as_deref()).map(|_| true),
        Command::Run { dir, config, clicks } => run(dir, config.as_deref(), clicks),
        Command::Apply { dir, response } => apply(dir, response).map(|_| true),
        Command::Starter { dir } => Project::starter().write_to_dir(dir).map(|_| {
            println!("✅ starter project written to {}", dir.display());
            true
        }),
        Command::Bindings { verify } => bindings(*verify),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::from(2)
        }
    }
}
