//! ZCAD 外部引用命令行工具
//!
//! - `xref parts`：列出容器文件中的部件
//! - `xref extract`：解析一个部件并导出 BREP 数据
//! - `xref watch`：监视源文件，变化时自动重新加载

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use xref_core::prelude::*;
use xref_ui::{ReferenceCommand, ReferencePanel};

type SharedReference = Rc<RefCell<ExternalReference<BrepDecoder>>>;

#[derive(Parser)]
#[command(name = "xref")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ZCAD external reference tool", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the parts stored in a container file
    Parts {
        /// Container file (.FCStd)
        file: PathBuf,

        /// Print the index as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve one part and write its BREP data
    Extract {
        /// Container file (.FCStd)
        file: PathBuf,

        /// Part label
        part: String,

        /// Output file (prints a summary if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve one part and reload it whenever the container changes
    Watch {
        /// Container file (.FCStd)
        file: PathBuf,

        /// Part label
        part: String,

        /// Check interval in seconds (overrides preferences)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Preferences file (JSON)
        #[arg(long, env = "XREF_PREFERENCES")]
        prefs: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志（输出到 stderr，stdout 留给命令结果）
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(io::stderr)
            .finish(),
    )?;

    match cli.command {
        Commands::Parts { file, json } => list_parts(&file, json),
        Commands::Extract { file, part, output } => extract(&file, &part, output.as_deref()),
        Commands::Watch {
            file,
            part,
            interval,
            prefs,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, watch(file, part, interval, prefs))
        }
    }
}

/// 列出部件
fn list_parts(file: &Path, json: bool) -> Result<()> {
    let index = xref_file::scan(file)
        .with_context(|| format!("Failed to scan {}", file.display()))?;

    if json {
        let entries: BTreeMap<&str, &str> = index.iter().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    match xref_file::modified_time(file) {
        Ok(modified) => println!(
            "{} ({} parts, modified {})",
            file.display(),
            index.len(),
            format_time(modified)
        ),
        Err(_) => println!("{} ({} parts)", file.display(), index.len()),
    }
    for (label, blob) in index.iter() {
        println!("  {}\t{}", label, blob);
    }
    Ok(())
}

fn format_time(seconds: f64) -> String {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| seconds.to_string())
}

/// 解析一个部件并导出
fn extract(file: &Path, part: &str, output: Option<&Path>) -> Result<()> {
    let mut reference = make_reference(BrepDecoder, Some(file), Some(part), DEFAULT_LABEL);

    if let ResolveOutcome::Failed(e) = reference.execute() {
        return Err(e).with_context(|| format!("Failed to resolve '{}'", part));
    }
    let shape = reference.shape().context("No shape resolved")?;

    match output {
        Some(path) => {
            std::fs::write(path, &shape.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", shape.len(), path.display());
        }
        None => println!(
            "{}: {} bytes, BREP topology V{}",
            part,
            shape.len(),
            shape.topology_version
        ),
    }
    Ok(())
}

/// 监视模式下的宿主：重算请求进入队列，由主循环执行
struct WatchHost {
    recompute: mpsc::UnboundedSender<ReferenceId>,
}

impl RecomputeScheduler for WatchHost {
    fn request_recompute(&self, id: ReferenceId) {
        if self.recompute.send(id).is_err() {
            warn!("Recompute queue closed, dropping request for {}", id);
        }
    }
}

impl DocumentOpener for WatchHost {
    fn open_document(&self, path: &Path) -> io::Result<()> {
        info!("Open requested: {}", path.display());
        Ok(())
    }
}

async fn watch(
    file: PathBuf,
    part: String,
    interval: Option<u64>,
    prefs: Option<PathBuf>,
) -> Result<()> {
    let mut preferences = match &prefs {
        Some(path) => Preferences::load(path)
            .with_context(|| format!("Failed to load preferences {}", path.display()))?,
        None => Preferences::default(),
    };
    if let Some(seconds) = interval {
        preferences.reference_check_interval = seconds;
    }

    let reference: SharedReference = Rc::new(RefCell::new(make_reference(
        BrepDecoder,
        Some(file.as_path()),
        Some(part.as_str()),
        DEFAULT_LABEL,
    )));
    reference
        .borrow_mut()
        .set_timestamp(xref_file::modified_time(&file).ok());
    recompute(&reference);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let host = Rc::new(WatchHost { recompute: tx });

    let detector = ChangeDetector::attach(&reference, &preferences, host.clone());
    info!(
        "Watching {} every {}s (commands: reload, open, parts, quit)",
        file.display(),
        detector.interval().as_secs()
    );
    tokio::task::spawn_local(detector.run());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            Some(_) = rx.recv() => recompute(&reference),
            line = stdin.next_line(), if stdin_open => match line? {
                Some(command) => {
                    if !handle_command(command.trim(), &reference, &host)? {
                        break;
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    Ok(())
}

fn recompute(reference: &SharedReference) {
    let mut reference = reference.borrow_mut();
    match reference.execute() {
        ResolveOutcome::Resolved => {
            if let Some(shape) = reference.shape() {
                info!(
                    "'{}' loaded: {} bytes, BREP topology V{}",
                    reference.part(),
                    shape.len(),
                    shape.topology_version
                );
            }
        }
        ResolveOutcome::Failed(e) => warn!("Keeping previous shape: {}", e),
        ResolveOutcome::Clean | ResolveOutcome::Incomplete => {}
    }
}

/// 处理一条交互命令，返回是否继续
fn handle_command(command: &str, reference: &SharedReference, host: &WatchHost) -> Result<bool> {
    match command {
        "" => {}
        "r" | "reload" => {
            ReferenceCommand::Reload.run(&mut *reference.borrow_mut(), host)?;
        }
        "o" | "open" => {
            ReferenceCommand::Open.run(&mut *reference.borrow_mut(), host)?;
        }
        "p" | "parts" => {
            let panel = ReferencePanel::open(&*reference.borrow());
            for part in panel.parts() {
                let marker = if panel.selected_part() == Some(part.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}", marker, part);
            }
        }
        "q" | "quit" => return Ok(false),
        other => warn!("Unknown command '{}' (reload, open, parts, quit)", other),
    }
    Ok(true)
}
