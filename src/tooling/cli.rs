//! CLI Tooling
//!
//! Command-line interface for treefs. Each subcommand builds its own
//! filesystem from the loaded configuration.

use crate::batch;
use crate::client::Client;
use crate::command::Command;
use crate::config::{ConfigLoader, TreeFsConfig};
use crate::dispatch::Dispatcher;
use crate::error::{ApiError, FsError};
use crate::logging::LoggingConfig;
use crate::server::Server;
use crate::tree::FileSystem;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// treefs - concurrent in-memory hierarchical filesystem
#[derive(Parser)]
#[command(name = "treefs")]
#[command(about = "Concurrent in-memory hierarchical filesystem over an inode table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces ./treefs.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply the logging flags on top of the configured settings.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if self.log_file.is_some() {
            config.file = self.log_file.clone();
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a command file with concurrent workers and dump the final tree
    Run {
        /// Command file, one command per line
        input: PathBuf,
        /// Where to write the final tree
        output: PathBuf,
        /// Worker threads (default: batch.threads)
        #[arg(long)]
        threads: Option<usize>,
        /// Tree dump format
        #[arg(long, value_enum, default_value = "text")]
        format: DumpFormat,
    },
    /// Serve commands over a Unix datagram socket until interrupted
    Serve {
        /// Socket path (default: server.socket)
        #[arg(long)]
        socket: Option<PathBuf>,
        /// Worker tasks (default: server.threads)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Send one command to a running server and print the answer
    Send {
        /// Server socket path (default: server.socket)
        #[arg(long)]
        socket: Option<PathBuf>,
        /// Socket path to receive the answer on
        #[arg(long)]
        client_socket: Option<PathBuf>,
        /// Command words, e.g. `c /a d`
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    Text,
    Json,
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: TreeFsConfig,
}

impl CliContext {
    /// Load configuration and create a context
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: TreeFsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TreeFsConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                input,
                output,
                threads,
                format,
            } => self.handle_run(input, output, *threads, *format),
            Commands::Serve { socket, threads } => {
                self.handle_serve(socket.as_deref(), *threads)
            }
            Commands::Send {
                socket,
                client_socket,
                command,
            } => self.handle_send(socket.as_deref(), client_socket.as_deref(), command),
        }
    }

    fn handle_run(
        &self,
        input: &Path,
        output: &Path,
        threads: Option<usize>,
        format: DumpFormat,
    ) -> Result<String, ApiError> {
        let reader = BufReader::new(File::open(input).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", input.display(), e))
        })?);

        let mut batch_config = self.config.batch.clone();
        if let Some(threads) = threads {
            batch_config.threads = threads;
        }

        let dispatcher = Dispatcher::new(Arc::new(FileSystem::new(&self.config)));
        let stats = batch::run(&dispatcher, reader, &batch_config)?;

        let snapshot = dispatcher.fs().snapshot();
        let mut writer = BufWriter::new(File::create(output)?);
        match format {
            DumpFormat::Text => snapshot.write_text(&mut writer)?,
            DumpFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &snapshot).map_err(std::io::Error::from)?;
                writeln!(writer)?;
            }
        }
        writer.flush()?;
        info!("Tree written to {}", output.display());

        Ok(format!(
            "treefs completed in {:.4} seconds ({} commands, {} failed)",
            stats.elapsed.as_secs_f64(),
            stats.commands,
            stats.failed
        ))
    }

    fn handle_serve(&self, socket: Option<&Path>, threads: Option<usize>) -> Result<String, ApiError> {
        let socket = socket.unwrap_or(self.config.server.socket.as_path()).to_path_buf();
        let threads = threads.unwrap_or(self.config.server.threads);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(FileSystem::new(&self.config))));

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        rt.block_on(async {
            let server = Server::bind(&socket, dispatcher, threads)?;
            server
                .serve(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        })?;

        Ok(format!("Server on {} stopped", socket.display()))
    }

    fn handle_send(
        &self,
        socket: Option<&Path>,
        client_socket: Option<&Path>,
        words: &[String],
    ) -> Result<String, ApiError> {
        let line = words.join(" ");
        let command: Command = line
            .parse()
            .map_err(|reason| ApiError::Parse { line: 1, reason })?;
        let server = socket.unwrap_or(self.config.server.socket.as_path()).to_path_buf();
        let local = client_socket.map(Path::to_path_buf).unwrap_or_else(|| {
            std::env::temp_dir().join(format!("treefs-client-{}.sock", std::process::id()))
        });

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let answer = rt.block_on(async {
            let mut client = Client::mount(&server, &local)?;
            let answer = client.request(&command).await;
            client.unmount()?;
            answer
        })?;

        Ok(describe_answer(&command, answer))
    }
}

fn describe_answer(command: &Command, answer: i32) -> String {
    match (command, FsError::from_code(answer)) {
        (_, Some(err)) => format!("{}: {} ({})", command, answer, err),
        (Command::Lookup { .. }, None) if answer >= 0 => format!("{}: inode {}", command, answer),
        _ => format!("{}: {}", command, answer),
    }
}
