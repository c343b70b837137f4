//! Command dispatch
//!
//! Applies [`Command`]s to a shared [`FileSystem`] and turns each outcome into
//! the integer answer used by the batch runner and the request server.
//!
//! Print runs alone: it takes the dispatch gate exclusively while every other
//! command shares it, so a dump never interleaves with a mutation.

use crate::command::Command;
use crate::error::FsResult;
use crate::tree::FileSystem;
use parking_lot::RwLock;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Answer for a successful operation that returns no node id.
pub const SUCCESS: i32 = 0;

/// Answer when the tree dump could not be written.
pub const PRINT_FAILED: i32 = -100;

/// Answer when a request could not be parsed.
pub const BAD_REQUEST: i32 = -101;

pub struct Dispatcher {
    fs: Arc<FileSystem>,
    gate: RwLock<()>,
}

impl Dispatcher {
    pub fn new(fs: Arc<FileSystem>) -> Self {
        Self {
            fs,
            gate: RwLock::new(()),
        }
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    /// Apply `command`. Lookups answer with the node id, everything else with
    /// [`SUCCESS`]; failures answer with a negative code.
    pub fn apply(&self, command: &Command) -> i32 {
        if let Command::Print { output } = command {
            let _exclusive = self.gate.write();
            return self.print_to(output);
        }

        let _shared = self.gate.read();
        match command {
            Command::Create { path, kind } => answer(self.fs.create(path, *kind).map(|_| ())),
            Command::Delete { path } => answer(self.fs.delete(path)),
            Command::Lookup { path } => match self.fs.lookup(path) {
                Ok(id) => id.0 as i32,
                Err(err) => err.code(),
            },
            Command::Move { src, dst } => answer(self.fs.move_node(src, dst)),
            Command::Print { .. } => unreachable!("print handled above"),
        }
    }

    fn print_to(&self, output: &Path) -> i32 {
        let written = File::create(output).and_then(|file| {
            let mut writer = BufWriter::new(file);
            self.fs.print(&mut writer)?;
            writer.flush()
        });
        match written {
            Ok(()) => {
                info!("Print tree to: {}", output.display());
                SUCCESS
            }
            Err(err) => {
                error!("Print tree to: {} failed: {}", output.display(), err);
                PRINT_FAILED
            }
        }
    }
}

fn answer(result: FsResult<()>) -> i32 {
    match result {
        Ok(()) => SUCCESS,
        Err(err) => err.code(),
    }
}
