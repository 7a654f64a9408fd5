//! Script execution against the remote D1 database
//!
//! [`WranglerExecutor`] shells out to `wrangler d1 execute --remote`. Short
//! scripts are passed inline with `--command`; longer ones are written to a
//! temporary file and passed with `--file`.

use std::path::PathBuf;
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::RemoteStoreConfig;
use crate::domain::{StorageError, StorageResult};

/// One result row as returned by the remote database
pub type RemoteRow = Map<String, Value>;

/// Capability to run SQL scripts on the remote database
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Runs a write script; a non-zero exit is a storage fault.
    async fn execute(&self, script: &str) -> StorageResult<()>;

    /// Runs a read-only script and returns the rows of every result set.
    async fn query(&self, script: &str) -> StorageResult<Vec<RemoteRow>>;
}

pub struct WranglerExecutor {
    config: RemoteStoreConfig,
}

enum ScriptArg {
    Inline(String),
    File(PathBuf),
}

impl WranglerExecutor {
    pub const fn new(config: RemoteStoreConfig) -> Self {
        Self { config }
    }

    async fn prepare(&self, script: &str) -> StorageResult<ScriptArg> {
        if script.chars().count() <= self.config.command_chars {
            return Ok(ScriptArg::Inline(script.to_string()));
        }
        let path = std::env::temp_dir().join(format!("pokeca-{}.sql", Uuid::new_v4()));
        tokio::fs::write(&path, script).await?;
        Ok(ScriptArg::File(path))
    }

    async fn run(&self, script: &str, json: bool) -> StorageResult<Output> {
        let arg = self.prepare(script).await?;

        let mut cmd = Command::new(&self.config.program);
        if self.config.program == "npx" {
            cmd.arg("wrangler");
        }
        cmd.args(["d1", "execute", &self.config.database_name, "--remote"]);
        if json {
            cmd.arg("--json");
        }
        match &arg {
            ScriptArg::Inline(sql) => cmd.arg("--command").arg(sql),
            ScriptArg::File(path) => cmd.arg("--file").arg(path),
        };
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);

        debug!(
            chars = script.chars().count(),
            via_file = matches!(arg, ScriptArg::File(_)),
            "Running remote script"
        );
        let result = cmd.output().await;

        if let ScriptArg::File(path) = &arg {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Failed to remove temporary script {}: {}", path.display(), e);
            }
        }

        let output = result?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(StorageError::RemoteExecution {
                status: output.status.code(),
                message: failure_message(&output),
            })
        }
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    message.trim().chars().take(2000).collect()
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    results: Vec<RemoteRow>,
}

/// Rows from wrangler's `[{"results": [...]}, ...]` output.
///
/// Banners and warnings may surround the JSON and contain brackets of their
/// own, so each `[` is tried in turn as the start of the result array. Text
/// after the array is ignored.
pub fn parse_query_output(stdout: &str) -> StorageResult<Vec<RemoteRow>> {
    let mut saw_empty_array = false;
    let mut last_error = None;
    for (start, _) in stdout.match_indices('[') {
        let mut deserializer = serde_json::Deserializer::from_str(&stdout[start..]);
        match Vec::<ResultSet>::deserialize(&mut deserializer) {
            Ok(sets) if sets.is_empty() => saw_empty_array = true,
            Ok(sets) => return Ok(sets.into_iter().flat_map(|set| set.results).collect()),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    if saw_empty_array {
        return Ok(Vec::new());
    }
    Err(StorageError::RemoteOutput {
        reason: last_error.unwrap_or_else(|| "no JSON array in output".to_string()),
    })
}

#[async_trait]
impl RemoteExecutor for WranglerExecutor {
    async fn execute(&self, script: &str) -> StorageResult<()> {
        self.run(script, false).await.map(|_| ())
    }

    async fn query(&self, script: &str) -> StorageResult<Vec<RemoteRow>> {
        let output = self.run(script, true).await?;
        parse_query_output(&String::from_utf8_lossy(&output.stdout))
    }
}
