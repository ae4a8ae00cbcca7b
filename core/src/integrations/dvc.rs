//! Dataset version-control integration
//!
//! Shell-outs to the external `dvc` binary to track uploaded datasets and
//! push them to the configured object-storage remote. Every operation is
//! best-effort: a failing or missing `dvc` never fails the enclosing
//! request, it only leaves a warning in the log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

const REMOTE_NAME: &str = "storage";
const COMMAND_TIMEOUT_MS: u64 = 60_000;

/// Client for the external `dvc` tool
pub struct DvcClient {
    repo_root: PathBuf,
    remote_url: String,
    endpoint_url: String,
    access_key_id: String,
    secret_access_key: String,
}

impl DvcClient {
    pub fn new(settings: &crate::config::Settings) -> Self {
        Self::with_root(settings, ".")
    }

    pub fn with_root<P: AsRef<Path>>(settings: &crate::config::Settings, root: P) -> Self {
        Self {
            repo_root: root.as_ref().to_path_buf(),
            remote_url: settings.dvc_remote.clone(),
            endpoint_url: settings.s3_endpoint_url.clone(),
            access_key_id: settings.s3_access_key_id.clone(),
            secret_access_key: settings.s3_secret_access_key.clone(),
        }
    }

    /// Initialize the repository and configure the remote. Best-effort.
    pub async fn setup(&self) {
        if let Err(e) = self.try_setup().await {
            warn!("DVC setup failed: {}", e);
        }
    }

    /// Track a dataset file and push it to the remote. Best-effort.
    pub async fn add_and_push(&self, path: &Path) {
        let result = async {
            self.run(&["add", "-q", &path_str(path)]).await?;
            self.run(&["push", "-q", "-r", REMOTE_NAME]).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        match result {
            Ok(()) => info!("DVC pushed: {}", path.display()),
            Err(e) => warn!("DVC add/push failed for {}: {}", path.display(), e),
        }
    }

    /// Untrack a dataset file. Best-effort; a missing `.dvc` pointer means
    /// there is nothing to do.
    pub async fn remove(&self, path: &Path) {
        let pointer = PathBuf::from(format!("{}.dvc", path.display()));
        if !pointer.exists() {
            return;
        }

        match self
            .run(&["remove", "-q", "--outs", "--force", &path_str(&pointer)])
            .await
        {
            Ok(_) => info!("DVC removed: {}", pointer.display()),
            Err(e) => warn!("DVC remove failed for {}: {}", path.display(), e),
        }
    }

    async fn try_setup(&self) -> Result<()> {
        if !self.repo_root.join(".dvc").exists() {
            self.run(&["init", "--no-scm", "-q"]).await?;
            info!("DVC initialized (--no-scm)");
        }

        let remotes = self.run(&["remote", "list"]).await.unwrap_or_default();

        if !remotes.contains(REMOTE_NAME) {
            self.run(&["remote", "add", "-f", REMOTE_NAME, &self.remote_url])
                .await?;
            self.run(&["remote", "modify", REMOTE_NAME, "endpointurl", &self.endpoint_url])
                .await?;
            if !self.access_key_id.is_empty() {
                self.run(&["remote", "modify", REMOTE_NAME, "access_key_id", &self.access_key_id])
                    .await?;
            }
            if !self.secret_access_key.is_empty() {
                self.run(&[
                    "remote",
                    "modify",
                    REMOTE_NAME,
                    "secret_access_key",
                    &self.secret_access_key,
                ])
                .await?;
            }
            info!("DVC remote configured: {} -> {}", REMOTE_NAME, self.remote_url);
        }

        Ok(())
    }

    /// Execute a dvc command and capture its standard output.
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("exec: dvc {}", args.join(" "));

        let mut cmd = Command::new("dvc");
        cmd.args(args)
            .current_dir(&self.repo_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in self.child_env() {
            cmd.env(key, value);
        }

        let spawned = cmd.spawn().context("Failed to spawn dvc")?;
        let output = tokio::time::timeout(
            std::time::Duration::from_millis(COMMAND_TIMEOUT_MS),
            spawned.wait_with_output(),
        )
        .await
        .context("dvc command timed out")?
        .context("Failed to wait for dvc")?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            anyhow::bail!(
                "dvc exited with {:?}: {}",
                output.status.code(),
                if stderr.is_empty() { stdout } else { stderr }
            );
        }

        Ok(stdout)
    }

    /// Credentials for the child process. Values already present in the
    /// parent environment win.
    fn child_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        let mut set_default = |key: &str, value: &str| {
            if std::env::var(key).is_err() && !value.is_empty() {
                env.insert(key.to_string(), value.to_string());
            }
        };
        set_default("AWS_ACCESS_KEY_ID", &self.access_key_id);
        set_default("AWS_SECRET_ACCESS_KEY", &self.secret_access_key);
        set_default("AWS_ENDPOINT_URL", &self.endpoint_url);
        set_default("AWS_DEFAULT_REGION", "us-east-1");
        env
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}
