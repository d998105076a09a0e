//! Chart provisioner capability
//!
//! Turnkey components (git server, CI runner) are installed from packaged
//! charts. The installer is an external collaborator consumed through this
//! two-operation interface; [`HelmProvisioner`] adapts it to the helm CLI.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Install/uninstall of packaged components by name and values
#[async_trait]
pub trait ChartProvisioner: Send + Sync {
    /// Installs (or upgrades) a chart release into a namespace
    async fn install(
        &self,
        chart: &str,
        release: &str,
        namespace: &str,
        values: serde_json::Value,
    ) -> anyhow::Result<()>;

    /// Uninstalls a chart release from a namespace
    async fn uninstall(&self, release: &str, namespace: &str) -> anyhow::Result<()>;
}

/// Provisioner backed by the helm CLI
pub struct HelmProvisioner {
    helm_bin: String,
}

impl HelmProvisioner {
    pub fn new(helm_bin: impl Into<String>) -> Self {
        Self {
            helm_bin: helm_bin.into(),
        }
    }

    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> anyhow::Result<()> {
        debug!(helm = %self.helm_bin, ?args, "running helm");

        let mut command = Command::new(&self.helm_bin);
        command
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;

        if let Some(input) = stdin {
            use tokio::io::AsyncWriteExt;
            let mut handle = child
                .stdin
                .take()
                .ok_or_else(|| anyhow::anyhow!("helm stdin unavailable"))?;
            handle.write_all(input).await?;
            drop(handle);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            anyhow::bail!(
                "helm {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl ChartProvisioner for HelmProvisioner {
    async fn install(
        &self,
        chart: &str,
        release: &str,
        namespace: &str,
        values: serde_json::Value,
    ) -> anyhow::Result<()> {
        // JSON is valid YAML, so the values document goes straight to stdin
        let values_doc = serde_json::to_vec(&values)?;

        self.run(
            &[
                "upgrade",
                "--install",
                release,
                chart,
                "--namespace",
                namespace,
                "--create-namespace",
                "--values",
                "-",
            ],
            Some(&values_doc),
        )
        .await
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> anyhow::Result<()> {
        self.run(&["uninstall", release, "--namespace", namespace], None)
            .await
    }
}
