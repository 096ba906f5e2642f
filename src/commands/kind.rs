use anyhow::{Context, Result, bail};
use std::io::Write;

use crate::cli::{ClusterCommand, KindCommand};
use crate::process;

const DASHBOARD_NAMESPACE: &str = "kubernetes-dashboard";

const DASHBOARD_PROXY_URL: &str = "http://localhost:8001/api/v1/namespaces/kubernetes-dashboard/services/https:kubernetes-dashboard:/proxy/";

/// Service account with cluster-admin rights, used to log into the dashboard.
const ADMIN_USER_MANIFEST: &str = "\
apiVersion: v1
kind: ServiceAccount
metadata:
  name: admin-user
  namespace: kubernetes-dashboard
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: admin-user
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: cluster-admin
subjects:
- kind: ServiceAccount
  name: admin-user
  namespace: kubernetes-dashboard
";

pub async fn execute(command: KindCommand) -> Result<()> {
    match command {
        KindCommand::Cluster {
            command:
                ClusterCommand::Create {
                    name,
                    dashboard_version,
                },
        } => {
            process::run(&mut process::command(
                "kind",
                ["create", "cluster", "--name", name.as_str()],
            ))
            .await?;
            install_dashboard(&dashboard_version).await
        }
        KindCommand::Cluster {
            command: ClusterCommand::Delete { name },
        } => {
            process::run(&mut process::command(
                "kind",
                ["delete", "cluster", "--name", name.as_str()],
            ))
            .await
        }
        KindCommand::Token => token().await,
    }
}

fn dashboard_manifest_url(version: &str) -> String {
    format!("https://raw.githubusercontent.com/kubernetes/dashboard/{version}/aio/deploy/recommended.yaml")
}

async fn install_dashboard(version: &str) -> Result<()> {
    let url = dashboard_manifest_url(version);
    process::run(&mut process::command("kubectl", ["apply", "-f", url.as_str()])).await?;

    let mut manifest = tempfile::Builder::new()
        .prefix("devcore-admin-user-")
        .suffix(".yaml")
        .tempfile()
        .context("cannot create the admin user manifest")?;
    manifest.write_all(ADMIN_USER_MANIFEST.as_bytes())?;
    manifest.flush()?;

    let mut apply = process::command("kubectl", ["apply", "-f"]);
    apply.arg(manifest.path());
    process::run(&mut apply).await
}

/// Copy the dashboard login token and open the dashboard through `kubectl proxy`.
async fn token() -> Result<()> {
    let secret = process::output(&mut process::command(
        "kubectl",
        [
            "-n",
            DASHBOARD_NAMESPACE,
            "get",
            "sa/admin-user",
            "-o",
            "jsonpath={.secrets[0].name}",
        ],
    ))
    .await?;
    let secret = secret.trim();
    if secret.is_empty() {
        bail!("the admin-user service account has no token secret");
    }

    let token = process::output(&mut process::command(
        "kubectl",
        [
            "-n",
            DASHBOARD_NAMESPACE,
            "get",
            "secret",
            secret,
            "-o",
            "go-template={{.data.token | base64decode}}",
        ],
    ))
    .await?;

    process::copy_to_clipboard(token.trim()).await?;
    println!("Token copied to your clipboard.");
    process::open(DASHBOARD_PROXY_URL).await
}
