use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::cli::ProjectCommand;
use crate::config::Config;
use crate::process;

pub async fn execute(command: ProjectCommand, config: &Config) -> Result<()> {
    let projects = &config.projects_dir;
    match command {
        ProjectCommand::Exist { name } => {
            let state = if exists(projects, &name)? {
                "exists"
            } else {
                "does not exist"
            };
            println!("Project {} {} in {}", name, state, projects.display());
            Ok(())
        }
        ProjectCommand::Clone { name } => {
            tokio::fs::create_dir_all(projects)
                .await
                .with_context(|| format!("cannot create {}", projects.display()))?;
            let url = clone_url(&name);
            let mut git = process::command("git", ["clone", url.as_str()]);
            git.current_dir(projects);
            process::run(&mut git).await
        }
        ProjectCommand::Update {
            name,
            force,
            verbose,
        } => update(&projects.join(&name), force, verbose).await,
    }
}

fn exists(projects: &Path, name: &str) -> Result<bool> {
    let project = projects.join(name);
    project
        .try_exists()
        .with_context(|| format!("cannot check {}", project.display()))
}

fn clone_url(name: &str) -> String {
    format!("git@github.com:{name}.git")
}

/// Pull `project`, then every direct sub-folder that is a git repository.
///
/// With `force`, failures are logged and the remaining repositories are
/// still pulled; the first failure is reported at the end.
async fn update(project: &Path, force: bool, verbose: bool) -> Result<()> {
    println!("Updating project {}", project.display());
    let mut first_error = None;

    for repository in std::iter::once(project.to_path_buf()).chain(sub_projects(project)?) {
        if repository != project {
            println!("Updating subproject {}", repository.display());
        }

        let mut git = if verbose {
            process::command("git", ["pull"])
        } else {
            process::command("git", ["pull", "--quiet"])
        };
        git.current_dir(&repository);

        if let Err(e) = process::run(&mut git).await {
            if !force {
                return Err(e);
            }
            warn!(repository = %repository.display(), "update failed: {e:#}");
            first_error.get_or_insert(e);
        }
    }

    first_error.map_or(Ok(()), Err)
}

fn sub_projects(project: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(project).with_context(|| format!("cannot list {}", project.display()))?;

    let mut repositories = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() && path.join(".git").exists() {
            repositories.push(path);
        }
    }
    repositories.sort();
    Ok(repositories)
}
