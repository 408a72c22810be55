//! Local checkout of a pull request, rebased onto its base branch

use crate::error::{Error, Result};
use crate::git::{CommandRunner, Git};
use crate::patch::Patch;
use crate::types::{PrRef, PullRequest};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Clone URL of `pr`'s repository on the host serving `html_url`
pub fn clone_url(pr: &PrRef, html_url: &str) -> Result<Url> {
    let base = Url::parse(html_url)
        .map_err(|e| Error::Config(format!("invalid pull request URL '{html_url}': {e}")))?;
    base.join(&format!("/{}/{}.git", pr.org, pr.repo))
        .map_err(|e| Error::Config(format!("invalid clone URL for {pr}: {e}")))
}

/// `url` with `user:token` credentials embedded
pub fn with_credentials(mut url: Url, user: Option<&str>, token: &str) -> Result<Url> {
    let user = user.filter(|u| !u.is_empty()).unwrap_or("x-access-token");
    url.set_username(user)
        .and_then(|()| url.set_password(Some(token)))
        .map_err(|()| Error::Config(format!("cannot embed credentials in {url}")))?;
    Ok(url)
}

/// How to obtain the checkout
#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    /// Parent directory for fresh clones
    pub workdir: PathBuf,
    /// Use this existing clone instead (e.g. `GITHUB_WORKSPACE`)
    pub existing: Option<PathBuf>,
    /// Branch to rebase onto; the PR's base when `None`
    pub base: Option<String>,
    /// GitHub user for the clone URL
    pub user: Option<String>,
    /// Token for the clone URL
    pub token: Option<String>,
}

/// A PR checked out and rebased, with its commits as patches
pub struct PrCheckout<'a> {
    /// The clone, HEAD at the rebased PR
    pub git: Git<'a>,
    /// Base branch the PR was rebased onto
    pub base: String,
    /// The PR's commits, oldest first
    pub patches: Vec<Patch>,
}

impl<'a> PrCheckout<'a> {
    /// Clone (or reuse) the repository, fetch the PR head and rebase it
    pub async fn prepare(
        runner: &'a dyn CommandRunner,
        pr_ref: &PrRef,
        pr: &PullRequest,
        options: &CheckoutOptions,
    ) -> Result<Self> {
        let base = options.base.clone().unwrap_or_else(|| pr.base_ref.clone());
        let dir = options
            .existing
            .clone()
            .unwrap_or_else(|| options.workdir.join(format!("{}-pr-{}", pr_ref.repo, pr_ref.number)));

        let git = if dir.join(".git").exists() {
            info!(path = %dir.display(), "using existing repository");
            let git = Git::new(runner, &dir);
            match options.token.as_deref() {
                Some(token) => git.with_secret(token),
                None => git,
            }
        } else {
            let url = clone_url(pr_ref, &pr.html_url)?;
            let url = match options.token.as_deref() {
                Some(token) => with_credentials(url, options.user.as_deref(), token)?,
                None => url,
            };
            info!(to = %dir.display(), "cloning git repository");
            Git::clone(
                runner,
                url.as_str(),
                &dir,
                Some(&base),
                options.token.as_deref(),
            )
            .await?
        };

        let refname = format!("refs/pull/{}/head", pr_ref.number);
        info!(pr = %pr_ref, "fetching pull request");
        git.fetch("origin", &format!("+{refname}:{refname}")).await?;
        git.fetch("origin", &base).await?;
        git.checkout(&refname).await?;

        info!(pr = %pr_ref, base, "rebasing pull request");
        let upstream = format!("origin/{base}");
        git.rebase(&upstream).await?;

        let limit = pr.commits.and_then(|c| usize::try_from(c).ok());
        let patches = git.patches_since(&upstream, limit).await?;
        info!(pr = %pr_ref, patches = patches.len(), "generated patches");

        Ok(Self { git, base, patches })
    }

    /// Directory of the clone
    pub fn dir(&self) -> &Path {
        self.git.dir()
    }

    /// Write every patch as a file under `dir`, returning the paths in order
    pub fn write_patches(&self, pr_ref: &PrRef, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        self.patches
            .iter()
            .enumerate()
            .map(|(i, patch)| {
                let path = dir.join(patch.file_name(&pr_ref.repo, pr_ref.number, i + 1));
                std::fs::write(&path, patch.to_mbox())?;
                Ok(path)
            })
            .collect()
    }
}
