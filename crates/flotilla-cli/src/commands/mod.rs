//! CLI command implementations

pub mod delete_service;
pub mod trigger_deploy;

use flotilla_git::GitRemote;

/// Shared repository flags for commands that publish to the fleet
/// configuration repository
#[derive(Debug, clap::Args)]
pub struct GitRepoArgs {
    /// Fleet configuration repository URI
    #[arg(short = 'r', long = "git-repo", env = "GIT_REPO")]
    pub git_repo: String,

    /// Git user with access to the repository
    #[arg(short = 'u', long = "git-user", env = "GIT_USER", default_value = "")]
    pub git_user: String,

    /// Git token used by the git user
    #[arg(short = 't', long = "git-token", env = "GIT_TOKEN", default_value = "")]
    pub git_token: String,
}

impl GitRepoArgs {
    /// Remote handle with the configured credentials
    pub fn remote(&self) -> GitRemote {
        GitRemote::new(
            self.git_repo.clone(),
            self.git_user.clone(),
            self.git_token.clone(),
        )
    }
}
