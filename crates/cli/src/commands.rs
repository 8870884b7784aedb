//! Subcommand execution.

use crate::cli::{Cli, Commands};
use crate::config::Config;
use ciartifact_cache::LocalCacheStore;
use ciartifact_core::{ArtifactResolver, Environment, Resolution, TracingReporter};
use ciartifact_github::GitHubClient;
use tracing::debug;

/// Collaborators shared by every subcommand.
struct Context {
    config: Config,
    client: GitHubClient,
    store: LocalCacheStore,
    reporter: TracingReporter,
}

impl Context {
    fn from_cli(cli: &Cli) -> miette::Result<Self> {
        let mut config = Config::load(&cli.config)?;
        config.apply_overrides(cli);
        config.validate()?;

        let client = GitHubClient::with_base_url(&config.github.api_url, cli.token.as_deref())?;
        let store = LocalCacheStore::new(config.cache_dir()?);
        debug!(
            config = %cli.config.display(),
            api_url = %config.github.api_url,
            cache_dir = %store.root().display(),
            "Loaded configuration"
        );

        Ok(Self {
            config,
            client,
            store,
            reporter: TracingReporter::new(),
        })
    }

    fn resolver(&self) -> ArtifactResolver<'_> {
        ArtifactResolver::new(
            &self.client,
            &self.store,
            &self.reporter,
            self.config.platform(),
        )
        .with_schema_version(&self.config.schema_version)
        .with_workflow(&self.config.github.workflow)
    }
}

pub async fn execute(cli: Cli) -> miette::Result<()> {
    let context = Context::from_cli(&cli)?;
    let resolver = context.resolver();
    let mut env = context.config.environment.clone();

    match cli.command {
        Commands::Key { target } => {
            let key = resolver
                .cache_key(&target.repository, &target.branch, &env)
                .await?;
            println!("{key}");
        }
        Commands::Restore {
            target,
            install_dir,
        } => {
            let hit = resolver
                .restore_cache(&target.repository, &target.branch, &install_dir, &mut env)
                .await?;
            println!("cache-hit={hit}");
            print_install_paths(&env);
        }
        Commands::Save { target, target_dir } => {
            let saved = resolver
                .save_cache(&target.repository, &target.branch, &target_dir, &env)
                .await?;
            println!("saved={saved}");
        }
        Commands::Download {
            target,
            download_dir,
            install_dir,
        } => {
            resolver
                .download_artifact(
                    &target.repository,
                    &target.branch,
                    &download_dir,
                    &install_dir,
                    &mut env,
                )
                .await?;
            print_install_paths(&env);
        }
        Commands::Resolve {
            target,
            download_dir,
            install_dir,
            no_save,
        } => {
            let resolution = resolver
                .resolve(
                    &target.repository,
                    &target.branch,
                    &download_dir,
                    &install_dir,
                    !no_save,
                    &mut env,
                )
                .await?;
            match resolution {
                Resolution::CacheHit => println!("cache-hit=true"),
                Resolution::Downloaded { saved } => {
                    println!("cache-hit=false");
                    println!("saved={saved}");
                }
            }
            print_install_paths(&env);
        }
    }

    Ok(())
}

/// One `name=path` line per installed package.
fn print_install_paths(env: &Environment) {
    for (name, path) in &env.install_paths {
        println!("{name}={}", path.display());
    }
}
