use anyhow::Result;
use clap::Parser;
use todosync::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env_file = todosync::env_manager::load_env_file();
    let cli = Cli::parse();
    todosync::run(cli, env_file).await
}
