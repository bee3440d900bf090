use anyhow::Context;
use clap::Parser;
use uuid::Uuid;

use quizline::config::{self, Cli, Command};
use quizline::generator::GeneratorService;
use quizline::models::Quiz;
use quizline::{live, logging, Player};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Play(args) => {
            logging::init_file(&args.log_file)
                .with_context(|| format!("failed to open log file {}", args.log_file.display()))?;

            let provider = config::quiz_provider(args.questions.as_ref(), &cli.backend)?;
            let sink = config::result_sink(args.results.as_ref(), &cli.backend)?;

            let player = Player::load(
                provider.as_ref(),
                sink,
                &args.quiz,
                args.participant(),
                args.settings(),
            )
            .await;
            player.run().await?;
        }
        Command::Serve(args) => {
            logging::init_stderr();
            let provider = config::quiz_provider(args.questions.as_ref(), &cli.backend)?;
            live::run(args.port, provider)
                .await
                .context("live session server failed")?;
        }
        Command::Generate(args) => {
            logging::init_stderr();
            let service = GeneratorService::from_config(args.generator_config());
            let questions = service.client()?.generate(&args.topic, args.count).await?;

            let quiz = Quiz::new(Uuid::new_v4().to_string(), args.topic.clone(), questions);
            println!("{}", serde_json::to_string_pretty(&quiz)?);
        }
    }

    Ok(())
}
