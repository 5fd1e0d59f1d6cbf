use delay_scorer::{app, config::Config, logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    logger::init_logger(config.log_format);

    app::run(config).await
}
