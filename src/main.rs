use signchat::app::App;
use signchat::logger::*;
use signchat::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let app = App::try_new(&project_settings)?;

    let mut stdout = std::io::stdout().lock();
    app.run(cli.command, &mut stdout)
        .await
        .inspect_err(|e| error!("{e:#}"))?;

    Ok(())
}
