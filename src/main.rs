use anirec::app::App;
use anirec::config::{self, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let file_appender = tracing_appender::rolling::never(config::data_dir()?, "anirec.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    color_eyre::install()?;

    let config = Config::load()?;
    let terminal = ratatui::init();
    let result = App::new(config)?.run(terminal).await;
    ratatui::restore();
    result
}
