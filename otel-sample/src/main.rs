use std::process::ExitCode;

use otel_sample::app;
use otel_sample::config::{AppConfig, load_dotenv};
use otel_sample::error::StartupError;
use otel_sample::observability::TracingConfig;

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();

    let result: Result<(), StartupError> = async {
        let config = AppConfig::from_env()?;
        let mut logging = TracingConfig::new();
        if config.log_json {
            logging = logging.json();
        }
        app::run(config, Some(logging)).await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "otel-sample exited with an error");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
