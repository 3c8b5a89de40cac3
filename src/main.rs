use std::io;

use log::info;
use risk_form::{repl, ClientConfig, FormController, HttpClient};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let config = ClientConfig::from_env();
    info!("prediction API: {}", config.base_url);
    info!("request timeout: {}s", config.timeout.as_secs());

    let mut form = FormController::new(HttpClient::new(config));

    println!("Insurance risk prediction. Type `help` for commands.");
    let stdin = io::stdin();
    repl::run(&mut form, stdin.lock(), io::stdout()).await?;

    info!("bye");
    Ok(())
}
