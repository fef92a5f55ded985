use microredis::config::Config;
use microredis::server;
use std::{env, process};

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.log.level.as_level_filter());
    if let Some(path) = &config.log.file {
        log::warn!(
            "logfile '{}' configured but this build always logs to stderr",
            path
        );
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    let config = match env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("fatal: could not load config '{}': {}", path, err);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    init_logging(&config);

    if let Err(err) = server::serve(config).await {
        log::error!("fatal: {}", err);
        process::exit(1);
    }
}
