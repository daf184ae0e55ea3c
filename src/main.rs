mod cli;

use actix_web::{App, HttpServer};
use simdex::{Index, IndexKind, Metric};

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        let mut index = Index::new(IndexKind::Flat, Metric::SquaredL2);
        cli::run_repl(&mut index);
    } else if args[1] == "serve" {
        log::info!("listening on 0.0.0.0:7878");
        HttpServer::new(|| App::new().configure(simdex::server::config))
            .bind("0.0.0.0:7878")?
            .run()
            .await?;
    } else {
        cli::run_single_command();
    }

    Ok(())
}
