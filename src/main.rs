use anyhow::Result;
use api_client::ApiClient;
use args::{Args, Command};
use clap::Parser;
use runner::{Outcome, Runner, ServiceType};

mod api_client;
mod args;
mod graphql;
mod runner;

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(outcome) => {
            let rendered = outcome.to_string();
            if !rendered.is_empty() {
                println!("{rendered}");
            }
            std::process::exit(outcome.exit_code());
        }
        Err(error) => {
            eprintln!("{error:#}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<Outcome> {
    let runner = Runner::new(ApiClient::new(args)?);

    match &args.command {
        Command::AppsList => runner.apps_list(),
        Command::AppsCreate(arg) => runner.apps_create(&arg.name),
        Command::AppsDelete(arg) => runner.apps_delete(&arg.name),
        Command::AppsExists(arg) => runner.app_exists(&arg.name),
        Command::PostgresCreate(arg) => runner.service_create(ServiceType::Postgres, &arg.name),
        Command::PostgresDelete(arg) => runner.service_delete(ServiceType::Postgres, &arg.name),
        Command::PostgresExists(arg) => runner.service_exists(ServiceType::Postgres, &arg.name),
        Command::PostgresList => runner.service_list(ServiceType::Postgres),
        Command::PostgresLink(arg) => {
            runner.service_link(ServiceType::Postgres, &arg.name, &arg.app)
        }
        Command::PostgresUnlink(arg) => {
            runner.service_unlink(ServiceType::Postgres, &arg.name, &arg.app)
        }
        Command::RedisCreate(arg) => runner.service_create(ServiceType::Redis, &arg.name),
        Command::RedisDelete(arg) => runner.service_delete(ServiceType::Redis, &arg.name),
        Command::RedisExists(arg) => runner.service_exists(ServiceType::Redis, &arg.name),
        Command::RedisList => runner.service_list(ServiceType::Redis),
        Command::RedisLink(arg) => runner.service_link(ServiceType::Redis, &arg.name, &arg.app),
        Command::RedisUnlink(arg) => {
            runner.service_unlink(ServiceType::Redis, &arg.name, &arg.app)
        }
    }
}
