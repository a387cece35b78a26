use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{fs, path::Path};

#[derive(Parser, Debug)]
#[command(name = "dds-client", version, about = "A simple dds client")]
pub struct Args {
    /// Base URL of the Dash Enterprise server
    #[arg(long, required = true, env = "DASH_ENTERPRISE_URL")]
    pub url: String,

    /// Account username
    #[arg(long, required = true, env = "DASH_ENTERPRISE_USERNAME")]
    pub username: String,

    /// API key, or path to a file containing it
    #[arg(long, required = true, env = "DASH_ENTERPRISE_API_KEY")]
    pub api_key: String,

    /// Skip TLS certificate verification
    #[arg(long, env = "DASH_ENTERPRISE_INSECURE_TLS")]
    pub insecure_tls: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all apps
    #[command(name = "apps:list")]
    AppsList,

    /// Create an app
    #[command(name = "apps:create")]
    AppsCreate(NameArg),

    /// Delete an app
    #[command(name = "apps:delete")]
    AppsDelete(NameArg),

    /// Check if an app exists
    #[command(name = "apps:exists")]
    AppsExists(NameArg),

    /// Create a postgres service
    #[command(name = "postgres:create")]
    PostgresCreate(NameArg),

    /// Delete a postgres service
    #[command(name = "postgres:delete")]
    PostgresDelete(NameArg),

    /// Check if a postgres service exists
    #[command(name = "postgres:exists")]
    PostgresExists(NameArg),

    /// List all postgres services
    #[command(name = "postgres:list")]
    PostgresList,

    /// Link a postgres service to an app
    #[command(name = "postgres:link")]
    PostgresLink(LinkArgs),

    /// Unlink a postgres service from an app
    #[command(name = "postgres:unlink")]
    PostgresUnlink(LinkArgs),

    /// Create a redis service
    #[command(name = "redis:create")]
    RedisCreate(NameArg),

    /// Delete a redis service
    #[command(name = "redis:delete")]
    RedisDelete(NameArg),

    /// Check if a redis service exists
    #[command(name = "redis:exists")]
    RedisExists(NameArg),

    /// List all redis services
    #[command(name = "redis:list")]
    RedisList,

    /// Link a redis service to an app
    #[command(name = "redis:link")]
    RedisLink(LinkArgs),

    /// Unlink a redis service from an app
    #[command(name = "redis:unlink")]
    RedisUnlink(LinkArgs),
}

#[derive(clap::Args, Debug)]
pub struct NameArg {
    /// Name of the app or service
    #[arg(long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct LinkArgs {
    /// Name of the service
    #[arg(long)]
    pub name: String,

    /// Name of the app
    #[arg(long)]
    pub app: String,
}

impl Args {
    pub fn parse_secret(input: &str) -> Result<String> {
        if Path::new(input).exists() {
            Ok(fs::read_to_string(input)?.trim().to_string())
        } else {
            Ok(input.to_string())
        }
    }
}
