//! Henhouse command line tool.
//!
//! Runs list queries against the story store and loads exported data.
//!
//! Usage:
//!   henhouse query story --search 'title:"red dragon" isPublished:true' --sort title:DESC
//!   henhouse load-categories < categories.json
//!   henhouse load-stories admin original < stories.json
//!   henhouse convert datetime_delta_range older_than:10h

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use henhouse::art::models::User;
use henhouse::art::{ArtRegistries, RequestContext, Resource};
use henhouse::config::HenhouseConfig;
use henhouse::db::{self, load};
use henhouse::logging::init_logging;
use henhouse::query::convert::ConverterRegistry;
use henhouse::query::ListParams;

#[derive(Parser, Debug)]
#[clap(name = "henhouse")]
#[clap(about = "Search, sort and load the Henhouse story store")]
struct Args {
    /// Config file (defaults to henhouse.toml in the platform config dir)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured location
    #[clap(short, long, global = true)]
    database: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a resource with search and sort strings
    Query {
        /// story, chapter, tag or category
        resource: String,

        #[clap(short, long)]
        search: Option<String>,

        #[clap(long)]
        sort: Option<String>,

        /// Do not append the default tiebreak fields
        #[clap(long)]
        no_default_sort: bool,

        #[clap(short, long)]
        limit: Option<u32>,

        #[clap(short, long)]
        offset: Option<u32>,

        /// Print the compiled SQL instead of running it
        #[clap(long)]
        explain: bool,
    },

    /// Create a user
    CreateUser {
        username: String,
        email: String,

        #[clap(long)]
        staff: bool,
    },

    /// Upsert categories from a JSON array on stdin
    LoadCategories,

    /// Create stories from a JSON array on stdin
    LoadStories {
        default_author_username: String,
        default_category: String,
    },

    /// Run a named converter on a raw value
    Convert { converter: String, raw: String },
}

fn read_stdin_json<T: serde::de::DeserializeOwned>() -> Result<T> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    serde_json::from_str(&input).context("Failed to parse JSON from stdin")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = HenhouseConfig::load(args.config.as_deref())?;
    let _guard = init_logging(&config);

    let database_path = args.database.clone().unwrap_or_else(|| config.database_path());

    match args.command {
        Command::Convert { converter, raw } => {
            let registry = ConverterRegistry::new();
            let Some(converter) = registry.get(&converter) else {
                bail!(
                    "unknown converter '{}', expected one of: {}",
                    converter,
                    registry.names().collect::<Vec<_>>().join(", ")
                );
            };
            println!("{:?}", converter.convert(&raw)?);
        }

        Command::Query {
            resource,
            search,
            sort,
            no_default_sort,
            limit,
            offset,
            explain,
        } => {
            let resource: Resource = resource.parse()?;
            let registries = ArtRegistries::new()?;
            let params = ListParams {
                search,
                sort,
                default_sort_enabled: !no_default_sort,
                limit,
                offset,
            };
            let ctx = RequestContext::anonymous(Utc::now());
            let page = params.page(&config);

            if explain {
                let explained = registries.explain(resource, &params, &ctx, page)?;
                println!("{}", explained.select_sql);
                println!("{:?}", explained.select_params);
                println!("{}", explained.count_sql);
                println!("{:?}", explained.count_params);
                return Ok(());
            }

            let db = db::open_database(&database_path)?;
            let listing = registries.list(db.conn(), resource, &params, &ctx, page)?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }

        Command::CreateUser {
            username,
            email,
            staff,
        } => {
            let db = db::open_database(&database_path)?;
            let mut user = User::new(username, email, Utc::now());
            user.is_staff = staff;
            db::insert_user(db.conn(), &user)?;
            info!("Created user {} ({})", user.username, user.uuid);
            println!("{}", user.uuid);
        }

        Command::LoadCategories => {
            let categories: Vec<load::CategoryInput> = read_stdin_json()?;
            let mut db = db::open_database(&database_path)?;
            let summary = load::load_categories(db.conn_mut(), &categories)?;
            println!("{} created, {} updated", summary.created, summary.updated);
        }

        Command::LoadStories {
            default_author_username,
            default_category,
        } => {
            let stories: Vec<load::StoryInput> = read_stdin_json()?;
            let mut db = db::open_database(&database_path)?;
            let summary = load::load_stories(
                db.conn_mut(),
                &stories,
                &default_author_username,
                &default_category,
                Utc::now(),
            )?;
            println!(
                "{} stories, {} chapters, {} new tags",
                summary.stories, summary.chapters, summary.tags_created
            );
        }
    }

    Ok(())
}
