use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use dbms_browser::browser;
use dbms_browser::config::Config;
use dbms_browser::db::Database;
use dbms_browser::logging;
use dbms_browser::metrics;
use dbms_browser::ordering::Direction;
use dbms_browser::schema;
use dbms_browser::web::{self, AppState};

#[derive(Parser)]
#[command(name = "dbms_browser")]
#[command(about = "Browse and edit the tables of an existing database")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web interface
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the browsable tables
    Tables,
    /// Print the rows of one table
    Show {
        table: String,
        /// Column to order by
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    let _log_guard = logging::init_logging(&config.logging.dir);

    let db = Database::open(&config.database.path)?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            metrics::init_metrics();
            let addr = config.bind_addr();
            info!(database = %config.database.path.display(), "starting web interface");
            web::start_server(AppState::new(db, config), &addr).await?;
        }
        Commands::Tables => {
            let excluded = config.browser.excluded_prefixes.clone();
            let tables = db.with_conn_blocking(|conn| schema::list_tables(conn, &excluded))?;
            for table in tables {
                println!("{table}");
            }
        }
        Commands::Show {
            table,
            order_by,
            desc,
        } => {
            let direction = if desc { Direction::Desc } else { Direction::Asc };
            let max_rows = config.browser.max_rows;
            let data = db.with_conn_blocking(|conn| {
                browser::load_table(
                    conn,
                    &table,
                    order_by.as_deref().map(|c| (c, direction)),
                    max_rows,
                )
            })?;
            println!("{}", data.columns.join("\t"));
            for row in &data.rows {
                let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                println!("{}", cells.join("\t"));
            }
            if data.truncated {
                println!("... truncated at {max_rows} rows");
            }
        }
    }

    Ok(())
}
