use clap::{Parser, Subcommand};
use todo_front::{ListQuery, TodoEvent, TodoPatch, TodosClient};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const API_URL: &str = "http://127.0.0.1:7890";

#[derive(Debug, Parser)]
#[command(about = "Manage todos from the command line")]
struct Args {
    #[arg(long, env = "TODO_API_URL", default_value = API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List todos, newest first
    List {
        /// Only titles containing this text
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        per_page: u32,
    },
    Show { id: Uuid },
    Create { title: String },
    Rename { id: Uuid, title: String },
    Complete { id: Uuid },
    Uncomplete { id: Uuid },
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });

    let client = TodosClient::new(&args.api_url, token);
    let mut events = client.subscribe();

    match args.command {
        Command::List {
            query,
            page,
            per_page,
        } => {
            let query = ListQuery {
                text: query,
                page,
                per_page,
            };
            client.list(&query, None).await?;
        }
        Command::Show { id } => client.show(id, None).await?,
        Command::Create { title } => client.create(&title, None).await?,
        Command::Rename { id, title } => client.update(id, &TodoPatch::title(title), None).await?,
        Command::Complete { id } => client.complete(id, None).await?,
        Command::Uncomplete { id } => client.uncomplete(id, None).await?,
        Command::Delete { id } => client.destroy(id, None).await?,
    }

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    Ok(())
}

fn print_event(event: &TodoEvent) {
    match event {
        TodoEvent::ListFetched { todos } => {
            for todo in todos {
                let mark = if todo.is_completed() { 'x' } else { ' ' };
                println!("[{mark}] {}  {}", todo.id, todo.title);
            }
        }
        TodoEvent::ItemFetched { todo }
        | TodoEvent::ItemCreated { todo }
        | TodoEvent::ItemUpdated { todo } => {
            let status = match todo.completed_at {
                Some(at) => format!("completed {at}"),
                None => String::from("active"),
            };
            println!("{}  {}  ({status})", todo.id, todo.title);
        }
        TodoEvent::ItemDeleted { id } => println!("deleted {id}"),
        TodoEvent::PaginationInfo(info) => {
            println!("{} todos, {} pages", info.count, info.pages);
        }
    }
}
