use clap::Parser;
use tether::cli::{
    handle_completions, handle_config_init, queue, route, Cli, Commands, ConfigCommands,
    QueueCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => tether::cli::serve::run_serve(args).await,
        Commands::Route(args) => route::handle_route(&args).map(|output| {
            println!("{}", output);
        }),
        Commands::Queue(cmd) => match cmd {
            QueueCommands::List(args) => queue::handle_queue_list(&args).await.map(|output| {
                println!("{}", output);
            }),
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
