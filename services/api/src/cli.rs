use crate::review::{self, AdminTask};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hospital_directory::directory::ProfessionalId;
use hospital_directory::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hospital Directory",
    about = "Run the hospital staff directory service and its review queue",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load the sample hospital network into an empty directory
    Seed,
    /// Work the registration review queue without the HTTP service
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// List registrations awaiting a decision
    Pending,
    /// Publish a registration in the directory
    Approve(ReviewArgs),
    /// Turn a registration down
    Reject(ReviewArgs),
}

#[derive(Args, Debug)]
struct ReviewArgs {
    /// Registration id as shown by `review pending`
    id: i64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed => review::run(AdminTask::Seed),
        Command::Review { command } => review::run(match command {
            ReviewCommand::Pending => AdminTask::Pending,
            ReviewCommand::Approve(args) => AdminTask::Approve(ProfessionalId(args.id)),
            ReviewCommand::Reject(args) => AdminTask::Reject(ProfessionalId(args.id)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["hospital-directory-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_review_commands() {
        let cli = Cli::try_parse_from(["hospital-directory-api", "review", "approve", "7"])
            .expect("parses");
        match cli.command {
            Some(Command::Review {
                command: ReviewCommand::Approve(ReviewArgs { id }),
            }) => assert_eq!(id, 7),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["hospital-directory-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.host, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
