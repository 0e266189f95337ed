use clap::{Parser, Subcommand};

mod circle;
mod sync;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the progress circle for a set of XP totals
    Circle {
        #[arg(allow_negative_numbers = true)]
        xp: Vec<i64>,

        #[arg(long, default_value_t = 50)]
        width: usize,

        /// Keep reading XP values from stdin until `q`
        #[arg(long)]
        interactive: bool,
    },

    /// Hit a running server's leaderboard and, optionally, add XP to a user
    Sync {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        base_url: String,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long, default_value_t = 50)]
        xp: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Circle {
            xp,
            width,
            interactive,
        } => {
            circle::print_cases(&xp, width);

            if interactive {
                circle::interactive(width)?;
            }
        }
        Command::Sync {
            base_url,
            user_id,
            xp,
        } => sync::run(&base_url, user_id.as_deref(), xp).await?,
    }

    Ok(())
}
