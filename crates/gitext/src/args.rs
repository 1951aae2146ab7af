use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use libgitext::{Target, UpdateMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for gitext.
pub struct Cli {
    /// Print mutating git commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Echo every git command and its output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Override the repository directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub repo_dir: Option<String>,

    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Suppress all output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub no_prompt: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

/// A protected branch, as named on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// The integration branch
    Stage,
    /// The release branch
    Production,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Stage => Self::Stage,
            TargetArg::Production => Self::Production,
        }
    }
}

/// How `update feature` applies the source branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Replay feature commits on top of the source
    Rebase,
    /// Merge the source into the feature branch
    Merge,
}

impl From<ModeArg> for UpdateMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Rebase => Self::Rebase,
            ModeArg::Merge => Self::Merge,
        }
    }
}

#[derive(Subcommand)]
/// CLI subcommands supported by gitext.
pub enum Commands {
    /// Show the current branch, how it compares to stage and production, and what to do next
    Status,

    /// Fast-forward stage or production to its remote
    Sync {
        /// Branch to sync
        #[arg(value_enum)]
        target: TargetArg,
    },

    /// Start a new branch
    #[command(subcommand)]
    Start(StartCommand),

    /// Bring stage or production changes into the current branch
    #[command(subcommand)]
    Update(UpdateCommand),

    /// Move the current branch from stage onto production
    #[command(subcommand)]
    Retarget(RetargetCommand),

    /// List local branches already merged into stage or production
    Cleanup {
        /// Delete the listed branches
        #[arg(long)]
        hard: bool,
    },

    /// Prepare a pull request
    #[command(subcommand)]
    Prepare(PrepareCommand),
}

#[derive(Subcommand)]
/// Branch kinds `start` can create.
pub enum StartCommand {
    /// Create feature/<ticket>-<slug>
    Feature {
        /// Ticket ID (e.g. ABC-123)
        #[arg(long)]
        ticket: String,

        /// Short description (e.g. retry-policy)
        #[arg(long)]
        slug: String,

        /// Branch to start from
        #[arg(long, value_enum)]
        from: TargetArg,
    },
}

#[derive(Subcommand)]
/// Branch kinds `update` applies to.
pub enum UpdateCommand {
    /// Update the current feature branch
    Feature {
        /// Branch to take changes from
        #[arg(long, value_enum)]
        with: TargetArg,

        /// Rebase or merge
        #[arg(long, value_enum, default_value_t = ModeArg::Rebase)]
        mode: ModeArg,
    },
}

#[derive(Subcommand)]
/// Branch kinds `retarget` applies to.
pub enum RetargetCommand {
    /// Retarget the current feature branch
    Feature {
        /// New base (must be production)
        #[arg(long, value_enum, default_value_t = TargetArg::Production)]
        onto: TargetArg,

        /// Old base (must be stage)
        #[arg(long, value_enum, default_value_t = TargetArg::Stage)]
        from: TargetArg,

        /// Allow retargeting a branch that does not match the feature pattern
        #[arg(long = "override")]
        allow_non_feature: bool,

        /// Proceed even if other people have recently committed to the branch
        #[arg(long = "i-know-what-im-doing")]
        acknowledge_shared: bool,
    },
}

#[derive(Subcommand)]
/// What `prepare` produces.
pub enum PrepareCommand {
    /// Run CI checks and print PR text for the current branch
    Pr {
        /// Branch the PR goes into
        #[arg(long, value_enum)]
        to: TargetArg,
    },
}
