//! Command-line surface for `storyloft-cli`.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use storyloft_api_types::{CommentTargetKind, ContentKind, VoteDirection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "storyloft-cli", version, about = "Storyloft API client", long_about = None)]
pub struct Cli {
    /// API base URL, e.g. <https://stories.example.com>
    #[arg(long, env = "STORYLOFT_SITE_URL")]
    pub site: Option<String>,

    /// Where the access/refresh token pair is kept between runs
    #[arg(
        long,
        env = "STORYLOFT_SESSION_FILE",
        default_value = "storyloft-session.json"
    )]
    pub session_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Account registration and session handling
    Auth(AuthArgs),
    /// Stories, videos and shots
    Content(ContentArgs),
    /// Toggle a like on a story, video or shot
    Like {
        kind: KindArg,
        id: Uuid,
    },
    /// Threaded comments
    Comments(CommentsArgs),
    /// Review queue (admin)
    Moderation(ModerationArgs),
    /// Points, referrals and leaderboard
    Points(PointsArgs),
    /// Request metrics (admin)
    Monitoring(MonitoringArgs),
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthCmd,
}

#[derive(Subcommand, Debug)]
pub enum AuthCmd {
    /// Register a new account and store its session
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        anonymous_name: Option<String>,
        /// Referral code of the user who invited you
        #[arg(long = "ref")]
        referral_code: Option<String>,
        /// Preferred code for your own referral link
        #[arg(long)]
        desired_code: Option<String>,
    },
    /// Show the signed-in user
    Me,
    /// Revoke the current session
    Logout,
}

#[derive(Parser, Debug)]
pub struct ContentArgs {
    #[command(subcommand)]
    pub action: ContentCmd,
}

#[derive(Subcommand, Debug)]
pub enum ContentCmd {
    /// List approved items
    List {
        kind: KindArg,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// List your own items in every state
    Mine { kind: KindArg },
    Get { kind: KindArg, id: Uuid },
    Create {
        kind: KindArg,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[arg(long)]
        media_url: Option<String>,
        #[arg(long)]
        thumbnail_url: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = false)]
        mature: bool,
        /// Send straight to the review queue
        #[arg(long, default_value_t = false)]
        submit: bool,
    },
    /// Submit a draft or rejected item for review
    Submit { kind: KindArg, id: Uuid },
    Delete { kind: KindArg, id: Uuid },
    /// Record that you have seen the mature-content warning
    AcknowledgeMature { kind: KindArg, id: Uuid },
    Share { kind: KindArg, id: Uuid },
}

#[derive(Parser, Debug)]
pub struct CommentsArgs {
    #[command(subcommand)]
    pub action: CommentsCmd,
}

#[derive(Subcommand, Debug)]
pub enum CommentsCmd {
    List { target: TargetArg, id: Uuid },
    Post {
        target: TargetArg,
        id: Uuid,
        #[arg(long)]
        content: String,
        #[arg(long)]
        parent: Option<Uuid>,
    },
    Vote { id: Uuid, direction: VoteArg },
    Like { id: Uuid },
    Delete { id: Uuid },
}

#[derive(Parser, Debug)]
pub struct ModerationArgs {
    #[command(subcommand)]
    pub action: ModerationCmd,
}

#[derive(Subcommand, Debug)]
pub enum ModerationCmd {
    Pending {
        kind: KindArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Approve { kind: KindArg, id: Uuid },
    Reject {
        kind: KindArg,
        id: Uuid,
        #[arg(long)]
        reason: String,
    },
    Dashboard,
}

#[derive(Parser, Debug)]
pub struct PointsArgs {
    #[command(subcommand)]
    pub action: PointsCmd,
}

#[derive(Subcommand, Debug)]
pub enum PointsCmd {
    Stats,
    Breakdown,
    Referral,
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Parser, Debug)]
pub struct MonitoringArgs {
    #[command(subcommand)]
    pub action: MonitoringCmd,
}

#[derive(Subcommand, Debug)]
pub enum MonitoringCmd {
    Summary,
    Errors {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Stories,
    Videos,
    Shots,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Stories => ContentKind::Story,
            KindArg::Videos => ContentKind::Video,
            KindArg::Shots => ContentKind::Shot,
        }
    }
}

impl fmt::Display for KindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ContentKind::from(*self).collection())
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TargetArg {
    Story,
    Chapter,
    Video,
    Shot,
}

impl From<TargetArg> for CommentTargetKind {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Story => CommentTargetKind::Story,
            TargetArg::Chapter => CommentTargetKind::Chapter,
            TargetArg::Video => CommentTargetKind::Video,
            TargetArg::Shot => CommentTargetKind::Shot,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum VoteArg {
    Up,
    Down,
}

impl From<VoteArg> for VoteDirection {
    fn from(vote: VoteArg) -> Self {
        match vote {
            VoteArg::Up => VoteDirection::Up,
            VoteArg::Down => VoteDirection::Down,
        }
    }
}
