use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cardsmith::engine::View;

#[derive(Parser, Debug)]
#[command(name = "cardsmith")]
#[command(about = "Card generation engine for home-automation dashboards")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.json and preferences.json
    /// (defaults to $CARDSMITH_CONFIG_DIR, then the platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Registry snapshot, view and grouping override shared by view commands
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// JSON dump of the host registry (areas, devices, entities, states)
    #[arg(long, short = 'r')]
    pub registry: PathBuf,

    /// areas, devices, favorites, area:<area_id> or device:<domain>
    pub view: View,

    /// Group this view regardless of stored preferences
    #[arg(long, conflicts_with = "flat")]
    pub grouped: bool,

    /// Do not group this view regardless of stored preferences
    #[arg(long)]
    pub flat: bool,
}

impl ViewArgs {
    pub fn grouping_override(&self) -> Option<bool> {
        match (self.grouped, self.flat) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve one view and print its cards as JSON
    Resolve {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Move one card and persist the new order
    Reorder {
        #[command(flatten)]
        view: ViewArgs,

        /// Group the card is in (omit for flat views and ungrouped cards)
        #[arg(long)]
        group: Option<String>,

        /// Current position inside the group
        from: usize,

        /// New position inside the group
        to: usize,
    },
    /// Resolve a view, then apply JSON requests read line by line from stdin,
    /// printing the view again after every change
    Watch {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Manage installed blueprints
    Blueprint {
        #[command(subcommand)]
        action: BlueprintAction,
    },
    /// Show or change the client-local grouping toggles
    Preferences {
        /// Group entity listings by domain
        #[arg(long)]
        group_entities: Option<bool>,

        /// Group the area overview by floor
        #[arg(long)]
        group_areas_by_floor: Option<bool>,
    },
    /// Print the stored configuration document
    Config,
}

#[derive(Subcommand, Debug)]
pub enum BlueprintAction {
    /// Install or upgrade a blueprint from a JSON file
    Install { file: PathBuf },
    /// List installed blueprints
    List,
    /// Delete an installed blueprint; cards made from it keep their snapshot
    Delete { name: String },
}
