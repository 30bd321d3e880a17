//! cli stuff
use {
    crate::config::options::Base34,
    clap::{Args, Parser, Subcommand, ValueEnum},
    color_eyre::{Report, eyre::Result},
    schemars::generate::SchemaSettings,
    std::{
        fs::OpenOptions,
        io::{BufWriter, Write},
    },
};

/// the CLI
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Save instead of printing
    #[arg(long, global = true)]
    pub save: bool,

    /// Generate a JSON schemafile based on the defaults
    #[arg(short = 's', long)]
    pub gen_schema: bool,

    /// Generate the default config file
    #[arg(short = 'd', long)]
    pub gen_default: bool,

    /// Generate both the schema and the default config file
    #[arg(short = 'a', long)]
    pub gen_all: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// where a client command gets its data
#[derive(Args, Debug, Clone, Default)]
pub struct Source {
    /// Talk to a running relay instead of the booru directly
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,
}

/// the subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server
    Serve {
        /// Address to bind to
        #[arg(long)]
        address: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Don't mount the media proxy
        #[arg(long)]
        no_proxy: bool,
    },

    /// Search posts. Prefix tags with `-` to exclude or `~` to make them optional
    Search {
        /// Tags to search for, the last search is reused when none are given
        #[arg(allow_hyphen_values = true)]
        tags: Vec<String>,

        /// How many pages to load
        #[arg(short = 'n', long, default_value_t = 1)]
        pages: u32,

        /// Where to search
        #[command(flatten)]
        source: Source,
    },

    /// Show tag suggestions for some text
    Autocomplete {
        /// The partial tag
        text: String,

        /// Where to look
        #[command(flatten)]
        source: Source,
    },

    /// Build a query interactively, with suggestions as you type
    Interactive {
        /// Where to search
        #[command(flatten)]
        source: Source,
    },

    /// Show or change preferences
    Prefs {
        /// What to change
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },
}

/// on or off
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// enable
    On,
    /// disable
    Off,
}

impl From<Toggle> for bool {
    fn from(value: Toggle) -> Self {
        value == Toggle::On
    }
}

/// preference changes
#[derive(Subcommand, Debug)]
pub enum PrefsAction {
    /// Print the current preferences
    Show,
    /// List the blocked-content presets
    Presets,
    /// Block a tag, several space separated tags, or a preset by name
    Block {
        /// The entry or preset
        entry: String,
    },
    /// Unblock an entry or a preset by name
    Unblock {
        /// The entry or preset
        entry: String,
    },
    /// Route media through the relay's proxy
    Proxy {
        /// on or off
        state: Toggle,
    },
    /// Print diagnostic information with results
    Debug {
        /// on or off
        state: Toggle,
    },
    /// Hide media urls in results
    Privacy {
        /// on or off
        state: Toggle,
    },
    /// Acknowledge the content warning
    AcceptWarning,
    /// Forget the saved search results
    ClearResults,
}

impl Cli {
    /// handle the generator flags, returning true if one of them ran
    ///
    /// # Errors
    ///
    /// returns an error if it fails to generate and/or save the json schema
    /// returns an error if it fails to generate and/or save the default config
    pub fn run_generators(&self) -> Result<bool> {
        if self.gen_schema || self.gen_all {
            Self::gen_schema(self.save)?;
        }

        if self.gen_default || self.gen_all {
            Self::gen_defaults(self.save)?;
        }

        Ok(self.gen_default || self.gen_all || self.gen_schema)
    }

    /// save a string to a file
    ///
    /// # Errors
    ///
    /// returns an error if it fails to open `path`
    pub fn write_to_file(path: &str, contents: &str) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)?;
        let mut w = BufWriter::new(file);
        w.write_all(contents.as_bytes()).map_err(Report::new)
    }

    /// generate/save the config schema
    ///
    /// # Errors
    ///
    /// returns an error if it fails to convert the schema to a JSON string
    /// returns an error if it fails to save the schema to `base34.schema.json`
    pub fn gen_schema(save: bool) -> Result<()> {
        let settings = SchemaSettings::draft2020_12().for_serialize();
        let generator = settings.into_generator();
        let schema = generator.into_root_schema_for::<Base34>();
        let schema_str = serde_json::to_string_pretty(&schema)?;

        if save {
            Self::write_to_file("base34.schema.json", &schema_str)?;
        } else {
            println!("{}", schema_str);
        }

        Ok(())
    }

    /// generate/save the default config file
    ///
    /// # Errors
    ///
    /// returns an error if it fails to convert the default config to TOML
    /// returns an error if it fails to save the default config to `base34.default.toml`
    pub fn gen_defaults(save: bool) -> Result<()> {
        let defaults = toml::to_string_pretty(&Base34::default())?;

        if save {
            Self::write_to_file("base34.default.toml", &defaults)?;
        } else {
            println!("{}", defaults);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_accepts_modifier_prefixed_tags() {
        let cli =
            Cli::try_parse_from(["base34", "search", "-n", "2", "-gore", "~cat", "dog"]).unwrap();

        let Some(Command::Search { tags, pages, source }) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(tags, vec!["-gore", "~cat", "dog"]);
        assert_eq!(pages, 2);
        assert_eq!(source.remote, None);
    }

    #[test]
    fn test_prefs_toggles() {
        let cli = Cli::try_parse_from(["base34", "prefs", "privacy", "on"]).unwrap();

        assert!(matches!(
            cli.command,
            Some(Command::Prefs {
                action: Some(PrefsAction::Privacy { state: Toggle::On })
            })
        ));
    }

    #[test]
    fn test_generator_flags_without_command() {
        let cli = Cli::try_parse_from(["base34", "--gen-default"]).unwrap();
        assert!(cli.gen_default);
        assert!(cli.command.is_none());
    }
}
