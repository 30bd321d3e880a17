//! the core app
use {
    super::{
        cli::{Cli, Command, PrefsAction, Source},
        interactive, logging,
        view::{self, CONTENT_WARNING, MediaLinks},
    },
    crate::{
        bail,
        client::BooruClient,
        config::options::Base34,
        error::*,
        getopt,
        models::{Modifier, Tag, TagWithModifier},
        serve::{cfg::ServerConfig, server::RelayServer},
        session::{
            api::{RemoteApi, SearchApi},
            search::{LoadMore, SearchSession},
        },
        store::{
            FileStorage, StateStorage,
            preferences::{PreferencesStore, find_preset},
            results::ResultsStore,
        },
        utils::format_label,
    },
    clap::Parser,
    owo_colors::OwoColorize,
    std::{net::SocketAddr, sync::Arc},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, info},
    url::Url,
};

/// the base34 app
pub struct B34App {
    /// the parsed command line
    cli: Cli,
    /// where persisted state lives
    storage: Arc<dyn StateStorage>,
}

impl B34App {
    /// initialize base34
    ///
    /// - 1. installs the miette error handler hook
    /// - 2. parses the command line and runs the generators if asked to
    /// - 3. writes the default config file if there is none
    /// - 4. sets up logging
    /// - 5. opens persisted storage
    ///
    /// # Errors
    ///
    /// returns an error if the miette hook fails to install
    /// returns an error if the generators fail
    /// returns an error if it fails to setup logging
    /// returns an error if the storage directory can't be determined
    pub async fn init() -> Result<Option<Self>> {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::MietteHandlerOpts::new()
                    .terminal_links(true)
                    .unicode(true)
                    .context_lines(3)
                    .tab_width(4)
                    .build(),
            )
        }))?;

        let cli = Cli::parse();
        if cli.run_generators()? {
            return Ok(None);
        }

        Base34::ensure_global_config()?;

        if getopt!(logging.enable) {
            logging::setup()?;
        }

        let storage: Arc<dyn StateStorage> = Arc::new(FileStorage::from_config()?);

        info!(
            "Starting {} v{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        );

        Ok(Some(Self { cli, storage }))
    }

    /// run whatever the command line asked for
    ///
    /// # Errors
    ///
    /// returns an error if the command fails
    pub async fn run(self) -> Result<()> {
        match self.cli.command {
            Some(Command::Serve {
                ref address,
                port,
                no_proxy,
            }) => Self::serve(address.clone(), port, no_proxy).await,
            Some(Command::Search {
                ref tags,
                pages,
                ref source,
            }) => self.search(tags, pages, source).await,
            Some(Command::Autocomplete {
                ref text,
                ref source,
            }) => Self::autocomplete(text, source).await,
            Some(Command::Interactive { ref source }) => self.interactive(source).await,
            Some(Command::Prefs { ref action }) => self.prefs(action.as_ref()),
            None => self.search(&[], 1, &Source::default()).await,
        }
    }

    /// run the relay
    async fn serve(address: Option<String>, port: Option<u16>, no_proxy: bool) -> Result<()> {
        let mut config = ServerConfig::from_settings()?;

        if let Some(address) = address {
            let ip = match address.parse::<std::net::IpAddr>() {
                Ok(ip) => ip,
                Err(e) => bail!("Invalid address {}: {}", address, e),
            };
            config.bind_address = SocketAddr::new(ip, config.bind_address.port());
        }

        if let Some(port) = port {
            config.bind_address.set_port(port);
        }

        if no_proxy {
            config.enable_proxy = false;
        }

        RelayServer::new(config).serve().await
    }

    /// pick the api a client command talks to, and the proxy route reachable from it
    fn api_for(source: &Source) -> Result<(Arc<dyn SearchApi>, Option<String>)> {
        let remote = source.remote.clone().or(getopt!(raw session.remote));
        let proxy_base = getopt!(session.proxy_base);

        match remote {
            Some(base) => {
                let api = RemoteApi::new(&base)?;
                let proxy = api.base().join(&proxy_base)?.to_string();
                debug!(relay = %api.base(), "using remote relay");
                Ok((Arc::new(api), Some(proxy)))
            }
            None => {
                let proxy = Url::parse(&proxy_base).ok().map(|u| u.to_string());
                Ok((Arc::new(BooruClient::new()?), proxy))
            }
        }
    }

    /// make sure the content warning has been acknowledged
    async fn confirm_warning(prefs: &mut PreferencesStore) -> Result<bool> {
        if prefs.state().saw_warning {
            return Ok(true);
        }

        println!("{} {}", "!".bright_yellow().bold(), CONTENT_WARNING);
        println!("Type {} to continue:", "yes".bold());

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;

        if line.trim().eq_ignore_ascii_case("yes") {
            prefs.set_saw_warning(true)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// search, load extra pages, print, and remember the results
    async fn search(&self, raw_tags: &[String], pages: u32, source: &Source) -> Result<()> {
        let mut prefs = PreferencesStore::open(self.storage.clone())?;
        if !Self::confirm_warning(&mut prefs).await? {
            return Ok(());
        }

        let mut results = ResultsStore::open(self.storage.clone())?;
        let (api, proxy_base) = Self::api_for(source)?;
        let mut session = SearchSession::new(api, prefs.state().blocked_content.clone());

        session.restore(results.state());
        if !raw_tags.is_empty() {
            for tag in session.tags().to_vec() {
                session.remove_tag(tag.label());
            }
            for raw in raw_tags {
                session.add_tag(parse_cli_tag(raw));
            }
        }

        // a failed search is shown in the results panel
        let _ = session.search().await;

        for _ in 1..pages {
            match session.load_more().await {
                LoadMore::Appended(n) => debug!(added = n, "loaded another page"),
                LoadMore::End | LoadMore::Skipped | LoadMore::Failed => break,
            }
        }

        let links = MediaLinks::new(prefs.state(), proxy_base);
        println!("{}\n", view::render_tags(session.tags()));
        print!(
            "{}",
            view::render_results(&session, &links, prefs.state().debug)
        );

        results.update(|r| *r = session.snapshot())?;
        Ok(())
    }

    /// print suggestions for some text
    async fn autocomplete(text: &str, source: &Source) -> Result<()> {
        let (api, _) = Self::api_for(source)?;
        let tags = api.autocomplete(text).await?;

        if tags.is_empty() {
            println!("{} No results found", "→".bright_black());
        }

        for tag in tags {
            println!(
                "{} {}",
                tag.label.bright_white(),
                crate::utils::compact_number(tag.count).bright_black()
            );
        }

        Ok(())
    }

    /// the line-driven session
    async fn interactive(&self, source: &Source) -> Result<()> {
        let mut prefs = PreferencesStore::open(self.storage.clone())?;
        if !Self::confirm_warning(&mut prefs).await? {
            return Ok(());
        }

        let results = ResultsStore::open(self.storage.clone())?;
        let (api, proxy_base) = Self::api_for(source)?;

        interactive::run(api, prefs, results, proxy_base).await
    }

    /// show or change preferences
    fn prefs(&self, action: Option<&PrefsAction>) -> Result<()> {
        let mut prefs = PreferencesStore::open(self.storage.clone())?;

        match action {
            None | Some(PrefsAction::Show) => {}
            Some(PrefsAction::Presets) => {
                print!("{}", view::render_presets(prefs.state()));
                return Ok(());
            }
            Some(PrefsAction::Block { entry }) => {
                let value = find_preset(entry).map_or(entry.as_str(), |p| p.value);
                if !prefs.add_blocked_content(value)? {
                    println!("{} already blocked", value.bright_black());
                }
            }
            Some(PrefsAction::Unblock { entry }) => {
                let value = find_preset(entry).map_or(entry.as_str(), |p| p.value);
                if !prefs.remove_blocked_content(value)? {
                    println!("{} wasn't blocked", value.bright_black());
                }
            }
            Some(PrefsAction::Proxy { state }) => prefs.set_use_proxy((*state).into())?,
            Some(PrefsAction::Debug { state }) => prefs.set_debug((*state).into())?,
            Some(PrefsAction::Privacy { state }) => prefs.set_privacy_mode((*state).into())?,
            Some(PrefsAction::AcceptWarning) => prefs.set_saw_warning(true)?,
            Some(PrefsAction::ClearResults) => {
                ResultsStore::open(self.storage.clone())?.clear()?;
                println!("{} saved results cleared", "→".bright_cyan());
            }
        }

        print!("{}", view::render_preferences(prefs.state()));
        Ok(())
    }
}

/// turn `-tag`, `~tag` or `tag` from the command line into a query tag
pub fn parse_cli_tag(raw: &str) -> TagWithModifier {
    let (modifier, name) = Modifier::split(raw.trim());
    TagWithModifier::new(Tag::typed(format_label(name)), modifier)
}
