use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use plex_playlister::config::{
    MatchConfig, PlexConfig, DEFAULT_CLIENT_ID, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use plex_playlister::editor::{PlaylistEditor, PlaylistStore, PlaylistUpdate};
use plex_playlister::filter::{MatchMode, Rule, SmartPlaylist, SortOption};
use plex_playlister::input::read_import_file;
use plex_playlister::matcher::{ImportMatcher, ImportSession};
use plex_playlister::models::{EntryStatus, ImportFilter, PlaylistItem};
use plex_playlister::parse::parse_input;
use plex_playlister::plex::PlexClient;
use plex_playlister::progress::{
    create_progress_bar, create_spinner, format_duration, set_log_only, track_resolution,
};

#[derive(Parser)]
#[command(name = "playlister")]
#[command(about = "Build, import and edit Plex music playlists")]
struct Cli {
    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Hide progress bars and log progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ServerArgs {
    /// Plex server URL, e.g. http://192.168.1.10:32400
    #[arg(long, env = "PLEX_URL")]
    url: String,

    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    token: String,

    /// Music library section key (defaults to the first music library)
    #[arg(long, env = "PLEX_SECTION")]
    section: Option<String>,

    /// Accept self-signed certificates
    #[arg(long, env = "PLEX_INSECURE")]
    insecure: bool,

    #[arg(long, env = "PLEX_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    client_id: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl ServerArgs {
    fn connect(&self) -> Result<PlexClient> {
        let config = PlexConfig::new(&self.url, &self.token)?
            .with_client_identifier(&self.client_id)
            .with_library_section(self.section.clone())
            .with_insecure(self.insecure)
            .with_timeout(Duration::from_secs(self.timeout));
        PlexClient::new(config).context("Failed to create Plex client")
    }
}

#[derive(Args)]
struct RuleArgs {
    /// Rule as FIELD:COMPARATOR:VALUE, e.g. genre:contains:Jazz (repeatable)
    #[arg(long = "rule", value_name = "RULE")]
    rules: Vec<Rule>,

    /// Match any rule instead of all of them
    #[arg(long)]
    any: bool,
}

impl RuleArgs {
    fn mode(&self) -> MatchMode {
        if self.any {
            MatchMode::Any
        } else {
            MatchMode::All
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the Plex filter string for a set of rules
    Filter {
        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Import a text or CSV track list as a new playlist
    Import {
        file: PathBuf,

        /// Playlist name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Concurrent searches
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Keep accent-sensitive matching
        #[arg(long)]
        no_fold: bool,

        /// Choose among alternatives on stdin
        #[arg(short, long)]
        interactive: bool,

        /// Create the playlist even with unresolved selections
        #[arg(long)]
        accept_partial: bool,

        /// Resolve and report without creating anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Create or update a smart playlist
    Smart {
        #[arg(long)]
        title: String,

        #[command(flatten)]
        rules: RuleArgs,

        #[arg(long)]
        limit: Option<u32>,

        /// random, most-played, least-played, recently-added, highest-rated
        #[arg(long)]
        sort: Option<SortOption>,

        /// Update this playlist instead of creating one
        #[arg(long, value_name = "PLAYLIST_ID")]
        update: Option<String>,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// List audio playlists
    Playlists {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Show a playlist's tracks
    Show {
        playlist_id: String,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Move the track at one position to another (1-based)
    Move {
        playlist_id: String,
        from: usize,
        to: usize,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Remove the track at a position (1-based)
    Remove {
        playlist_id: String,
        position: usize,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Delete a playlist
    Delete {
        playlist_id: String,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Edit a playlist interactively with undo
    Edit {
        playlist_id: String,

        #[command(flatten)]
        server: ServerArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    set_log_only(cli.log_only);

    match cli.command {
        Command::Filter { rules } => {
            println!("{}", plex_playlister::filter::compile(&rules.rules, rules.mode()));
            Ok(())
        }
        Command::Import {
            file,
            name,
            workers,
            no_fold,
            interactive,
            accept_partial,
            dry_run,
            server,
        } => {
            let options = ImportOptions {
                name,
                workers,
                fold: !no_fold,
                interactive,
                accept_partial,
                dry_run,
            };
            run_import(&file, options, &server)
        }
        Command::Smart {
            title,
            rules,
            limit,
            sort,
            update,
            server,
        } => {
            let smart = SmartPlaylist {
                title,
                mode: rules.mode(),
                rules: rules.rules,
                limit,
                sort,
            };
            run_smart(&smart, update.as_deref(), &server)
        }
        Command::Playlists { server } => list_playlists(&server.connect()?),
        Command::Show {
            playlist_id,
            server,
        } => {
            let client = server.connect()?;
            let mut editor = PlaylistEditor::new(&client);
            print_items(editor.open(&playlist_id)?);
            Ok(())
        }
        Command::Move {
            playlist_id,
            from,
            to,
            server,
        } => {
            let client = server.connect()?;
            let mut editor = PlaylistEditor::new(&client);
            editor.open(&playlist_id)?;
            move_position(&mut editor, from, to)?;
            print_items(editor.items());
            Ok(())
        }
        Command::Remove {
            playlist_id,
            position,
            server,
        } => {
            let client = server.connect()?;
            let mut editor = PlaylistEditor::new(&client);
            editor.open(&playlist_id)?;
            let item_id = item_at(editor.items(), position)?.item_id.clone();
            editor.remove_item(&item_id)?;
            print_items(editor.items());
            Ok(())
        }
        Command::Delete {
            playlist_id,
            server,
        } => {
            let client = server.connect()?;
            PlaylistEditor::new(&client).delete_playlist(&playlist_id)?;
            Ok(())
        }
        Command::Edit {
            playlist_id,
            server,
        } => {
            let client = server.connect()?;
            run_editor(&client, &playlist_id)
        }
    }
}

// ============================================================================
// Import
// ============================================================================

struct ImportOptions {
    name: Option<String>,
    workers: usize,
    fold: bool,
    interactive: bool,
    accept_partial: bool,
    dry_run: bool,
}

fn run_import(file: &Path, options: ImportOptions, server: &ServerArgs) -> Result<()> {
    let start = Instant::now();
    let source = read_import_file(file)?;
    let name = options.name.unwrap_or(source.suggested_name);
    let config = MatchConfig {
        fold_diacritics: options.fold,
        ..MatchConfig::default()
    }
    .with_workers(options.workers)?;

    let client = server.connect()?;
    let matcher = ImportMatcher::new(&client, config);
    let mut session = ImportSession::new(&name);

    let parsed = parse_input(&source.text)?;
    let total = parsed.len() as u64;
    log::info!("Resolving {} entries from {}", total, file.display());

    let pb = create_progress_bar(total, "Resolving");
    let (tx, rx) = crossbeam_channel::unbounded();
    let ticket = session.begin_run();
    let (result, tally) = std::thread::scope(|s| {
        let progress = s.spawn(|| track_resolution(&rx, &pb, total));
        let result = matcher.resolve_all(parsed, &ticket.cancel, Some(&tx));
        drop(tx);
        (result, progress.join())
    });
    pb.finish_and_clear();
    let tally = tally.map_err(|_| anyhow!("Progress reporter panicked"))?;
    session.finish_run(&ticket, result)?;
    log::info!("Resolved in {}: {}", format_duration(start.elapsed()), tally);

    if options.interactive {
        choose_alternatives(&mut session)?;
    }
    print_import_report(&session);

    if options.dry_run {
        println!("Dry run: {} tracks would be added to '{}'", session.tracks_to_add().len(), name);
        return Ok(());
    }

    let tracks = session.creation_tracks(options.accept_partial)?;
    let spinner = create_spinner("Creating playlist");
    let playlist = PlaylistEditor::new(&client).create_playlist(&name, &tracks);
    spinner.finish_and_clear();
    let playlist = playlist?;
    println!("Created '{}' ({}) with {} tracks", playlist.title, playlist.id, tracks.len());
    Ok(())
}

/// Prompt for each entry with alternatives. A blank answer skips it.
fn choose_alternatives(session: &mut ImportSession) -> Result<()> {
    let pending: Vec<_> = session
        .filtered(ImportFilter::Unmatched)
        .filter(|e| e.status() == EntryStatus::NeedsSelection)
        .map(|e| (e.id, e.original_text.clone(), e.alternatives().to_vec()))
        .collect();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    for (id, original, alternatives) in pending {
        println!("\n{} {}", id, original);
        for (i, track) in alternatives.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, track);
        }
        print!("Choose 1-{} (enter to skip): ", alternatives.len());
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        let choice = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| alternatives.get(n));
        match choice {
            Some(track) => {
                session.select_alternative(id, &track.id)?;
            }
            None => println!("No alternative '{}', skipped", answer),
        }
    }
    Ok(())
}

fn print_import_report(session: &ImportSession) {
    println!("\n{:=<60}", "");
    println!("Import: {}", session.playlist_name);
    println!("  Matched:       {}", session.matched_count());
    println!("  Needs review:  {}", session.needs_selection_count());
    println!("  Missing:       {}", session.missing_count());
    println!("{:=<60}", "");

    for entry in session.filtered(ImportFilter::Unmatched) {
        let tag = match entry.status() {
            EntryStatus::NeedsSelection => "REVIEW",
            _ => "MISSING",
        };
        println!("  [{}] {} {}", tag, entry.id, entry.original_text);
    }
}

// ============================================================================
// Playlists
// ============================================================================

fn run_smart(smart: &SmartPlaylist, update: Option<&str>, server: &ServerArgs) -> Result<()> {
    if smart.title.trim().is_empty() {
        bail!("Smart playlist title cannot be empty");
    }
    log::debug!("Filter: {}", smart.filter());
    let client = server.connect()?;
    let playlist = match update {
        Some(id) => client.update_playlist(id, &PlaylistUpdate::from_smart(smart)?)?,
        None => client.create_smart_playlist(smart)?,
    };
    let action = if update.is_some() { "Updated" } else { "Created" };
    println!("{} smart playlist '{}' ({})", action, playlist.title, playlist.id);
    for rule in &smart.rules {
        println!("  {}", rule);
    }
    Ok(())
}

fn list_playlists(client: &PlexClient) -> Result<()> {
    let playlists = client.playlists()?;
    if playlists.is_empty() {
        println!("No audio playlists");
    }
    for p in playlists {
        let kind = if p.smart { "smart" } else { "" };
        println!("{:>8}  {:<40} {:>5} tracks  {}", p.id, p.title, p.leaf_count, kind);
    }
    Ok(())
}

fn print_items(items: &[PlaylistItem]) {
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:>4}. {:<60} {:>6}",
            i + 1,
            item.track.to_string(),
            item.track.formatted_duration()
        );
    }
}

fn item_at(items: &[PlaylistItem], position: usize) -> Result<&PlaylistItem> {
    position
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .ok_or_else(|| anyhow!("Position {} is outside 1..={}", position, items.len()))
}

/// Move between 1-based final positions.
fn move_position<S: PlaylistStore>(
    editor: &mut PlaylistEditor<S>,
    from: usize,
    to: usize,
) -> Result<()> {
    let len = editor.items().len();
    if from == 0 || to == 0 || from > len || to > len {
        bail!("Positions must be within 1..={}", len);
    }
    let (from, to) = (from - 1, to - 1);
    let destination = if to > from { to + 1 } else { to };
    editor.move_item(from, destination)?;
    Ok(())
}

fn run_editor(client: &PlexClient, playlist_id: &str) -> Result<()> {
    let mut editor = PlaylistEditor::new(client);
    print_items(editor.open(playlist_id)?);
    println!("Commands: list, move FROM TO, remove POS, undo, quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let outcome = match words.as_slice() {
            [] => continue,
            ["quit"] | ["q"] => break,
            ["list"] | ["ls"] => Ok(()),
            ["move", from, to] => match (from.parse(), to.parse()) {
                (Ok(from), Ok(to)) => move_position(&mut editor, from, to),
                _ => Err(anyhow!("Usage: move FROM TO")),
            },
            ["remove", pos] => pos
                .parse::<usize>()
                .map_err(|_| anyhow!("Usage: remove POS"))
                .and_then(|pos| item_at(editor.items(), pos).map(|i| i.item_id.clone()))
                .and_then(|item_id| Ok(editor.remove_item(&item_id)?)),
            ["undo"] => match editor.undo_description() {
                Some(description) => editor
                    .undo()
                    .map(|_| println!("Undid {}", description))
                    .map_err(Into::into),
                None => Err(anyhow!("Nothing to undo")),
            },
            _ => Err(anyhow!("Unknown command")),
        };
        match outcome {
            Ok(()) => print_items(editor.items()),
            Err(e) => println!("Error: {:#}", e),
        }
    }
    Ok(())
}
