//! CLI for Poster Studio - product photos to posters and videos.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use poster_studio::studio::write_artifact;
use poster_studio::{
    load_image, CancelToken, CredentialBroker, EnvCredentials, FileStorage, GalleryStore,
    GeminiModel, GeminiProvider, PosterFormat, PosterStyle, PromptBuilder, SaveOutcome, Settings,
    Status, Studio, VeoModel, VeoProvider,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "poster-studio")]
#[command(about = "Turn product photos into branded posters and short videos (Gemini + Veo)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a poster from a product photo
    Generate(GenerateArgs),

    /// Manage saved posters
    #[command(subcommand)]
    Gallery(GalleryCommand),

    /// List style presets and formats
    Styles,

    /// Inspect settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the product photo
    input: PathBuf,

    /// Poster format
    #[arg(short, long, value_enum, default_value = "1:1")]
    format: FormatArg,

    /// Style preset id or label (see `styles`)
    #[arg(short, long, default_value = "minimalist-luxury")]
    style: PosterStyle,

    /// Extra instructions appended to the prompt
    #[arg(short, long, default_value = "")]
    extra: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Also animate the poster into a short video
    #[arg(long)]
    animate: bool,

    /// Save the result to the gallery
    #[arg(long)]
    save: bool,

    /// API key (overrides settings and environment)
    #[arg(long)]
    api_key: Option<String>,

    /// Brand text placed on the poster
    #[arg(long)]
    brand: Option<String>,
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List saved posters, newest first
    List,

    /// Remove a saved poster
    Remove {
        /// Item id
        id: String,
    },

    /// Write a saved poster (video if present) to a directory
    Export {
        /// Item id
        id: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Remove every saved poster
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the settings file location
    Path,

    /// Print the effective settings
    Show,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "9:16")]
    Story,
    #[value(name = "4:3")]
    Landscape,
}

impl From<FormatArg> for PosterFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Square => PosterFormat::Square,
            FormatArg::Story => PosterFormat::Story,
            FormatArg::Landscape => PosterFormat::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match cli.config {
        Some(ref path) => Settings::load_from(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => Settings::load().context("failed to read settings")?,
    };

    match cli.command {
        Commands::Generate(args) => generate(args, settings, cli.json).await?,
        Commands::Gallery(cmd) => gallery(cmd, &settings, cli.json)?,
        Commands::Styles => list_styles(cli.json)?,
        Commands::Config(cmd) => show_config(cmd, &settings, cli.config.as_deref(), cli.json)?,
    }

    Ok(())
}

async fn generate(args: GenerateArgs, mut settings: Settings, json_output: bool) -> anyhow::Result<()> {
    if let Some(key) = args.api_key {
        settings.api_key = Some(key);
    }
    if let Some(brand) = args.brand {
        settings.brand_name = brand;
    }

    let credentials = EnvCredentials::new(settings.api_key.clone());
    credentials
        .select_key()
        .await
        .context("pass --api-key or add api_key to the settings file")?;
    let api_key = credentials
        .api_key()
        .context("credential broker selected no key")?;
    let image_model = GeminiModel::from_id(&settings.image_model)
        .with_context(|| format!("unknown image model '{}'", settings.image_model))?;
    let video_model = VeoModel::from_id(&settings.video_model)
        .with_context(|| format!("unknown video model '{}'", settings.video_model))?;

    let images = GeminiProvider::builder()
        .api_key(api_key.clone())
        .model(image_model)
        .build()?;
    let videos = VeoProvider::builder()
        .api_key(api_key)
        .model(video_model)
        .build()?;
    let gallery = GalleryStore::load(settings.gallery_storage()?);

    let mut studio = Studio::new(images, videos, credentials, gallery)
        .with_prompts(PromptBuilder::new(settings.brand_name.clone()))
        .with_poll_policy(settings.poll_policy())
        .with_downscale(settings.downscale_options());

    studio.set_image(
        load_image(&args.input)
            .with_context(|| format!("failed to load {}", args.input.display()))?,
    );
    let config = studio.config_mut();
    config.format = args.format.into();
    config.style = args.style;
    config.extra_prompt = args.extra;

    if let Err(e) = studio.generate().await {
        tracing::debug!(error = %e, "generation error");
        anyhow::bail!(e.user_message());
    }

    let mut warning = None;
    if args.animate {
        let (handle, cancel) = CancelToken::new();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });
        tracing::info!("animating poster, this can take a few minutes");
        if studio.animate(&cancel).await.is_err() {
            warning = studio.error_message().map(str::to_string);
        }
    }

    let poster = studio
        .result()
        .cloned()
        .context("generation finished without a result")?;
    let image_path = write_artifact(&poster.url, &args.output, "poster")?;
    let video_path = match poster.video_url {
        Some(ref url) => Some(write_artifact(url, &args.output, "poster")?),
        None => None,
    };

    let saved = if args.save {
        match studio.save_to_gallery() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "could not save to gallery");
                warning = Some(e.user_message());
                None
            }
        }
    } else {
        None
    };

    if json_output {
        let result = serde_json::json!({
            "type": "poster",
            "success": true,
            "status": if studio.status() == Status::PartialSuccess { "partial" } else { "success" },
            "image": image_path.display().to_string(),
            "video": video_path.as_ref().map(|p| p.display().to_string()),
            "saved_id": saved.as_ref().map(SaveOutcome::id),
            "warning": warning,
            "prompt": poster.prompt,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Poster: {}", image_path.display());
        if let Some(ref path) = video_path {
            println!("Video: {}", path.display());
        }
        match saved {
            Some(SaveOutcome::Saved(ref id)) => println!("Saved to gallery as {id}"),
            Some(SaveOutcome::AlreadySaved(ref id)) => println!("Already in gallery as {id}"),
            None => {}
        }
        if let Some(ref message) = warning {
            eprintln!("Warning: {message}");
        }
    }

    Ok(())
}

fn gallery(cmd: GalleryCommand, settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let mut store = GalleryStore::load(settings.gallery_storage()?);

    match cmd {
        GalleryCommand::List => list_gallery(&store, json_output)?,
        GalleryCommand::Remove { id } => {
            let removed = store.remove(&id)?;
            anyhow::ensure!(removed.is_some(), "no gallery item with id '{id}'");
            println!("Removed {id}");
        }
        GalleryCommand::Export { id, output } => {
            let item = store
                .get(&id)
                .with_context(|| format!("no gallery item with id '{id}'"))?;
            let url = item.video_url.as_deref().unwrap_or(&item.url);
            let path = write_artifact(url, &output, "poster-saved")?;
            if json_output {
                println!("{}", serde_json::json!({ "id": id, "output": path.display().to_string() }));
            } else {
                println!("Exported {id} to {}", path.display());
            }
        }
        GalleryCommand::Clear => {
            let count = store.len();
            store.clear()?;
            println!("Removed {count} item(s)");
        }
    }

    Ok(())
}

fn list_gallery(store: &GalleryStore<FileStorage>, json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ItemInfo<'a> {
        id: &'a str,
        created: String,
        style: Option<&'a str>,
        video: bool,
        size_bytes: usize,
    }

    let items: Vec<ItemInfo> = store
        .items()
        .iter()
        .map(|item| ItemInfo {
            id: &item.id,
            created: chrono::DateTime::from_timestamp_millis(item.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            style: item.style_caption(),
            video: item.is_video(),
            size_bytes: item.url.len() + item.video_url.as_ref().map_or(0, String::len),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("The gallery is empty.");
    } else {
        for item in &items {
            let kind = if item.video { "video" } else { "image" };
            println!(
                "{}  {}  {:<5}  {}",
                item.id,
                item.created,
                kind,
                item.style.unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn list_styles(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let styles: Vec<_> = PosterStyle::ALL
            .iter()
            .map(|s| serde_json::json!({ "id": s.id(), "label": s.label(), "description": s.description() }))
            .collect();
        let formats: Vec<_> = PosterFormat::ALL
            .iter()
            .map(|f| serde_json::json!({ "id": f.as_str(), "label": f.label() }))
            .collect();
        let result = serde_json::json!({ "styles": styles, "formats": formats });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("STYLES:");
        for style in PosterStyle::ALL {
            println!("  {:<20} {} - {}", style.id(), style.label(), style.description());
        }
        println!("\nFORMATS:");
        for format in PosterFormat::ALL {
            println!("  {:<20} {}", format.as_str(), format.label());
        }
    }
    Ok(())
}

fn show_config(
    cmd: ConfigCommand,
    settings: &Settings,
    explicit: Option<&Path>,
    json_output: bool,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Path => {
            let path = match explicit {
                Some(path) => path.to_path_buf(),
                None => Settings::config_path()?,
            };
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let mut shown = settings.clone();
            if shown.api_key.is_some() {
                shown.api_key = Some("[REDACTED]".into());
            }
            let data_dir = settings.resolved_data_dir()?;
            println!("{}", serde_json::to_string_pretty(&shown)?);
            if !json_output {
                println!("gallery: {}", data_dir.display());
            }
        }
    }
    Ok(())
}
