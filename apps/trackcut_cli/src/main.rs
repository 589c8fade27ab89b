use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use trackcut_core::{
    preset_default, preset_precise, Attribute, AttributeKey, EditorConfig, Frame, FrameScale,
    ItemKind, Point, ResizeEdge, Resource, ResourceDescriptor, Session, TrackItem,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "trackcut")]
#[command(about = "Replay timeline editing gestures headlessly")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON gesture script and print the resulting timeline
    Run {
        /// Script file path
        script: PathBuf,

        /// Editor config JSON (overrides --preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Config preset (default, precise)
        #[arg(long, default_value = "default")]
        preset: String,
    },

    /// Print a config preset as JSON
    Config {
        #[arg(default_value = "default")]
        preset: String,
    },
}

#[derive(Debug, Deserialize)]
struct Script {
    /// Fixed pixels per frame. Without it the ruler is laid out for `container_width`.
    #[serde(default)]
    frame_width: Option<f64>,
    #[serde(default = "default_container_width")]
    container_width: f64,
    #[serde(default)]
    zoom: f64,
    steps: Vec<Step>,
}

fn default_container_width() -> f64 {
    1200.0
}

#[derive(Debug, Deserialize)]
struct ResourceSpec {
    kind: ItemKind,
    #[serde(flatten)]
    descriptor: ResourceDescriptor,
}

/// Items are referred to by the order they appeared in: inserted items and
/// the right halves produced by splits.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Insert {
        resource: ResourceSpec,
        x: f64,
        y: f64,
        #[serde(default)]
        grab_offset_x: f64,
    },
    Move {
        item: usize,
        x: f64,
        y: f64,
        #[serde(default)]
        grab_offset_x: f64,
    },
    Split {
        item: usize,
        frame: i64,
    },
    Delete {
        item: usize,
    },
    Resize {
        item: usize,
        edge: ResizeEdge,
        frame: i64,
    },
    Attribute {
        item: usize,
        key: AttributeKey,
        value: f64,
    },
    Text {
        item: usize,
        text: String,
        #[serde(default)]
        attribute: Option<Attribute>,
    },
    Undo,
    Redo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            script,
            config,
            preset,
        } => {
            let config = match config {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading config {}", path.display()))?;
                    EditorConfig::from_json_str(&json)
                        .with_context(|| format!("parsing config {}", path.display()))?
                }
                None => preset_by_name(&preset)?,
            };
            let json = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let script: Script = serde_json::from_str(&json)
                .with_context(|| format!("parsing script {}", script.display()))?;

            let session = run(config, script)?;
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        }
        Commands::Config { preset } => {
            println!("{}", serde_json::to_string_pretty(&preset_by_name(&preset)?)?);
        }
    }

    Ok(())
}

fn preset_by_name(name: &str) -> Result<EditorConfig> {
    match name {
        "default" => Ok(preset_default()),
        "precise" => Ok(preset_precise()),
        other => bail!("unknown preset '{}', expected default or precise", other),
    }
}

fn run(config: EditorConfig, script: Script) -> Result<Session> {
    let mut session = Session::new(config);
    session.subscribe(Box::new(|event| tracing::debug!(?event, "timeline event")));
    let mut items: Vec<Uuid> = Vec::new();

    for (n, step) in script.steps.into_iter().enumerate() {
        match script.frame_width {
            Some(width) => session.set_scale(FrameScale::fixed(width)),
            None => {
                session.update_scale(script.container_width, script.zoom);
            }
        }
        tracing::info!(step = n, ?step, "applying");
        apply(&mut session, &mut items, step).with_context(|| format!("step {}", n))?;
    }

    Ok(session)
}

fn item_ref(items: &[Uuid], index: usize) -> Result<Uuid> {
    items
        .get(index)
        .copied()
        .with_context(|| format!("no item #{} (only {} known)", index, items.len()))
}

fn build_item(spec: &ResourceSpec, config: &EditorConfig) -> Result<TrackItem> {
    let desc = &spec.descriptor;
    let resource = match spec.kind {
        ItemKind::Video => Resource::video(desc)?,
        ItemKind::Audio => Resource::audio(desc, config)?,
        ItemKind::Sticker => Resource::sticker(desc)?,
        ItemKind::Text => Resource::text(desc.name.clone(), config),
    };
    Ok(TrackItem::new(resource))
}

fn apply(session: &mut Session, items: &mut Vec<Uuid>, step: Step) -> Result<()> {
    match step {
        Step::Insert {
            resource,
            x,
            y,
            grab_offset_x,
        } => {
            let item = build_item(&resource, session.config())?;
            let id = item.id();
            session.begin_insert_drag(item, grab_offset_x)?;
            session.drag_to(Point::new(x, y))?;
            match session.release_drag(Point::new(x, y))? {
                Some(outcome) => tracing::info!(item = %id, track = %outcome.track_id, "inserted"),
                None => tracing::warn!(item = %id, "insert dropped outside the tracks"),
            }
            items.push(id);
        }
        Step::Move {
            item,
            x,
            y,
            grab_offset_x,
        } => {
            let id = item_ref(items, item)?;
            session.begin_move_drag(id, grab_offset_x)?;
            session.drag_to(Point::new(x, y))?;
            session.release_drag(Point::new(x, y))?;
        }
        Step::Split { item, frame } => {
            let id = item_ref(items, item)?;
            items.push(session.split_item(id, Frame(frame))?);
        }
        Step::Delete { item } => {
            session.delete_item(item_ref(items, item)?)?;
        }
        Step::Resize { item, edge, frame } => {
            session.begin_resize(item_ref(items, item)?, edge)?;
            let landed = session.resize_to(Frame(frame))?;
            if landed != Frame(frame) {
                tracing::info!(requested = frame, %landed, "resize clamped");
            }
            session.end_resize()?;
        }
        Step::Attribute { item, key, value } => {
            session.begin_attribute_change(item_ref(items, item)?)?;
            session.set_attribute(key, value)?;
            session.end_attribute_change()?;
        }
        Step::Text {
            item,
            text,
            attribute,
        } => {
            session.edit_text(item_ref(items, item)?, text, attribute)?;
        }
        Step::Undo => {
            if !session.undo()? {
                tracing::warn!("nothing to undo");
            }
        }
        Step::Redo => {
            if !session.redo()? {
                tracing::warn!("nothing to redo");
            }
        }
    }
    Ok(())
}
