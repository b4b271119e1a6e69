use selkie::{Embedding, SearchOptions, SelkieConfig, SimilarityTransform};
use selkie_render::{PlotOptions, RasterOptions};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io(std::io::Error),
    Selkie(selkie::Error),
    Render(selkie_render::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Selkie(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<selkie::Error> for CliError {
    fn from(value: selkie::Error) -> Self {
        Self::Selkie(value)
    }
}

impl From<selkie_render::Error> for CliError {
    fn from(value: selkie_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Command {
    #[default]
    Layout,
    Render,
    Animate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    reference: Option<String>,
    config: Option<String>,
    seed: Option<u64>,
    dimensions: Option<usize>,
    starts: Option<usize>,
    initial_iterations: Option<usize>,
    final_iterations: Option<usize>,
    transform: Option<SimilarityTransform>,
    exclude_reference: bool,
    no_missing_to_min: bool,
    json: bool,
    pretty: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    frames_dir: Option<String>,
    frame_every: usize,
    out: Option<String>,
    verbose: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut<'a> {
    reference: Option<&'a str>,
    dimensions: usize,
    final_error: f64,
    steps: u64,
    placements: Vec<selkie::Placement>,
}

fn usage() -> &'static str {
    "selkie-cli\n\
\n\
USAGE:\n\
  selkie-cli [layout] --reference <label> [--json [--pretty]] [OPTIONS] [<path>|-]\n\
  selkie-cli render --reference <label> [--format svg|png] [--scale <n>] [--background <colour>|none] [OPTIONS] [<path>|-]\n\
  selkie-cli animate --reference <label> --frames-dir <dir> [--frame-every <n>] [OPTIONS] [<path>|-]\n\
\n\
OPTIONS:\n\
  --config <file.json>        embedding/search options (camelCase JSON)\n\
  --seed <n>                  random seed\n\
  --dimensions <n>            coordinates per entity (default 2)\n\
  --starts <n>                random restarts (default 30)\n\
  --initial-iterations <n>    steps per restart (default 1500)\n\
  --final-iterations <n>      steps of the final run (default 8000)\n\
  --transform <name>          one-minus|inverse|inverse-offset|inverse-2-offset|inverse-3-offset\n\
  --exclude-reference         drop the reference entity from the layout\n\
  --no-missing-to-min         leave unseen pairs out instead of imputing them\n\
  --out <path>                write output to a file instead of stdout\n\
  --verbose                   log progress to stderr (or set SELKIE_LOG)\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input lines are `identifier identifier similarity`; '#' starts a comment.\n\
  - layout prints tab-separated coordinates by default; --json prints placements.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - --background accepts white, black, transparent, #rgb, #rrggbb or #rrggbbaa\n\
    (default white); none leaves the plot unpainted.\n\
  - PNG output defaults to writing next to the input file (or ./out.png for stdin).\n\
  - animate writes one SVG per --frame-every steps of the final run and skips\n\
    orientation normalization.\n\
"
}

fn usage_error(msg: &str) -> CliError {
    CliError::Usage(format!("{msg}\n\n{}", usage()))
}

fn next_value<'a>(
    it: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a String, CliError> {
    it.next()
        .ok_or_else(|| usage_error(&format!("{flag} needs a value")))
}

fn next_parsed<'a, T: FromStr>(
    it: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<T, CliError> {
    let raw = next_value(it, flag)?;
    raw.parse::<T>()
        .map_err(|_| usage_error(&format!("invalid value for {flag}: `{raw}`")))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        render_scale: 1.0,
        frame_every: 100,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage().to_string())),
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            "animate" => args.command = Command::Animate,
            "--reference" => args.reference = Some(next_value(&mut it, a)?.clone()),
            "--config" => args.config = Some(next_value(&mut it, a)?.clone()),
            "--seed" => args.seed = Some(next_parsed(&mut it, a)?),
            "--dimensions" => args.dimensions = Some(next_parsed(&mut it, a)?),
            "--starts" => args.starts = Some(next_parsed(&mut it, a)?),
            "--initial-iterations" => args.initial_iterations = Some(next_parsed(&mut it, a)?),
            "--final-iterations" => args.final_iterations = Some(next_parsed(&mut it, a)?),
            "--transform" => args.transform = Some(next_parsed(&mut it, a)?),
            "--exclude-reference" => args.exclude_reference = true,
            "--no-missing-to-min" => args.no_missing_to_min = true,
            "--json" => args.json = true,
            "--pretty" => args.pretty = true,
            "--format" => args.render_format = next_parsed(&mut it, a)?,
            "--scale" => {
                args.render_scale = next_parsed(&mut it, a)?;
                if !(args.render_scale.is_finite() && args.render_scale > 0.0) {
                    return Err(usage_error("--scale must be positive"));
                }
            }
            "--background" => {
                let bg = next_value(&mut it, a)?.trim();
                if !bg.is_empty() {
                    args.background = Some(bg.to_string());
                }
            }
            "--frames-dir" => args.frames_dir = Some(next_value(&mut it, a)?.clone()),
            "--frame-every" => args.frame_every = next_parsed(&mut it, a)?,
            "--out" => args.out = Some(next_value(&mut it, a)?.clone()),
            "--verbose" | "-v" => args.verbose = true,
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(usage_error("only one input may be given"));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(usage_error("only one input may be given"));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(usage_error(&format!("unknown option `{other}`")));
            }
            path => {
                if args.input.is_some() {
                    return Err(usage_error("only one input may be given"));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if args.reference.is_none() {
        return Err(usage_error("--reference is required"));
    }
    if args.command == Command::Animate && args.frames_dir.is_none() {
        return Err(usage_error("animate needs --frames-dir"));
    }
    Ok(args)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_env("SELKIE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(args: &Args) -> Result<SelkieConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => SelkieConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => SelkieConfig::default(),
    };
    let embedding = &mut config.embedding;
    if let Some(seed) = args.seed {
        embedding.random_seed = seed;
    }
    if let Some(dimensions) = args.dimensions {
        embedding.dimensions = dimensions;
    }
    if let Some(transform) = args.transform {
        embedding.transform = transform;
    }
    if args.exclude_reference {
        embedding.include_reference = false;
    }
    if args.no_missing_to_min {
        embedding.set_missing_to_min = false;
    }
    let search = &mut config.search;
    if let Some(starts) = args.starts {
        search.number_of_starts = starts;
    }
    if let Some(n) = args.initial_iterations {
        search.initial_iterations = n;
    }
    if let Some(n) = args.final_iterations {
        search.final_iterations = n;
    }
    Ok(config)
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    write_text(&text, out)
}

fn default_raster_out_path(input: Option<&str>, ext: &str) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

fn tsv(embedding: &Embedding) -> Result<String, CliError> {
    let mut buf = Vec::new();
    embedding.write_tsv(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn frame_path(dir: &Path, step: usize) -> PathBuf {
    dir.join(format!("frame-{step:06}.svg"))
}

/// Background for the plot's own rect (SVG) and for the pixmap (PNG); `none` disables both.
fn backgrounds(args: &Args) -> (Option<String>, Option<String>) {
    let bg = match args.background.as_deref() {
        Some(bg) if bg.eq_ignore_ascii_case("none") => None,
        Some(bg) => Some(bg.to_string()),
        None => Some("white".to_string()),
    };
    match args.render_format {
        RenderFormat::Svg => (bg, None),
        RenderFormat::Png => (None, bg),
    }
}

/// Search, final relaxation, then orientation normalization.
fn fast(
    embedding: &mut Embedding,
    search: &SearchOptions,
) -> Result<selkie::SearchReport, CliError> {
    let report = selkie::optimize(embedding, search)?;
    match embedding.normalize_orientation() {
        Ok(()) => {}
        Err(selkie::Error::NotEnoughOrientors { found }) => {
            tracing::warn!(found, "too few entities to normalize orientation");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(report)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    if args.command != Command::Layout {
        selkie_render::check_dimensions(config.embedding.dimensions)?;
    }
    let text = read_input(args.input.as_deref())?;
    let reference = args.reference.as_deref().unwrap_or_default();
    let mut embedding = Embedding::from_text(&text, reference, config.embedding.clone())?;
    let (plot_background, raster_background) = backgrounds(&args);
    let plot = PlotOptions {
        background: plot_background,
        ..Default::default()
    };

    match args.command {
        Command::Layout => {
            let report = fast(&mut embedding, &config.search)?;
            if args.json {
                let out = LayoutOut {
                    reference: embedding.reference_label(),
                    dimensions: embedding.dimensions(),
                    final_error: report.final_error,
                    steps: report.steps,
                    placements: embedding.placements(),
                };
                write_json(&out, args.pretty, args.out.as_deref())?;
            } else {
                write_text(&tsv(&embedding)?, args.out.as_deref())?;
            }
            Ok(())
        }
        Command::Render => {
            fast(&mut embedding, &config.search)?;
            let svg = selkie_render::render_embedding(&embedding, &plot)?;
            match args.render_format {
                RenderFormat::Svg => write_text(&svg, args.out.as_deref())?,
                RenderFormat::Png => {
                    let raster = RasterOptions {
                        scale: args.render_scale,
                        background: raster_background,
                        ..Default::default()
                    };
                    let bytes = selkie_render::svg_to_png(&svg, &raster)?;
                    let out = args.out.clone().unwrap_or_else(|| {
                        default_raster_out_path(args.input.as_deref(), "png")
                            .to_string_lossy()
                            .to_string()
                    });
                    if out == "-" {
                        std::io::stdout().lock().write_all(&bytes)?;
                    } else {
                        std::fs::write(out, bytes)?;
                    }
                }
            }
            Ok(())
        }
        Command::Animate => {
            let dir = PathBuf::from(args.frames_dir.as_deref().unwrap_or("frames"));
            std::fs::create_dir_all(&dir)?;

            let search = selkie::find_best_starting_positions(&mut embedding, &config.search)?;
            embedding.set_positions(&search.best_positions)?;
            std::fs::write(
                frame_path(&dir, 0),
                selkie_render::render_embedding(&embedding, &plot)?,
            )?;

            let mut frames = 1usize;
            selkie::relax_with(
                &mut embedding,
                config.search.final_iterations,
                args.frame_every,
                |step, embedding| -> Result<(), CliError> {
                    let svg = selkie_render::render_embedding(embedding, &plot)?;
                    std::fs::write(frame_path(&dir, step), svg)?;
                    frames += 1;
                    Ok(())
                },
            )?;
            tracing::info!(frames, dir = %dir.display(), "wrote animation frames");
            write_text(&tsv(&embedding)?, args.out.as_deref())?;
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
