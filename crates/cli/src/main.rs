use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

use clap::{ArgAction, Parser};
use serde::Serialize;

use rcnn_extractor_core::detection::domain::detection::{Detection, DetectionSet};
use rcnn_extractor_core::detection::domain::suppressor::SuppressionMode;
use rcnn_extractor_core::detection::infrastructure::checkpoint_resolver::{self, CheckpointId};
use rcnn_extractor_core::detection::infrastructure::onnx_faster_rcnn::OnnxFasterRcnn;
use rcnn_extractor_core::pipeline::detection_assembler::DetectionAssembler;
use rcnn_extractor_core::shared::config::{class_preset, ExtractorConfig, NetType};
use rcnn_extractor_core::shared::constants::{
    DEFAULT_CHECKEPOCH, DEFAULT_CHECKPOINT, DEFAULT_CHECKSESSION, DEFAULT_DATASET,
    DEFAULT_LOAD_DIR, IMAGE_EXTENSIONS,
};
use rcnn_extractor_core::video::domain::frame_reader::FrameReader;
use rcnn_extractor_core::video::domain::frame_sink::FrameSink;
use rcnn_extractor_core::video::infrastructure::image_file_reader::ImageFileReader;
use rcnn_extractor_core::video::infrastructure::image_sequence_sink::ImageSequenceSink;

/// Faster R-CNN detection with per-detection region features.
#[derive(Parser, Debug)]
#[command(name = "rcnn-extract")]
struct Cli {
    /// Input images, or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Training dataset; selects the checkpoint subdirectory.
    #[arg(long, default_value = DEFAULT_DATASET)]
    dataset: String,

    /// JSON config file.
    #[arg(long = "cfg")]
    cfg_file: Option<PathBuf>,

    /// Backbone: vgg16, res50, res101 or res152.
    #[arg(long)]
    net: Option<NetType>,

    /// Config override, e.g. `--set TEST.NMS 0.4`. Repeatable.
    #[arg(long = "set", num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
    set_cfgs: Vec<String>,

    /// Directory holding `{net}/{dataset}/` checkpoints.
    #[arg(long, default_value = DEFAULT_LOAD_DIR)]
    load_dir: PathBuf,

    /// Run on the GPU.
    #[arg(long)]
    cuda: bool,

    /// Class-agnostic box regression.
    #[arg(long)]
    cag: bool,

    #[arg(long, default_value_t = DEFAULT_CHECKSESSION)]
    checksession: u32,

    #[arg(long, default_value_t = DEFAULT_CHECKEPOCH)]
    checkepoch: u32,

    #[arg(long, default_value_t = DEFAULT_CHECKPOINT)]
    checkpoint: u32,

    /// Write annotated frames as PNGs to this directory.
    #[arg(long)]
    vis: Option<PathBuf>,

    /// One detection per region from its top class, without NMS.
    #[arg(long)]
    no_nms: bool,

    /// Class list preset: vehicles, pascal_voc or coco.
    #[arg(long)]
    classes: Option<String>,

    /// JSON-lines output file (stdout when omitted).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    path: &'a Path,
    detections: Vec<DetectionRecord<'a>>,
    features: Vec<Vec<f32>>,
    frame_feature: Vec<f32>,
}

#[derive(Serialize)]
struct DetectionRecord<'a> {
    #[serde(flatten)]
    detection: &'a Detection,
    class_name: &'a str,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), BoxError> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let mode = SuppressionMode::from(!cli.no_nms);
    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        return Err("No images found in the given inputs".into());
    }

    let checkpoint = checkpoint_resolver::resolve(
        &cli.load_dir,
        config.net,
        &cli.dataset,
        CheckpointId {
            session: cli.checksession,
            epoch: cli.checkepoch,
            step: cli.checkpoint,
        },
    )?;
    let network = OnnxFasterRcnn::load(
        config.net,
        &config.classes,
        config.class_agnostic,
        &checkpoint,
        config.use_gpu,
    )?;
    let mut assembler = DetectionAssembler::new(Box::new(network), config.clone())?;

    let mut sink = cli.vis.as_deref().map(ImageSequenceSink::new).transpose()?;
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let reader = ImageFileReader::new();
    let mut total = 0;
    for (index, path) in inputs.iter().enumerate() {
        let frame = reader.read(path, index)?;
        let result = assembler.run(
            &frame,
            mode,
            sink.as_mut().map(|s| s as &mut dyn FrameSink),
        )?;
        total += result.len();
        log::info!(
            "{}/{} {}: {} detections",
            index + 1,
            inputs.len(),
            path.display(),
            result.len()
        );

        let record = frame_record(index, path, &result, &config, mode);
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }
    out.flush()?;

    log::info!("{total} detections in {} frames", inputs.len());
    if let (Some(dir), Some(sink)) = (&cli.vis, &sink) {
        log::info!("Wrote {} annotated frames to {}", sink.written(), dir.display());
    }
    Ok(())
}

/// Defaults, then the config file, then flags, then `--set` overrides.
fn build_config(cli: &Cli) -> Result<ExtractorConfig, BoxError> {
    let mut config = match &cli.cfg_file {
        Some(path) => ExtractorConfig::from_file(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(net) = cli.net {
        config.net = net;
    }
    if let Some(preset) = &cli.classes {
        config.classes = class_preset(preset)?;
    }
    if cli.cag {
        config.class_agnostic = true;
    }
    if cli.cuda {
        config.use_gpu = true;
    }
    if cli.vis.is_some() {
        config.visualize = true;
    }
    config.apply_overrides(&cli.set_cfgs)?;
    config.validate()?;

    log::debug!("using config: {config:?}");
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), BoxError> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if cli.dataset.is_empty() {
        return Err("Dataset name must not be empty".into());
    }
    Ok(())
}

/// Files are taken as given; directories contribute their image files in
/// name order.
fn collect_inputs(inputs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut images: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            images.sort();
            paths.extend(images);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn frame_record<'a>(
    index: usize,
    path: &'a Path,
    result: &'a DetectionSet,
    config: &'a ExtractorConfig,
    mode: SuppressionMode,
) -> FrameRecord<'a> {
    FrameRecord {
        frame: index,
        path,
        detections: result
            .detections()
            .iter()
            .map(|d| DetectionRecord {
                detection: d,
                class_name: config
                    .class_name(mode.score_column(d.class_id))
                    .unwrap_or("unknown"),
            })
            .collect(),
        features: result.features().outer_iter().map(|row| row.to_vec()).collect(),
        frame_feature: result.frame_feature().to_vec(),
    }
}
