/// Minimum class probability for a region to enter per-class suppression.
pub const CONF_THRESH: f32 = 0.05;

/// Name of the implicit class at score column 0.
pub const BACKGROUND_CLASS: &str = "__background__";

/// Per-channel means subtracted from input pixels, BGR order.
pub const DEFAULT_PIXEL_MEANS: [f32; 3] = [102.9801, 115.9465, 122.7717];

pub const DEFAULT_TEST_SCALE: u32 = 600;
pub const DEFAULT_TEST_MAX_SIZE: u32 = 1000;
pub const DEFAULT_NMS_THRESH: f32 = 0.3;

pub const DEFAULT_BBOX_NORMALIZE_MEANS: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
pub const DEFAULT_BBOX_NORMALIZE_STDS: [f32; 4] = [0.1, 0.1, 0.2, 0.2];

/// Checkpoint coordinates used when none are given.
pub const DEFAULT_LOAD_DIR: &str = "models";
pub const DEFAULT_DATASET: &str = "pascal_voc";
pub const DEFAULT_CHECKSESSION: u32 = 1;
pub const DEFAULT_CHECKEPOCH: u32 = 6;
pub const DEFAULT_CHECKPOINT: u32 = 18197;

/// At most this many boxes are drawn per class when visualizing.
pub const VIS_MAX_PER_CLASS: usize = 10;
/// Box outline colour, BGR.
pub const VIS_COLOR: [u8; 3] = [0, 204, 0];
pub const VIS_THICKNESS: u32 = 2;
/// Label text colour, BGR.
pub const VIS_LABEL_COLOR: [u8; 3] = [0, 0, 255];
pub const VIS_LABEL_SCALE: f32 = 14.0;
/// Label text top, measured down from the box's top edge.
pub const VIS_LABEL_OFFSET: i32 = 3;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const VEHICLE_CLASSES: &[&str] = &[BACKGROUND_CLASS, "person", "bike", "motorbike", "car", "bus"];

pub const PASCAL_VOC_CLASSES: &[&str] = &[
    BACKGROUND_CLASS,
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

pub const COCO_CLASSES: &[&str] = &[
    BACKGROUND_CLASS,
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
