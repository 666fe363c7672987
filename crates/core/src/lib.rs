//! Faster R-CNN post-processing: turns raw per-region network outputs into
//! final detections, each paired with the pooled feature of its region.

pub mod detection {
    pub mod domain {
        pub mod backbone;
        pub mod box_decoder;
        pub mod detection;
        pub mod feature_aligner;
        pub mod image_preprocessor;
        pub mod nms;
        pub mod region_network;
        pub mod suppressor;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detection_assembler;
    pub mod frame_annotator;
}

pub mod shared {
    pub mod bbox;
    pub mod config;
    pub mod constants;
    pub mod error;
    pub mod frame;
}

pub mod video {
    pub mod domain {
        pub mod frame_reader;
        pub mod frame_sink;
    }
    pub mod infrastructure {
        pub mod image_file_reader;
        pub mod image_sequence_sink;
    }
}
