pub mod checkpoint_resolver;
pub mod execution_provider;
pub mod load_error;
pub mod onnx_faster_rcnn;
