use ort::execution_providers::ExecutionProviderDispatch;

/// Execution providers for a session, in preference order.
///
/// An empty list means ONNX Runtime's default CPU provider. A GPU request
/// uses CUDA when built with the `cuda` feature, otherwise the platform's
/// accelerator (CoreML on macOS, DirectML on Windows), otherwise CPU.
pub fn execution_providers(use_gpu: bool) -> Vec<ExecutionProviderDispatch> {
    if !use_gpu {
        return Vec::new();
    }

    #[cfg(feature = "cuda")]
    {
        vec![ort::execution_providers::CUDAExecutionProvider::default().build()]
    }
    #[cfg(not(feature = "cuda"))]
    {
        let providers = platform_accelerators();
        if providers.is_empty() {
            log::warn!("GPU requested but no accelerator is compiled in, running on CPU");
        }
        providers
    }
}

#[cfg(not(feature = "cuda"))]
fn platform_accelerators() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
