//! Ready-made executors for tests.

use super::mocks::MockRuntime;
use crate::config::ExecutorConfig;
use crate::executor::ModelExecutor;
use std::sync::Arc;

/// Executor over a mock graph with input "x" `[1, 4]` and output "y" `[1, 2]`.
///
/// With the mock's identity behavior, a compute writes the first two input
/// elements to the output.
pub fn identity_executor(runtime: &Arc<MockRuntime>) -> ModelExecutor<MockRuntime> {
    executor_with(runtime, &[("x", vec![1, 4])], &[("y", vec![1, 2])])
}

/// Executor over a mock graph with the given named inputs and outputs.
///
/// Panics if a name repeats within `inputs` or within `outputs`.
pub fn executor_with(
    runtime: &Arc<MockRuntime>,
    inputs: &[(&str, Vec<u32>)],
    outputs: &[(&str, Vec<u32>)],
) -> ModelExecutor<MockRuntime> {
    let graph = runtime.compiled_graph();
    let mut executor =
        ModelExecutor::with_graph(Arc::clone(runtime), graph, ExecutorConfig::new("fixture"));
    for (name, shape) in inputs {
        executor
            .register_input(*name, shape.clone())
            .expect("fixture input names are unique");
    }
    for (name, shape) in outputs {
        executor
            .register_output(*name, shape.clone())
            .expect("fixture output names are unique");
    }
    executor
}
