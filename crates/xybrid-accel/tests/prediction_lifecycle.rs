//! End-to-end prediction lifecycle tests against the mock runtime.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xybrid-accel --test prediction_lifecycle
//! ```

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use xybrid_accel::prelude::*;
use xybrid_accel::testing::{fixtures, HandleKind, MockOp, MockRuntime};
use xybrid_accel::BindingKind;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Mock that enforces the byte lengths of the `x [1,4]` / `y [1,2]` float graph.
fn strict_runtime() -> Arc<MockRuntime> {
    Arc::new(MockRuntime::new().with_io_lengths(vec![16], vec![8]))
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn identity_graph_runs_twice_on_one_executor() {
    let runtime = strict_runtime();
    let mut executor = fixtures::identity_executor(&runtime);
    let mut output = [0.0f32; 2];

    let first = [1.0f32, 2.0, 3.0, 4.0];
    unsafe {
        executor.set_input_buffer_f32(0, first.as_ptr()).unwrap();
        executor.set_output_buffer_f32(0, output.as_mut_ptr()).unwrap();
    }
    executor.compute_and_wait().unwrap();
    assert_eq!(output, [1.0, 2.0]);

    let second = [-1.0f32, -2.0, 0.5, 0.25];
    unsafe {
        executor.set_input_buffer_f32(0, second.as_ptr()).unwrap();
        executor.set_output_buffer_f32(0, output.as_mut_ptr()).unwrap();
    }
    executor.compute_and_wait().unwrap();
    assert_eq!(output, [-1.0, -2.0]);

    assert_eq!(runtime.created(HandleKind::Execution), 2);
    assert_eq!(runtime.live(HandleKind::Execution), 0);
    assert_eq!(executor.stats().predictions_completed, 2);
}

#[test]
fn sequential_predictions_leave_executor_ready() {
    let runtime = strict_runtime();
    let mut executor = fixtures::identity_executor(&runtime);
    let mut output = [0.0f32; 2];

    for round in 0..3 {
        let base = round as f32;
        unsafe { executor.set_output_buffer_f32(0, output.as_mut_ptr()) }.unwrap();
        executor.predict(&[base, base + 1.0, 0.0, 0.0]).unwrap();

        assert_eq!(output, [base, base + 1.0]);
        assert_eq!(executor.phase(), ExecutionPhase::Absent);
        assert_eq!(runtime.live(HandleKind::Execution), 0);
        assert_eq!(runtime.live(HandleKind::Event), 0);
    }
    assert_eq!(executor.stats().contexts_created, 3);
}

#[test]
fn short_input_is_rejected_before_any_backend_call() {
    let runtime = strict_runtime();
    let mut executor = fixtures::identity_executor(&runtime);

    let err = executor.predict(&[1.0f32, 2.0, 3.0]).unwrap_err();
    match err {
        AccelError::SizeMismatch {
            tensor,
            expected,
            actual,
        } => {
            assert_eq!(tensor, "x");
            assert_eq!(expected, 4);
            assert_eq!(actual, 3);
        }
        other => panic!("expected SizeMismatch, got {other:?}"),
    }

    for op in [
        MockOp::ExecutionCreate,
        MockOp::SetInput,
        MockOp::SetOutput,
        MockOp::StartCompute,
        MockOp::Wait,
    ] {
        assert_eq!(runtime.calls(op), 0, "{op:?} was called");
    }
}

#[test]
fn output_index_past_the_end_is_an_index_error() {
    let runtime = strict_runtime();
    let mut executor = fixtures::identity_executor(&runtime);
    let mut output = [0.0f32; 2];

    for index in 1..8 {
        let err = unsafe { executor.set_output_buffer_f32(index, output.as_mut_ptr()) }.unwrap_err();
        assert!(matches!(
            err,
            AccelError::IndexOutOfRange {
                kind: BindingKind::Output,
                ..
            }
        ));
    }
}

#[test]
fn backend_rejected_binding_reports_status() {
    // The runtime expects a 12-byte input while the executor registers 4 floats.
    let runtime = Arc::new(MockRuntime::new().with_io_lengths(vec![12], vec![8]));
    let mut executor = fixtures::identity_executor(&runtime);
    let input = [0.0f32; 4];

    let err = unsafe { executor.set_input_buffer_f32(0, input.as_ptr()) }.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.status(), Some(Status::BAD_DATA));
    assert!(err.to_string().contains("execution_set_input"));
}

#[test]
fn failed_compute_does_not_poison_the_executor() {
    let runtime = strict_runtime();
    let mut executor = fixtures::identity_executor(&runtime);
    let mut output = [0.0f32; 2];
    let input = [7.0f32, 8.0, 9.0, 10.0];

    runtime.fail_next(MockOp::Wait, Status::OP_FAILED);
    let err = executor
        .predict_into(&[&input[..]], &mut [&mut output[..]])
        .unwrap_err();
    assert_eq!(err.status(), Some(Status::OP_FAILED));
    assert_eq!(executor.phase(), ExecutionPhase::Absent);

    executor
        .predict_into(&[&input[..]], &mut [&mut output[..]])
        .unwrap();
    assert_eq!(output, [7.0, 8.0]);
    assert_eq!(executor.stats().predictions_failed, 1);
    assert_eq!(executor.stats().predictions_completed, 1);
}

#[test]
fn quantized_and_float_graphs_share_one_runtime() {
    let runtime = Arc::new(MockRuntime::new());
    let mut float = fixtures::identity_executor(&runtime);
    let mut quant = fixtures::executor_with(&runtime, &[("q", vec![8])], &[("r", vec![4])]);

    let mut float_out = [0.0f32; 2];
    float
        .predict_into(&[&[0.5f32, 1.5, 2.5, 3.5][..]], &mut [&mut float_out[..]])
        .unwrap();

    let mut quant_out = [0u8; 4];
    quant
        .predict_into(&[&[10u8, 20, 30, 40, 50, 60, 70, 80][..]], &mut [&mut quant_out[..]])
        .unwrap();

    assert_eq!(float_out, [0.5, 1.5]);
    assert_eq!(quant_out, [10, 20, 30, 40]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Teardown
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn teardown_releases_file_backed_graph_once_in_order() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0xAB; 256]).unwrap();
    file.flush().unwrap();

    let runtime = strict_runtime();
    let weights = WeightRegion::map_file(file.path(), false).unwrap();
    assert_eq!(weights.len(), 256);

    let model = runtime.create_model();
    let compilation = runtime.create_compilation();
    let memory = runtime.create_memory();
    let graph = CompiledGraph::new(&runtime, model, compilation).with_weights(&runtime, weights, memory);
    assert_eq!(graph.weights().map(|w| w.as_bytes()[0]), Some(0xAB));

    let mut executor = ModelExecutor::with_graph(Arc::clone(&runtime), graph, ExecutorConfig::default());
    executor.register_input("x", vec![1, 4]).unwrap();
    executor.register_output("y", vec![1, 2]).unwrap();

    let mut output = [0.0f32; 2];
    executor
        .predict_into(&[&[1.0f32, 2.0, 3.0, 4.0][..]], &mut [&mut output[..]])
        .unwrap();

    drop(executor);
    assert_eq!(runtime.live_total(), 0);
    assert_eq!(
        runtime.release_log(),
        vec![
            HandleKind::Event,
            HandleKind::Execution,
            HandleKind::Model,
            HandleKind::Compilation,
            HandleKind::Memory,
        ]
    );
    for kind in [HandleKind::Model, HandleKind::Compilation, HandleKind::Memory] {
        assert_eq!(runtime.freed(kind), 1, "{kind:?} freed more than once");
    }
}
