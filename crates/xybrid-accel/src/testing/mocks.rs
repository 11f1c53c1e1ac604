//! Mock accelerator runtime.
//!
//! [`MockRuntime`] implements [`NeuralNetworksRuntime`] entirely in memory.
//! It hands out numbered handles, records every creation and release, and
//! behaves like an identity graph: waiting on a compute copies the leading
//! bytes of input 0 into every bound output.

use crate::error::AccelResult;
use crate::runtime_adapter::{CompiledGraph, NeuralNetworksRuntime, Status};
use crate::weights::WeightRegion;
use memmap2::MmapMut;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::c_void;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle categories tracked by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Model,
    Compilation,
    Memory,
    Execution,
    Event,
}

/// Runtime primitives that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ExecutionCreate,
    SetInput,
    SetOutput,
    StartCompute,
    Wait,
}

macro_rules! mock_handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

mock_handle!(MockModel);
mock_handle!(MockCompilation);
mock_handle!(MockMemory);
mock_handle!(MockExecution);
mock_handle!(MockEvent);

/// Address and byte length of one binding.
#[derive(Debug, Clone, Copy)]
struct Binding {
    addr: usize,
    length: usize,
}

#[derive(Debug, Default, Clone)]
struct ExecutionRecord {
    inputs: BTreeMap<u32, Binding>,
    outputs: BTreeMap<u32, Binding>,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    live: HashSet<(HandleKind, u64)>,
    created: HashMap<HandleKind, usize>,
    freed: HashMap<HandleKind, usize>,
    release_log: Vec<HandleKind>,
    calls: HashMap<MockOp, usize>,
    failures: HashMap<MockOp, Status>,
    executions: HashMap<u64, ExecutionRecord>,
    events: HashMap<u64, ExecutionRecord>,
    last_binding: Option<(MockOp, u32, usize)>,
}

impl MockState {
    fn create(&mut self, kind: HandleKind) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert((kind, id));
        *self.created.entry(kind).or_default() += 1;
        id
    }

    fn release(&mut self, kind: HandleKind, id: u64) {
        if !self.live.remove(&(kind, id)) {
            panic!("MockRuntime: {:?} {} released twice or never created", kind, id);
        }
        *self.freed.entry(kind).or_default() += 1;
        self.release_log.push(kind);
    }

    /// Count the call and consume an injected failure, if any.
    fn enter(&mut self, op: MockOp) -> Result<(), Status> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.remove(&op) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

/// An in-memory accelerator runtime for tests.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Arc::new(MockRuntime::new().with_io_lengths(vec![16], vec![8]));
/// let graph = runtime.compiled_graph();
/// runtime.fail_next(MockOp::StartCompute, Status::OP_FAILED);
/// ```
#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
    /// Expected byte lengths per input and output position.
    io_lengths: Option<(Vec<usize>, Vec<usize>)>,
}

impl MockRuntime {
    /// Create a mock that accepts any binding length.
    ///
    /// Without declared lengths, a compute needs at least one bound input and
    /// one bound output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the byte length of every input and output position.
    ///
    /// Binding an undeclared position or a different length then fails with
    /// `BAD_DATA`, and computing with any position unbound fails with
    /// `BAD_STATE`.
    pub fn with_io_lengths(mut self, inputs: Vec<usize>, outputs: Vec<usize>) -> Self {
        self.io_lengths = Some((inputs, outputs));
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic inside a test must not hide the counters from later asserts.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_model(&self) -> MockModel {
        MockModel(self.state().create(HandleKind::Model))
    }

    pub fn create_compilation(&self) -> MockCompilation {
        MockCompilation(self.state().create(HandleKind::Compilation))
    }

    pub fn create_memory(&self) -> MockMemory {
        MockMemory(self.state().create(HandleKind::Memory))
    }

    /// A fresh model and compilation owned by a [`CompiledGraph`].
    pub fn compiled_graph(self: &Arc<Self>) -> CompiledGraph<Self> {
        let model = self.create_model();
        let compilation = self.create_compilation();
        CompiledGraph::new(self, model, compilation)
    }

    /// Like [`compiled_graph`](Self::compiled_graph) with `len` bytes of
    /// anonymous weight data and a memory handle wrapping it.
    pub fn compiled_graph_with_weights(self: &Arc<Self>, len: usize) -> AccelResult<CompiledGraph<Self>> {
        let map = MmapMut::map_anon(len)?.make_read_only()?;
        let memory = self.create_memory();
        Ok(self
            .compiled_graph()
            .with_weights(self, WeightRegion::from_mmap(map), memory))
    }

    /// Make the next call of `op` fail with `status`.
    pub fn fail_next(&self, op: MockOp, status: Status) {
        self.state().failures.insert(op, status);
    }

    /// Number of calls to `op`, failed ones included.
    pub fn calls(&self, op: MockOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn created(&self, kind: HandleKind) -> usize {
        self.state().created.get(&kind).copied().unwrap_or(0)
    }

    pub fn freed(&self, kind: HandleKind) -> usize {
        self.state().freed.get(&kind).copied().unwrap_or(0)
    }

    /// Handles of `kind` created and not yet released.
    pub fn live(&self, kind: HandleKind) -> usize {
        self.state().live.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn live_total(&self) -> usize {
        self.state().live.len()
    }

    /// Kinds of all released handles, in release order.
    pub fn release_log(&self) -> Vec<HandleKind> {
        self.state().release_log.clone()
    }

    /// `(op, position, byte length)` of the most recent successful binding.
    pub fn last_binding(&self) -> Option<(MockOp, u32, usize)> {
        self.state().last_binding
    }

    fn set_binding(
        &self,
        op: MockOp,
        execution: MockExecution,
        index: u32,
        addr: usize,
        length: usize,
    ) -> Result<(), Status> {
        let mut state = self.state();
        state.enter(op)?;

        if let Some((inputs, outputs)) = &self.io_lengths {
            let expected = match op {
                MockOp::SetInput => inputs,
                _ => outputs,
            };
            if expected.get(index as usize) != Some(&length) {
                return Err(Status::BAD_DATA);
            }
        }

        let record = state
            .executions
            .get_mut(&execution.0)
            .ok_or(Status::BAD_STATE)?;
        let slots = match op {
            MockOp::SetInput => &mut record.inputs,
            _ => &mut record.outputs,
        };
        slots.insert(index, Binding { addr, length });
        state.last_binding = Some((op, index, length));
        Ok(())
    }

    fn is_complete(&self, record: &ExecutionRecord) -> bool {
        match &self.io_lengths {
            Some((inputs, outputs)) => {
                (0..inputs.len()).all(|i| record.inputs.contains_key(&(i as u32)))
                    && (0..outputs.len()).all(|i| record.outputs.contains_key(&(i as u32)))
            }
            None => !record.inputs.is_empty() && !record.outputs.is_empty(),
        }
    }
}

impl NeuralNetworksRuntime for MockRuntime {
    type Model = MockModel;
    type Compilation = MockCompilation;
    type Memory = MockMemory;
    type Execution = MockExecution;
    type Event = MockEvent;

    fn name(&self) -> &str {
        "mock"
    }

    fn execution_create(&self, compilation: &MockCompilation) -> Result<MockExecution, Status> {
        let mut state = self.state();
        state.enter(MockOp::ExecutionCreate)?;
        if !state.live.contains(&(HandleKind::Compilation, compilation.0)) {
            return Err(Status::BAD_STATE);
        }
        let id = state.create(HandleKind::Execution);
        state.executions.insert(id, ExecutionRecord::default());
        Ok(MockExecution(id))
    }

    unsafe fn execution_set_input(
        &self,
        execution: &mut MockExecution,
        index: u32,
        buffer: *const c_void,
        length: usize,
    ) -> Result<(), Status> {
        self.set_binding(MockOp::SetInput, *execution, index, buffer as usize, length)
    }

    unsafe fn execution_set_output(
        &self,
        execution: &mut MockExecution,
        index: u32,
        buffer: *mut c_void,
        length: usize,
    ) -> Result<(), Status> {
        self.set_binding(MockOp::SetOutput, *execution, index, buffer as usize, length)
    }

    fn execution_start_compute(&self, execution: &mut MockExecution) -> Result<MockEvent, Status> {
        let mut state = self.state();
        state.enter(MockOp::StartCompute)?;
        let record = state
            .executions
            .get(&execution.0)
            .cloned()
            .ok_or(Status::BAD_STATE)?;
        if !self.is_complete(&record) {
            return Err(Status::BAD_STATE);
        }
        let id = state.create(HandleKind::Event);
        state.events.insert(id, record);
        Ok(MockEvent(id))
    }

    fn event_wait(&self, event: &MockEvent) -> Result<(), Status> {
        let mut state = self.state();
        state.enter(MockOp::Wait)?;
        let record = state.events.get(&event.0).ok_or(Status::BAD_STATE)?;

        if let Some(source) = record.inputs.get(&0) {
            for target in record.outputs.values() {
                let count = source.length.min(target.length);
                // SAFETY: both regions were bound under the runtime contract:
                // readable/writable for their lengths until compute completes.
                unsafe {
                    std::ptr::copy(source.addr as *const u8, target.addr as *mut u8, count);
                }
            }
        }
        Ok(())
    }

    fn event_free(&self, event: MockEvent) {
        let mut state = self.state();
        state.events.remove(&event.0);
        state.release(HandleKind::Event, event.0);
    }

    fn execution_free(&self, execution: MockExecution) {
        let mut state = self.state();
        state.executions.remove(&execution.0);
        state.release(HandleKind::Execution, execution.0);
    }

    fn model_free(&self, model: MockModel) {
        self.state().release(HandleKind::Model, model.0);
    }

    fn compilation_free(&self, compilation: MockCompilation) {
        self.state().release(HandleKind::Compilation, compilation.0);
    }

    fn memory_free(&self, memory: MockMemory) {
        self.state().release(HandleKind::Memory, memory.0);
    }
}
