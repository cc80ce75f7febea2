//! Fan-out/fan-in conversion of value trees into write batches
//!
//! One conversion task per top-level element runs on the shared
//! [`WorkerPool`]. Each task walks its element, checks every leaf against
//! the document limits and builds the leaf's write instruction. Results land
//! in a mutex-guarded collector indexed by element; the caller blocks on the
//! collector's condition variable until every submitted task has reported.
//!
//! ## Error policy
//!
//! The first failing element (lowest index) aborts the conversion. Other
//! tasks still run to completion because the caller always waits for all of
//! them, but their output is discarded.

use crate::pool::{panic_message, WorkerPool};
use docsink_core::{
    build_write_model, Batch, Context, Leaves, Limits, Phase, SinkError, SinkResult,
    StructuredValue, WriteInstruction,
};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Converts value trees into batches on a shared worker pool
#[derive(Debug, Clone)]
pub struct Converter {
    pool: Arc<WorkerPool>,
    limits: Limits,
}

impl Converter {
    /// Create a converter submitting to `pool`
    pub fn new(pool: Arc<WorkerPool>, limits: Limits) -> Self {
        Converter { pool, limits }
    }

    /// The pool conversion tasks run on
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Limits applied to every leaf
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Convert a root value
    ///
    /// A List fans out per element, an Object is a single element.
    ///
    /// # Errors
    ///
    /// A scalar root cannot produce any document and fails with `Convert`.
    /// Otherwise see [`Converter::convert`].
    pub fn convert_root(&self, ctx: &Context, root: StructuredValue) -> SinkResult<Batch> {
        match root {
            StructuredValue::List(items) => self.convert(ctx, items),
            object @ StructuredValue::Object(_) => self.convert(ctx, vec![object]),
            scalar => Err(SinkError::convert(
                0,
                format!(
                    "cannot write a {} value: expected an object or a list",
                    scalar.type_name()
                ),
            )),
        }
    }

    /// Convert top-level elements, one task per element
    ///
    /// Returns instructions in element order, then walk order within an
    /// element. Empty input returns an empty batch without submitting any
    /// task.
    ///
    /// # Errors
    ///
    /// - `Convert` naming the lowest failing element index (limit violation
    ///   or task panic)
    /// - `Cancelled` if `ctx` fired before a task started walking
    pub fn convert(&self, ctx: &Context, values: Vec<StructuredValue>) -> SinkResult<Batch> {
        if values.is_empty() {
            return Ok(Batch::new());
        }

        let elements = values.len();
        let collector = Arc::new(Collector::new(elements));

        for (index, value) in values.into_iter().enumerate() {
            let collector = Arc::clone(&collector);
            let ctx = ctx.clone();
            let limits = self.limits;
            self.pool.execute(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    convert_element(&ctx, index, value, &limits)
                }))
                .unwrap_or_else(|payload| {
                    Err(SinkError::convert(
                        index,
                        format!("conversion task panicked: {}", panic_message(payload.as_ref())),
                    ))
                });
                collector.complete(index, result);
            });
        }

        let (batch, skipped) = collector.wait()?;
        debug!(
            target: "docsink::convert",
            elements,
            instructions = batch.len(),
            skipped,
            "Converted value tree"
        );
        Ok(batch)
    }
}

/// Output of one conversion task
struct Converted {
    instructions: Vec<WriteInstruction>,
    skipped: usize,
}

fn convert_element(
    ctx: &Context,
    index: usize,
    value: StructuredValue,
    limits: &Limits,
) -> SinkResult<Converted> {
    ctx.check(Phase::Convert)?;

    let mut leaves = Leaves::new(value);
    let mut instructions = Vec::new();
    for doc in leaves.by_ref() {
        limits
            .validate(&doc)
            .map_err(|e| SinkError::convert(index, e.to_string()))?;
        instructions.push(build_write_model(doc));
    }

    Ok(Converted {
        instructions,
        skipped: leaves.skipped(),
    })
}

struct CollectorState {
    remaining: usize,
    results: Vec<Option<Vec<WriteInstruction>>>,
    skipped: usize,
    // (element index, error) of the lowest failing element so far
    error: Option<(usize, SinkError)>,
}

/// Fan-in point shared by the tasks of one conversion
struct Collector {
    state: Mutex<CollectorState>,
    done: Condvar,
}

impl Collector {
    fn new(tasks: usize) -> Self {
        Collector {
            state: Mutex::new(CollectorState {
                remaining: tasks,
                results: (0..tasks).map(|_| None).collect(),
                skipped: 0,
                error: None,
            }),
            done: Condvar::new(),
        }
    }

    fn complete(&self, index: usize, result: SinkResult<Converted>) {
        let mut state = self.state.lock();
        match result {
            Ok(converted) => {
                state.skipped += converted.skipped;
                state.results[index] = Some(converted.instructions);
            }
            Err(e) => {
                let replace = match &state.error {
                    Some((first, _)) => index < *first,
                    None => true,
                };
                if replace {
                    state.error = Some((index, e));
                }
            }
        }
        state.remaining -= 1;
        if state.remaining == 0 {
            self.done.notify_all();
        }
    }

    /// Block until every task has reported, then merge in element order
    fn wait(&self) -> SinkResult<(Batch, usize)> {
        let mut state = self.state.lock();
        while state.remaining > 0 {
            self.done.wait(&mut state);
        }

        if let Some((_, error)) = state.error.take() {
            return Err(error);
        }

        let mut batch = Batch::new();
        for instructions in state.results.drain(..).flatten() {
            batch.extend(instructions);
        }
        Ok((batch, state.skipped))
    }
}
