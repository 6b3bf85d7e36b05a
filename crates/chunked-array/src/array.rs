//! The lazy array type and its graph combinators.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{ArrayError, Result};
use crate::scheduler::{self, Scheduler};

/// Marker for element types the runtime can carry.
pub trait Element:
    Copy + Send + Sync + fmt::Debug + num_traits::NumCast + 'static
{
}

impl Element for f64 {}
impl Element for i64 {}
impl Element for u64 {}

/// Identity token for a lazy array: the identity of its root graph node.
///
/// Tokens compare equal only for handles cloned from the same array;
/// value-equal arrays built separately get distinct tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayToken(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// An evaluated chunk with its element type erased, so nodes of different
/// element types can feed one kernel.
type ErasedChunk = Arc<dyn Any + Send + Sync>;

/// Borrow an erased chunk as its concrete element type.
///
/// A mismatch here is a bug in the combinator layer (kernels are built
/// alongside their input nodes), never a user error.
fn chunk_values<T: Element>(chunk: &ErasedChunk) -> &[T] {
    chunk
        .downcast_ref::<Vec<T>>()
        .expect("chunk element type mismatch")
        .as_slice()
}

/// A graph node whose output element type is erased.
trait ErasedNode: Send + Sync {
    fn eval_erased(&self, sched: &dyn Scheduler) -> Vec<ErasedChunk>;
}

/// Per-chunk kernel: receives chunk `i` of every input, produces output
/// chunk `i`.
type ChunkKernel<T> = Arc<dyn Fn(&[ErasedChunk]) -> Vec<T> + Send + Sync>;

/// Whole-graph kernel: receives every chunk of every input, produces the
/// full output chunk list in one task.
type GlobalKernel<T> = Arc<dyn Fn(&[Vec<ErasedChunk>]) -> Vec<Vec<T>> + Send + Sync>;

enum Op<T: Element> {
    /// Chunks materialized by the caller.
    Source(Vec<Arc<Vec<T>>>),
    /// Output chunk i depends only on chunk i of each input; chunks run
    /// in parallel through the scheduler.
    Chunkwise {
        inputs: Vec<Arc<dyn ErasedNode>>,
        kernel: ChunkKernel<T>,
    },
    /// One task consuming all chunks of all inputs (reductions, rechunk).
    Global {
        inputs: Vec<Arc<dyn ErasedNode>>,
        kernel: GlobalKernel<T>,
    },
}

struct Node<T: Element> {
    id: u64,
    op: Op<T>,
    /// Element count of each output chunk.
    chunk_lens: Vec<usize>,
    /// Memoized result; a node evaluates at most once per process.
    cache: OnceLock<Vec<Arc<Vec<T>>>>,
}

impl<T: Element> Node<T> {
    fn eval(&self, sched: &dyn Scheduler) -> &Vec<Arc<Vec<T>>> {
        self.cache.get_or_init(|| match &self.op {
            Op::Source(chunks) => chunks.clone(),
            Op::Chunkwise { inputs, kernel } => {
                let input_chunks: Vec<Vec<ErasedChunk>> =
                    inputs.iter().map(|n| n.eval_erased(sched)).collect();
                let tasks = self.chunk_lens.len();
                let slots: Vec<OnceLock<Arc<Vec<T>>>> =
                    (0..tasks).map(|_| OnceLock::new()).collect();
                sched.run(tasks, &|i| {
                    let args: Vec<ErasedChunk> =
                        input_chunks.iter().map(|c| c[i].clone()).collect();
                    let out = kernel(&args);
                    debug_assert_eq!(out.len(), self.chunk_lens[i]);
                    let _ = slots[i].set(Arc::new(out));
                });
                slots
                    .into_iter()
                    .map(|slot| {
                        slot.into_inner()
                            .expect("scheduler did not run every chunk task")
                    })
                    .collect()
            }
            Op::Global { inputs, kernel } => {
                let input_chunks: Vec<Vec<ErasedChunk>> =
                    inputs.iter().map(|n| n.eval_erased(sched)).collect();
                kernel(&input_chunks).into_iter().map(Arc::new).collect()
            }
        })
    }
}

impl<T: Element> ErasedNode for Node<T> {
    fn eval_erased(&self, sched: &dyn Scheduler) -> Vec<ErasedChunk> {
        self.eval(sched)
            .iter()
            .map(|chunk| chunk.clone() as ErasedChunk)
            .collect()
    }
}

/// A handle to a node of a deferred computation graph over 1-D chunked
/// numeric data.
///
/// Cloning is cheap and shares the underlying node; see the crate docs
/// for the evaluation model.
#[derive(Clone)]
pub struct LazyArray<T: Element> {
    node: Arc<Node<T>>,
    len: usize,
}

impl<T: Element> LazyArray<T> {
    fn from_op(op: Op<T>, chunk_lens: Vec<usize>) -> Self {
        let len = chunk_lens.iter().sum();
        Self {
            node: Arc::new(Node {
                id: next_node_id(),
                op,
                chunk_lens,
                cache: OnceLock::new(),
            }),
            len,
        }
    }

    /// A single-chunk array owning `values`.
    pub fn from_vec(values: Vec<T>) -> Self {
        let lens = vec![values.len()];
        Self::from_op(Op::Source(vec![Arc::new(values)]), lens)
    }

    /// Split `values` into chunks of at most `chunk_len` elements.
    ///
    /// # Panics
    /// Panics if `chunk_len` is zero.
    pub fn from_vec_chunked(values: Vec<T>, chunk_len: usize) -> Self {
        assert!(chunk_len > 0, "chunk_len must be positive");
        if values.len() <= chunk_len {
            return Self::from_vec(values);
        }
        let chunks: Vec<Vec<T>> = values
            .chunks(chunk_len)
            .map(|chunk| chunk.to_vec())
            .collect();
        Self::from_chunks(chunks)
    }

    /// Build from explicit chunks.
    pub fn from_chunks(chunks: Vec<Vec<T>>) -> Self {
        let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
        Self::from_op(Op::Source(chunks.into_iter().map(Arc::new).collect()), lens)
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element count of each chunk.
    pub fn chunk_lens(&self) -> &[usize] {
        &self.node.chunk_lens
    }

    /// Identity token of this array's root node.
    pub fn token(&self) -> ArrayToken {
        ArrayToken(self.node.id)
    }

    /// Lazy elementwise transformation.
    pub fn map<U, F>(&self, f: F) -> LazyArray<U>
    where
        U: Element,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let kernel: ChunkKernel<U> = Arc::new(move |chunks| {
            chunk_values::<T>(&chunks[0]).iter().map(|v| f(*v)).collect()
        });
        LazyArray::from_op(
            Op::Chunkwise {
                inputs: vec![self.node.clone() as Arc<dyn ErasedNode>],
                kernel,
            },
            self.node.chunk_lens.clone(),
        )
    }

    /// Lazy elementwise combination of two chunk-aligned arrays.
    pub fn zip_map<U, V, F>(&self, other: &LazyArray<U>, f: F) -> Result<LazyArray<V>>
    where
        U: Element,
        V: Element,
        F: Fn(T, U) -> V + Send + Sync + 'static,
    {
        self.check_alignment(other.chunk_lens())?;
        let kernel: ChunkKernel<V> = Arc::new(move |chunks| {
            let a = chunk_values::<T>(&chunks[0]);
            let b = chunk_values::<U>(&chunks[1]);
            a.iter().zip(b.iter()).map(|(x, y)| f(*x, *y)).collect()
        });
        Ok(LazyArray::from_op(
            Op::Chunkwise {
                inputs: vec![
                    self.node.clone() as Arc<dyn ErasedNode>,
                    other.node.clone() as Arc<dyn ErasedNode>,
                ],
                kernel,
            },
            self.node.chunk_lens.clone(),
        ))
    }

    /// Lazy whole-chunk transformation with explicit output chunk sizes.
    ///
    /// `out_lens[i]` is the element count the kernel must produce for
    /// chunk `i`; it may differ from the input chunk size.
    ///
    /// # Panics
    /// Panics if `out_lens` does not have one entry per input chunk.
    pub fn map_chunks<U, F>(&self, out_lens: Vec<usize>, f: F) -> LazyArray<U>
    where
        U: Element,
        F: Fn(&[T]) -> Vec<U> + Send + Sync + 'static,
    {
        assert_eq!(
            out_lens.len(),
            self.node.chunk_lens.len(),
            "one output length per input chunk"
        );
        let kernel: ChunkKernel<U> =
            Arc::new(move |chunks| f(chunk_values::<T>(&chunks[0])));
        LazyArray::from_op(
            Op::Chunkwise {
                inputs: vec![self.node.clone() as Arc<dyn ErasedNode>],
                kernel,
            },
            out_lens,
        )
    }

    /// Lazy whole-chunk combination of two chunk-aligned arrays.
    ///
    /// # Panics
    /// Panics if `out_lens` does not have one entry per input chunk.
    pub fn zip_map_chunks<U, V, F>(
        &self,
        other: &LazyArray<U>,
        out_lens: Vec<usize>,
        f: F,
    ) -> Result<LazyArray<V>>
    where
        U: Element,
        V: Element,
        F: Fn(&[T], &[U]) -> Vec<V> + Send + Sync + 'static,
    {
        self.check_alignment(other.chunk_lens())?;
        assert_eq!(
            out_lens.len(),
            self.node.chunk_lens.len(),
            "one output length per input chunk"
        );
        let kernel: ChunkKernel<V> = Arc::new(move |chunks| {
            f(chunk_values::<T>(&chunks[0]), chunk_values::<U>(&chunks[1]))
        });
        Ok(LazyArray::from_op(
            Op::Chunkwise {
                inputs: vec![
                    self.node.clone() as Arc<dyn ErasedNode>,
                    other.node.clone() as Arc<dyn ErasedNode>,
                ],
                kernel,
            },
            out_lens,
        ))
    }

    /// Lazy reduction over every chunk into a single output chunk of
    /// `out_len` elements.
    ///
    /// The kernel sees all input chunks at once; it runs as one task, so
    /// it should stay cheap relative to the per-chunk work feeding it.
    pub fn reduce_chunks<U, F>(&self, out_len: usize, f: F) -> LazyArray<U>
    where
        U: Element,
        F: Fn(&[&[T]]) -> Vec<U> + Send + Sync + 'static,
    {
        let kernel: GlobalKernel<U> = Arc::new(move |inputs| {
            let views: Vec<&[T]> = inputs[0].iter().map(chunk_values::<T>).collect();
            vec![f(&views)]
        });
        LazyArray::from_op(
            Op::Global {
                inputs: vec![self.node.clone() as Arc<dyn ErasedNode>],
                kernel,
            },
            vec![out_len],
        )
    }

    /// Lazily re-partition into the given chunk layout.
    ///
    /// Total length must be preserved. Arrays already in the requested
    /// layout are returned as-is (sharing the node).
    pub fn rechunk(&self, chunk_lens: Vec<usize>) -> Result<LazyArray<T>> {
        let total: usize = chunk_lens.iter().sum();
        if total != self.len {
            return Err(ArrayError::LengthMismatch {
                expected: self.len,
                actual: total,
            });
        }
        if chunk_lens == self.node.chunk_lens {
            return Ok(self.clone());
        }
        let out_lens = chunk_lens.clone();
        let kernel: GlobalKernel<T> = Arc::new(move |inputs| {
            let mut flat = Vec::new();
            for chunk in &inputs[0] {
                flat.extend_from_slice(chunk_values::<T>(chunk));
            }
            let mut out = Vec::with_capacity(chunk_lens.len());
            let mut offset = 0;
            for &len in &chunk_lens {
                out.push(flat[offset..offset + len].to_vec());
                offset += len;
            }
            out
        });
        Ok(LazyArray::from_op(
            Op::Global {
                inputs: vec![self.node.clone() as Arc<dyn ErasedNode>],
                kernel,
            },
            out_lens,
        ))
    }

    /// Lazy elementwise numeric conversion.
    ///
    /// # Panics
    /// Evaluation panics if a value is not representable in the target
    /// type (e.g. NaN to an integer type).
    pub fn cast<U: Element>(&self) -> LazyArray<U> {
        self.map(|v| num_traits::cast(v).expect("numeric cast out of range"))
    }

    /// Materialize the array into a contiguous vector.
    ///
    /// This is the only operation that executes the graph. Chunk tasks
    /// run through the scheduler current on this thread; results are
    /// memoized per node, so shared upstream work runs at most once even
    /// across repeated `compute` calls.
    pub fn compute(&self) -> Vec<T> {
        let sched = scheduler::current();
        sched.on_materialize();
        tracing::debug!(
            len = self.len,
            chunks = self.node.chunk_lens.len(),
            "materializing lazy array"
        );
        let chunks = self.node.eval(sched.as_ref());
        let mut out = Vec::with_capacity(self.len);
        for chunk in chunks.iter() {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn check_alignment(&self, other_lens: &[usize]) -> Result<()> {
        if self.node.chunk_lens != other_lens {
            return Err(ArrayError::ChunkMismatch {
                left: self.node.chunk_lens.clone(),
                right: other_lens.to_vec(),
            });
        }
        Ok(())
    }
}

impl<T: Element> fmt::Debug for LazyArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("len", &self.len)
            .field("chunks", &self.node.chunk_lens.len())
            .finish_non_exhaustive()
    }
}
