//! Kernel records and buffer references

use crate::arena::{ConstArena, WorkArena};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A unique kernel identifier
///
/// Ids are dense and 0-based within a program: a program of N kernels uses
/// exactly the ids `0..N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelId(pub u32);

impl KernelId {
    /// Create a new kernel ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Get the ID as an index into a dense kernel table
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolved location of a named buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferLoc {
    /// An offset into the shared mutable workspace arena
    Arena(u64),
    /// A model input/output sentinel, excluded from hazard analysis
    External,
    /// A declared buffer with no arena address (e.g. constant-pool storage);
    /// compared by name
    Symbolic,
}

/// A reference from a kernel to a named buffer
///
/// Distinct names may resolve to the same arena offset (aliasing), so
/// analysis compares by resolved address and falls back to name equality
/// only for symbolic references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferRef {
    /// Symbolic buffer name from the source program
    pub name: String,
    /// Resolved location
    pub loc: BufferLoc,
}

impl BufferRef {
    /// Reference to a buffer at a workspace arena offset
    pub fn arena(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            loc: BufferLoc::Arena(offset),
        }
    }

    /// Reference to an external model input/output
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loc: BufferLoc::External,
        }
    }

    /// Reference to a declared buffer without an arena address
    pub fn symbolic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loc: BufferLoc::Symbolic,
        }
    }

    /// The resolved arena offset, if any
    pub fn address(&self) -> Option<u64> {
        match self.loc {
            BufferLoc::Arena(offset) => Some(offset),
            _ => None,
        }
    }

    /// Whether this reference is an external sentinel
    pub fn is_external(&self) -> bool {
        self.loc == BufferLoc::External
    }

    /// Whether two references may denote the same storage
    ///
    /// True when the names match, or when both resolve to the same arena
    /// offset. External sentinels never alias tracked storage.
    pub fn may_alias(&self, other: &BufferRef) -> bool {
        if self.is_external() || other.is_external() {
            return false;
        }
        if self.name == other.name {
            return true;
        }
        matches!((self.address(), other.address()), (Some(a), Some(b)) if a == b)
    }
}

/// Inclusive byte range of private temporaries a kernel touches beyond its
/// named buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchRange {
    /// Lowest touched offset
    pub min: u64,
    /// Highest touched offset
    pub max: u64,
}

impl ScratchRange {
    /// Create a new scratch range; bounds are inclusive
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min <= max, "scratch range bounds out of order");
        Self { min, max }
    }

    /// Whether the range covers the given offset
    pub fn contains(&self, offset: u64) -> bool {
        self.min <= offset && offset <= self.max
    }

    /// Whether two ranges share at least one offset
    pub fn overlaps(&self, other: &ScratchRange) -> bool {
        !(self.max < other.min || other.max < self.min)
    }
}

/// Arguments handed to a kernel entry point
///
/// The runtime resolves nothing further at call time: the references carry
/// their arena offsets and the arenas expose base storage.
pub struct KernelArgs<'a> {
    /// Input buffer references, in declaration order
    pub inputs: &'a [BufferRef],
    /// Output buffer references, in declaration order
    pub outputs: &'a [BufferRef],
    /// Read-only constant arena
    pub consts: &'a ConstArena,
    /// Shared mutable workspace arena
    pub workspace: &'a WorkArena,
}

/// Kernel entry point: resolved references plus the two arenas, returning an
/// integer status (0 = success)
pub type KernelFn = Arc<dyn Fn(&KernelArgs<'_>) -> i32 + Send + Sync>;

/// An immutable compute kernel record
///
/// Created once by the generation pipeline and never mutated; the schedule
/// and the executor reference kernels by id rather than copying them.
#[derive(Clone)]
pub struct Kernel {
    /// Dense 0-based id
    pub id: KernelId,
    /// Kernel function name
    pub name: String,
    /// Ordered input buffer references
    pub inputs: Vec<BufferRef>,
    /// Ordered output buffer references
    pub outputs: Vec<BufferRef>,
    /// Private scratch-address range, if the kernel uses workspace
    /// temporaries beyond its named buffers
    pub scratch: Option<ScratchRange>,
    /// Compute entry point
    pub entry: KernelFn,
}

impl Kernel {
    /// Create a new kernel record
    pub fn new(
        id: KernelId,
        name: impl Into<String>,
        inputs: Vec<BufferRef>,
        outputs: Vec<BufferRef>,
        scratch: Option<ScratchRange>,
        entry: KernelFn,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            inputs,
            outputs,
            scratch,
            entry,
        }
    }

    /// Invoke the entry point against the given arenas
    pub fn invoke(&self, consts: &ConstArena, workspace: &WorkArena) -> i32 {
        let args = KernelArgs {
            inputs: &self.inputs,
            outputs: &self.outputs,
            consts,
            workspace,
        };
        (self.entry)(&args)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_id() {
        let id = KernelId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "#7");
        assert!(KernelId::new(1) < KernelId::new(2));
    }

    #[test]
    fn test_buffer_ref_address() {
        assert_eq!(BufferRef::arena("sid_1", 64).address(), Some(64));
        assert_eq!(BufferRef::external("images").address(), None);
        assert_eq!(BufferRef::symbolic("const_3").address(), None);
    }

    #[test]
    fn test_aliasing_by_address() {
        // Distinct names resolving to the same offset alias
        let a = BufferRef::arena("sid_1", 128);
        let b = BufferRef::arena("sid_1_reuse", 128);
        assert!(a.may_alias(&b));

        let c = BufferRef::arena("sid_2", 256);
        assert!(!a.may_alias(&c));
    }

    #[test]
    fn test_aliasing_by_name() {
        let a = BufferRef::symbolic("const_pool");
        let b = BufferRef::symbolic("const_pool");
        assert!(a.may_alias(&b));
        assert!(!a.may_alias(&BufferRef::symbolic("other")));
    }

    #[test]
    fn test_external_never_aliases() {
        let ext = BufferRef::external("images");
        assert!(!ext.may_alias(&BufferRef::external("images")));
        assert!(!ext.may_alias(&BufferRef::arena("images", 0)));
    }

    #[test]
    fn test_scratch_range() {
        let r = ScratchRange::new(100, 200);
        assert!(r.contains(100));
        assert!(r.contains(200));
        assert!(!r.contains(99));
        assert!(!r.contains(201));

        assert!(r.overlaps(&ScratchRange::new(200, 300)));
        assert!(r.overlaps(&ScratchRange::new(0, 100)));
        assert!(r.overlaps(&ScratchRange::new(150, 160)));
        assert!(!r.overlaps(&ScratchRange::new(201, 300)));
        assert!(!r.overlaps(&ScratchRange::new(0, 99)));
    }

    #[test]
    fn test_kernel_invoke() {
        let consts = ConstArena::new(vec![0u8; 16]);
        let workspace = WorkArena::new(16);

        let kernel = Kernel::new(
            KernelId::new(0),
            "set_first_byte",
            vec![],
            vec![BufferRef::arena("out", 0)],
            None,
            Arc::new(|args: &KernelArgs<'_>| {
                let offset = args.outputs[0].address().unwrap() as usize;
                // Sole writer of this range during the test
                unsafe { args.workspace.slice_mut(offset, 1)[0] = 42 };
                0
            }),
        );

        assert_eq!(kernel.invoke(&consts, &workspace), 0);
        assert_eq!(unsafe { workspace.slice(0, 1) }[0], 42);
    }

    #[test]
    fn test_kernel_status_propagates() {
        let consts = ConstArena::new(vec![]);
        let workspace = WorkArena::new(0);
        let kernel = Kernel::new(
            KernelId::new(0),
            "failing",
            vec![],
            vec![],
            None,
            Arc::new(|_: &KernelArgs<'_>| -3),
        );
        assert_eq!(kernel.invoke(&consts, &workspace), -3);
    }

    #[test]
    fn test_buffer_ref_serde_round_trip() {
        let refs = vec![
            BufferRef::arena("sid_8_let", 7168),
            BufferRef::external("output"),
            BufferRef::symbolic("fused_constant_2"),
        ];
        let json = serde_json::to_string(&refs).unwrap();
        let back: Vec<BufferRef> = serde_json::from_str(&json).unwrap();
        assert_eq!(refs, back);
    }
}
