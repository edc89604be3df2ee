//! Collision-free destination path allocation.
//!
//! Destinations are allocated for a whole batch before any worker starts, so
//! the allocator only has to consult the filesystem plus the paths it has
//! already handed out during the same batch.
//!
//! ```ignore
//! use rulebatch_core::allocator::PathAllocator;
//!
//! let mut allocator = PathAllocator::new();
//! // "a.xml" exists already
//! let path = allocator.allocate(Path::new("/data"), "a", "xml")?;
//! assert_eq!(path, PathBuf::from("/data/a-1.xml"));
//! ```

mod error;
mod path_allocator;

pub use error::AllocationError;
pub use path_allocator::PathAllocator;
