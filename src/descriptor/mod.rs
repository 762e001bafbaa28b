// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object, type and directory descriptors.
//!
//! These hold the running statistics the state encoder reads:
//!
//! ```text
//! ObjectRecord ──file_type──► TypeRegistry[FileType]   (shared, ref-counted)
//!      │
//!      └──────directory─────► DirectoryRegistry[dir]   (shared, ref-counted)
//! ```

mod classes;
mod group;
mod object;

pub use classes::{directory_of, FileType, FrequencyClass, RecencyClass, SizeClass};
pub use group::{
    DirectoryDescriptor, DirectoryRegistry, GroupDescriptor, GroupRegistry, TypeDescriptor,
    TypeRegistry,
};
pub use object::ObjectRecord;
