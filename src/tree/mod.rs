//! Tree engine: node ids, depth-bounded snapshots and command menus.

pub mod catalog;
pub mod materializer;
pub mod resolver;
pub mod types;

pub use catalog::{command_for, menu_for};
pub use materializer::Materializer;
pub use resolver::{id_of, resolve};
pub use types::{CommandItem, Label, Menu, MenuItem, TreeNode};
