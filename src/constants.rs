//! Naming conventions and storage defaults

/// Separator between operation path segments (`/Company/Edit`)
pub const OPERATION_SEPARATOR: char = '/';

/// Maximum nesting followed when computing a user's group closure
pub const MAX_GROUP_DEPTH: usize = 10;

/// Default LMDB map size (1 GiB)
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Named sub-databases opened by the LMDB store
pub const MAX_DBS: u32 = 5;

/// Default database path used by the server
pub const DEFAULT_DB_PATH: &str = "./data/permres.mdb";
