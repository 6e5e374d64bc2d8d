/// Number of aggregate keys one posting fans out to (4 periods x 2 date kinds).
pub const KEYS_PER_POSTING: usize = 8;

/// Page size used when replaying postings during a full rebuild.
pub const REBUILD_REPLAY_BATCH_SIZE: i64 = 500;
