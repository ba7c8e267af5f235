/// Durability-ordering collaborator.
///
/// The buffer pool stores the log manager when one is supplied so that
/// access methods sharing the pool can reach it, but the pool core never
/// invokes it: eviction write-back does not wait on the log.
pub trait LogManager: Send + Sync {
    /// Block until every log record with sequence number at most `lsn` is
    /// durable.
    fn flush_until(&self, lsn: u64);
}
