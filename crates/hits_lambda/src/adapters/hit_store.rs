/// The two key-value store operations the hit-count handler consumes.
///
/// `increment_hits` must be a single atomic server-side add-or-initialize;
/// the handler issues no locks or retries of its own, so counter correctness
/// under concurrent requests rests entirely on this contract.
pub trait HitStore {
    fn increment_hits(&self, path: &str) -> Result<(), String>;

    /// `Ok(None)` means the record or its counter attribute is absent.
    fn read_hits(&self, path: &str) -> Result<Option<u64>, String>;
}
