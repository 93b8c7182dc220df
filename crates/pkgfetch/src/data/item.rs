/// One artifact to fetch.
///
/// `mtime` is the last-known modification time in epoch seconds; `0` means
/// unknown and forces an unconditional fetch. On a successful fetch the
/// engine overwrites it with the time reported by the server so the caller
/// can persist it for the next conditional request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchItem {
    /// Absolute source URL.
    pub url: String,

    /// Expected size in bytes. Advisory, only used for progress display.
    pub size: u64,

    /// Last-known modification time, epoch seconds.
    pub mtime: i64,
}

impl FetchItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url:   url.into(),
            size:  0,
            mtime: 0,
        }
    }

    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Returns the if-modified-since condition for this item, if any.
    pub fn modified_since(&self) -> Option<i64> { (self.mtime > 0).then_some(self.mtime) }
}
