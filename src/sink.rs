//! Best-effort file copy of vote events.
//!
//! Strictly a side channel: the backup row written inside the vote
//! transaction is the authoritative redundant copy. This sink appends a CSV
//! line per vote to `votes_<code>.csv` under a configured directory, and any
//! failure is logged and swallowed. On ephemeral filesystems these files can
//! vanish at redeploy; nothing in the core depends on them.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::warn;

use crate::store::VoteEvent;

#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends one vote event. Never fails the caller.
    pub fn append(&self, event: &VoteEvent) {
        if let Err(e) = self.try_append(event) {
            warn!(
                session_code = %event.session_code,
                error = %e,
                "file backup write failed; database backup row remains authoritative"
            );
        }
    }

    fn try_append(&self, event: &VoteEvent) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("votes_{}.csv", event.session_code));
        let fresh = !path.exists();

        let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
        if fresh {
            writeln!(
                file,
                "vote_id,session_code,candidate_id,candidate_name,device_id,timestamp"
            )?;
        }
        writeln!(
            file,
            "{},{},{},{},{},{}",
            event.vote_id,
            csv_field(&event.session_code),
            event.candidate_id,
            csv_field(&event.candidate_name),
            csv_field(&event.device_id),
            event.ts
        )
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_owned()
    }
}
