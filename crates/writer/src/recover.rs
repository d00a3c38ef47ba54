//! Journal recovery: re-insert readings whose write failed

use contracts::ReadingSink;
use tracing::{info, instrument, warn};

use crate::error::WriterError;
use crate::journal::RecoveryJournal;
use crate::writer::IngestionWriter;

/// Outcome of one recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Entries read from the journal
    pub entries: usize,
    /// Entries stored this time
    pub inserted: usize,
    /// Entries that failed again and stay in the journal
    pub failed: usize,
}

/// Re-insert every journal entry in file order.
///
/// The live file is first moved aside, so readings journaled while the pass
/// runs land in a new live file and are kept. Entries that fail again are
/// appended back to the live journal. A pass cut short resumes from the
/// staged file next time. The writer should not journal into the same file.
#[instrument(name = "recover_journal", skip(journal, writer), fields(path = %journal.path().display()))]
pub async fn recover_journal<K: ReadingSink>(
    journal: &RecoveryJournal,
    writer: &mut IngestionWriter<K>,
) -> Result<RecoveryReport, WriterError> {
    let staged = journal.take_for_recovery().await?;
    let entries = staged.read_all().await?;
    let mut report = RecoveryReport {
        entries: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        match writer.write(&entry.reading).await {
            Ok(_) => report.inserted += 1,
            Err(fault) => {
                warn!(timestamp = %entry.reading.timestamp, error = %fault, "entry still failing");
                report.failed += 1;
                journal.append(&entry).await?;
            }
        }
    }

    staged.remove().await?;

    info!(
        entries = report.entries,
        inserted = report.inserted,
        failed = report.failed,
        "journal recovery finished"
    );
    Ok(report)
}
