use crate::sda::client::Archive;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed { attempts: u32 },
    TimedOut,
}

/// Bounded blocking wait for a submitted record to become visible remotely.
///
/// The archive offers no push notification, so durability is inferred by
/// re-querying. The interval is constant rather than backed off: the total
/// wait stays predictable (5s x 60 = 5 minutes by default) and the caller
/// already rate-limits between distinct records.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPoller {
    interval: Duration,
    max_attempts: u32,
}

impl ConfirmationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Probes until the URL is visible or the attempt budget is spent.
    /// An unreachable archive counts as a miss, never as confirmation.
    pub fn wait_for(&self, archive: &dyn Archive, url: &str) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            match archive.exists(url) {
                Ok(true) => return PollOutcome::Confirmed { attempts: attempt },
                Ok(false) => {}
                // unreachable archive counts as a miss
                Err(_) => {}
            }
            if attempt < self.max_attempts {
                thread::sleep(self.interval);
            }
        }
        PollOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use crate::sda::client::{Accession, AccessionPayload};
    use std::cell::Cell;

    struct ScriptedArchive {
        visible_after: Option<u32>,
        probes: Cell<u32>,
        unreachable: bool,
    }

    impl ScriptedArchive {
        fn never_visible() -> Self {
            Self {
                visible_after: None,
                probes: Cell::new(0),
                unreachable: false,
            }
        }

        fn visible_after(n: u32) -> Self {
            Self {
                visible_after: Some(n),
                probes: Cell::new(0),
                unreachable: false,
            }
        }
    }

    impl Archive for ScriptedArchive {
        fn exists(&self, _url: &str) -> Result<bool, ArchiveError> {
            let probe = self.probes.get() + 1;
            self.probes.set(probe);
            if self.unreachable {
                return Err(ArchiveError::RemoteUnavailable("stub offline".to_string()));
            }
            Ok(self.visible_after.is_some_and(|n| probe >= n))
        }

        fn find_by_url(&self, _url: &str) -> Result<Option<Accession>, ArchiveError> {
            unreachable!("poller only probes existence")
        }

        fn create(&self, _payload: &AccessionPayload) -> Result<Accession, ArchiveError> {
            unreachable!("poller never submits")
        }

        fn update(&self, _id: u64, _payload: &AccessionPayload) -> Result<Accession, ArchiveError> {
            unreachable!("poller never submits")
        }
    }

    #[test]
    fn exhausts_exactly_the_attempt_budget_then_times_out() {
        let archive = ScriptedArchive::never_visible();
        let poller = ConfirmationPoller::new(Duration::ZERO, 60);

        let outcome = poller.wait_for(&archive, "https://x/doc1");

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(archive.probes.get(), 60);
    }

    #[test]
    fn confirms_on_the_probe_that_sees_the_record() {
        let archive = ScriptedArchive::visible_after(3);
        let poller = ConfirmationPoller::new(Duration::ZERO, 60);

        let outcome = poller.wait_for(&archive, "https://x/doc1");

        assert_eq!(outcome, PollOutcome::Confirmed { attempts: 3 });
        assert_eq!(archive.probes.get(), 3);
    }

    #[test]
    fn unreachable_archive_is_a_miss_not_a_confirmation() {
        let archive = ScriptedArchive {
            visible_after: None,
            probes: Cell::new(0),
            unreachable: true,
        };
        let poller = ConfirmationPoller::new(Duration::ZERO, 5);

        let outcome = poller.wait_for(&archive, "https://x/doc1");

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(archive.probes.get(), 5);
    }
}
