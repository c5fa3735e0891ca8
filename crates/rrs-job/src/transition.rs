use rrs_schemas::JobStatus;

/// The lifecycle events that drive a [`JobStatus`] transition: an explicit,
/// exhaustively-matched transition table, where illegal transitions are a
/// typed error, never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// `acquire` returned `Queued`.
    Enqueue,
    /// `acquire` returned `Running`, or a queued job was promoted.
    Start,
    Pause,
    Resume,
    Complete(JobStatus),
    /// A queued job was dequeued (cancelled) without ever running.
    Cancel,
}

/// The state the job was in when the illegal event arrived, plus the
/// event that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: JobStatus,
    pub event: JobEvent,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal job transition: {:?} + {:?}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}

/// The state machine table:
///
/// ```text
/// queued  --dequeue--> cancelled
/// queued  --promoted--> running
/// running --complete--> completed|failed|cancelled
/// running --pause-->    paused
/// paused  --resume-->   running
/// paused  --complete--> completed|failed|cancelled
/// ```
///
/// Terminal states are sinks: no event is legal from them.
pub fn apply(current: JobStatus, event: JobEvent) -> Result<JobStatus, TransitionError> {
    use JobStatus::*;

    let illegal = || Err(TransitionError { from: current, event });

    match (current, event) {
        (Queued, JobEvent::Start) => Ok(Running),
        (Queued, JobEvent::Cancel) => Ok(Cancelled),
        (Running, JobEvent::Pause) => Ok(Paused),
        (Running, JobEvent::Complete(target @ (Completed | Failed | Cancelled))) => Ok(target),
        (Paused, JobEvent::Resume) => Ok(Running),
        (Paused, JobEvent::Complete(target @ (Completed | Failed | Cancelled))) => Ok(target),
        _ => illegal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_promotes_to_running() {
        assert_eq!(apply(JobStatus::Queued, JobEvent::Start), Ok(JobStatus::Running));
    }

    #[test]
    fn queued_cancels_without_running() {
        assert_eq!(apply(JobStatus::Queued, JobEvent::Cancel), Ok(JobStatus::Cancelled));
    }

    #[test]
    fn running_pauses() {
        assert_eq!(apply(JobStatus::Running, JobEvent::Pause), Ok(JobStatus::Paused));
    }

    #[test]
    fn paused_resumes_to_running() {
        assert_eq!(apply(JobStatus::Paused, JobEvent::Resume), Ok(JobStatus::Running));
    }

    #[test]
    fn running_completes_to_any_terminal_status() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert_eq!(apply(JobStatus::Running, JobEvent::Complete(terminal)), Ok(terminal));
        }
    }

    #[test]
    fn paused_completes_to_any_terminal_status() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert_eq!(apply(JobStatus::Paused, JobEvent::Complete(terminal)), Ok(terminal));
        }
    }

    #[test]
    fn terminal_states_are_sinks() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(apply(terminal, JobEvent::Pause).is_err());
            assert!(apply(terminal, JobEvent::Resume).is_err());
            assert!(apply(terminal, JobEvent::Complete(JobStatus::Completed)).is_err());
        }
    }

    #[test]
    fn queued_cannot_pause_or_resume() {
        assert!(apply(JobStatus::Queued, JobEvent::Pause).is_err());
        assert!(apply(JobStatus::Queued, JobEvent::Resume).is_err());
    }

    #[test]
    fn running_cannot_resume_or_enqueue() {
        assert!(apply(JobStatus::Running, JobEvent::Resume).is_err());
        assert!(apply(JobStatus::Running, JobEvent::Start).is_err());
    }
}
