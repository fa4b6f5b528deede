/// Request lifecycle boundary for one widget instance.
///
/// At most one exchange is in flight at a time; the check-and-set happens
/// before any suspension point, so submissions can never interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    AwaitingResponse,
}

/// State transition input for the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTransition {
    Submit,
    ResponseReceived,
    ResponseFailed,
}

/// Rejection reason for illegal request transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    AlreadyAwaiting,
    NoRequestInFlight,
}

pub type TransitionResult = Result<RequestState, TransitionRejection>;

impl RequestState {
    /// True while an exchange is awaiting the capability's reply.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::AwaitingResponse)
    }

    /// Applies one transition deterministically.
    ///
    /// `Submit` is only legal from `Idle`; both terminal transitions are
    /// only legal from `AwaitingResponse` and always return to `Idle`.
    pub fn apply(&self, transition: RequestTransition) -> TransitionResult {
        match (self, transition) {
            (Self::Idle, RequestTransition::Submit) => Ok(Self::AwaitingResponse),
            (Self::AwaitingResponse, RequestTransition::Submit) => {
                Err(TransitionRejection::AlreadyAwaiting)
            }
            (
                Self::AwaitingResponse,
                RequestTransition::ResponseReceived | RequestTransition::ResponseFailed,
            ) => Ok(Self::Idle),
            (Self::Idle, RequestTransition::ResponseReceived | RequestTransition::ResponseFailed) => {
                Err(TransitionRejection::NoRequestInFlight)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_is_only_legal_from_idle() {
        assert_eq!(
            RequestState::Idle.apply(RequestTransition::Submit),
            Ok(RequestState::AwaitingResponse)
        );
        assert_eq!(
            RequestState::AwaitingResponse.apply(RequestTransition::Submit),
            Err(TransitionRejection::AlreadyAwaiting)
        );
    }

    #[test]
    fn terminal_transitions_return_to_idle() {
        assert_eq!(
            RequestState::AwaitingResponse.apply(RequestTransition::ResponseReceived),
            Ok(RequestState::Idle)
        );
        assert_eq!(
            RequestState::AwaitingResponse.apply(RequestTransition::ResponseFailed),
            Ok(RequestState::Idle)
        );
    }

    #[test]
    fn terminal_transitions_are_illegal_while_idle() {
        assert_eq!(
            RequestState::Idle.apply(RequestTransition::ResponseReceived),
            Err(TransitionRejection::NoRequestInFlight)
        );
        assert_eq!(
            RequestState::Idle.apply(RequestTransition::ResponseFailed),
            Err(TransitionRejection::NoRequestInFlight)
        );
    }

    #[test]
    fn loading_flag_mirrors_awaiting_state() {
        assert!(!RequestState::Idle.is_loading());
        assert!(RequestState::AwaitingResponse.is_loading());
    }
}
