//! Application status transitions.
//!
//! The state machine is pure: it validates a requested move and returns the
//! updated application, leaving persistence of the composite write (status plus
//! a round-1 interview when entering `interview`) to the caller.

use super::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Interview,
};

/// Guard violations raised by [`transition`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move application from {from} to {to}")]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    /// Missing and foreign records both report this variant.
    #[error("actor is not permitted to perform this action")]
    UnauthorizedActor,
    #[error("moving application {0} to interview requires a round 1 interview")]
    InterviewRoundRequired(ApplicationId),
}

/// Result of a validated status request.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub application: Application,
    pub previous: ApplicationStatus,
    pub changed: bool,
}

/// Statuses reachable in one step from `from`.
pub const fn allowed_targets(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    use ApplicationStatus as S;

    match from {
        S::Draft => &[S::Submitted],
        S::Submitted => &[S::Screening, S::Interview, S::Rejected, S::Withdrawn],
        S::Screening => &[S::Interview, S::Rejected, S::Withdrawn],
        S::Interview => &[S::Offer, S::Rejected, S::Withdrawn],
        S::Offer => &[S::Accepted, S::Rejected],
        S::Accepted | S::Rejected | S::Withdrawn => &[],
    }
}

pub fn is_allowed(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Role allowed to request a move into `target`.
pub const fn required_role(target: ApplicationStatus) -> ActorRole {
    use ApplicationStatus as S;

    match target {
        S::Draft | S::Submitted | S::Withdrawn => ActorRole::Candidate,
        S::Screening | S::Interview | S::Offer | S::Accepted | S::Rejected => ActorRole::Recruiter,
    }
}

/// Ownership check shared by every application-scoped operation.
pub fn authorize(application: &Application, actor: &Actor) -> Result<(), TransitionError> {
    let owned = match actor.role {
        ActorRole::Candidate => actor.owns(&application.candidate_id.0),
        ActorRole::Recruiter => actor.owns(&application.job_id.0),
    };

    if owned {
        Ok(())
    } else {
        Err(TransitionError::UnauthorizedActor)
    }
}

/// Validate and apply a status request.
///
/// Guards run in order: ownership, idempotence, edge legality, role, and finally
/// the round-1 interview requirement when entering `interview`.
pub fn transition(
    application: &Application,
    target: ApplicationStatus,
    actor: &Actor,
    round_one: Option<&Interview>,
) -> Result<Transition, TransitionError> {
    authorize(application, actor)?;

    let current = application.status();
    if current == target {
        return Ok(Transition {
            application: application.clone(),
            previous: current,
            changed: false,
        });
    }

    if !is_allowed(current, target) {
        return Err(TransitionError::IllegalTransition {
            from: current,
            to: target,
        });
    }

    if !actor.is(required_role(target)) {
        return Err(TransitionError::UnauthorizedActor);
    }

    if target == ApplicationStatus::Interview {
        let attached = round_one.is_some_and(|interview| {
            interview.application_id == application.id && interview.round_number() == 1
        });
        if !attached {
            return Err(TransitionError::InterviewRoundRequired(
                application.id.clone(),
            ));
        }
    }

    Ok(Transition {
        application: application.with_status(target),
        previous: current,
        changed: true,
    })
}

/// Next round number for an application, given the rounds created so far.
pub fn next_round_number(existing: &[Interview]) -> u32 {
    existing
        .iter()
        .map(Interview::round_number)
        .max()
        .map_or(1, |last| last + 1)
}
